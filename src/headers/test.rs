use crate::headers::standard::{CONTENT_LENGTH, CONTENT_TYPE};
use crate::headers::{HeaderMap, HeaderName, HeaderValue};

const fn is_send_sync<T: Send + Sync>() { }
const _: () = {
    is_send_sync::<HeaderMap>();
    is_send_sync::<HeaderName>();
    is_send_sync::<HeaderValue>();
};

fn name(s: &str) -> HeaderName {
    s.parse().unwrap()
}

fn value(s: &str) -> HeaderValue {
    s.parse().unwrap()
}

#[test]
fn header_map() {
    let mut map = HeaderMap::new();

    map.insert(name("content-type"), value("FOO"));
    assert!(map.contains_key("content-type"));
    assert!(map.contains_key("Content-Type"));
    assert!(map.contains_key("CONTENT-TYPE"));
    assert!(map.contains_key(CONTENT_TYPE));

    assert!(map.insert(name("accept"), value("BAR")).is_none());
    assert!(map.insert(name("content-length"), value("LEN")).is_none());

    // Insert Multi

    map.append(CONTENT_LENGTH, value("BAR"));

    {
        let mut all = map.get_all("content-length");
        assert!(matches!(all.next(), Some(v) if v.to_str() == Some("LEN")));
        assert!(matches!(all.next(), Some(v) if v.to_str() == Some("BAR")));
        assert!(all.next().is_none());
    }

    // Replace

    let old = map.insert(name("Content-Length"), value("7"));
    assert_eq!(old.unwrap().to_str(), Some("LEN"));
    assert_eq!(map.get_all("content-length").count(), 1);
    assert_eq!(map.get(CONTENT_LENGTH).unwrap().to_u64(), Some(7));

    // Remove accept

    assert!(map.remove("ACCEPT").is_some());
    assert!(!map.contains_key("accept"));
    assert!(map.contains_key("content-type"));

    // Clear

    map.clear();
    assert!(map.is_empty());
    assert!(map.get("content-type").is_none());
}

#[test]
fn header_value() {
    assert!(HeaderValue::from_slice("a\r\nb").is_err());
    assert!(HeaderValue::from_slice("a\tb").is_ok());
    assert!("bad name".parse::<HeaderName>().is_err());
    assert!("".parse::<HeaderName>().is_err());

    let mut v = value("gzip");
    v.append("chunked").unwrap();
    assert_eq!(v.as_bytes(), b"gzip, chunked");
    assert_eq!(v.elements().collect::<Vec<_>>(), [&b"gzip"[..], b"chunked"]);

    assert_eq!(value("12a").to_u64(), None);
    assert_eq!(value("").to_u64(), None);
    assert_eq!(value("99999999999999999999999").to_u64(), None);

    let latin = HeaderValue::from_slice(b"caf\xe9").unwrap();
    assert_eq!(latin.to_latin1(), "café");
    assert_eq!(latin.to_str(), None);
}
