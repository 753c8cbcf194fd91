use bytes::BytesMut;
use std::sync::Arc;

use super::*;

#[test]
fn resolve_labels() {
    assert_eq!(Charset::for_label("UTF-8"), Some(Charset::Utf8));
    assert_eq!(Charset::for_label(" \"iso-8859-1\" "), Some(Charset::Latin1));
    assert_eq!(Charset::for_label("koi8-r"), None);
    assert_eq!(Charset::resolve(Some("koi8-r"), Charset::Latin1), Charset::Latin1);
    assert_eq!(Charset::resolve(None, Charset::Utf8), Charset::Utf8);
    assert_eq!(charset_param("text/plain; charset=utf-8"), Some("utf-8"));
    assert_eq!(charset_param("text/plain;Charset=\"UTF-8\";q=1"), Some("UTF-8"));
    assert_eq!(charset_param("text/plain"), None);
    assert_eq!(Charset::Utf8.max_bytes_per_char(), 4);
    assert_eq!(Charset::Latin1.max_bytes_per_char(), 1);
}

#[test]
fn utf8_split_across_fragments() {
    let text = "añ€😀";
    let bytes = text.as_bytes();

    for split in 0..=bytes.len() {
        let mut decoder = Decoder::new(Charset::Utf8);
        let mut out = Vec::new();
        assert_eq!(decoder.decode(&bytes[..split], &mut out, usize::MAX), split);
        assert_eq!(decoder.decode(&bytes[split..], &mut out, usize::MAX), bytes.len() - split);
        assert!(!decoder.has_pending());
        assert_eq!(out.iter().collect::<String>(), text);
    }
}

#[test]
fn utf8_malformed() {
    let mut decoder = Decoder::new(Charset::Utf8);
    let mut out = Vec::new();
    decoder.decode(b"a\xc3b\xff", &mut out, usize::MAX);
    assert_eq!(out, ['a', REPLACEMENT, 'b', REPLACEMENT]);

    out.clear();
    decoder.decode(b"\xe2\x82", &mut out, usize::MAX);
    assert!(out.is_empty());
    decoder.finish(&mut out);
    assert_eq!(out, [REPLACEMENT]);
}

#[test]
fn decode_respects_max() {
    let mut decoder = Decoder::new(Charset::Latin1);
    let mut out = Vec::new();
    assert_eq!(decoder.decode(b"abcdef", &mut out, 4), 4);
    assert_eq!(out, ['a', 'b', 'c', 'd']);
}

#[test]
fn encode_whole_chars_only() {
    let mut encoder = Encoder::new(Charset::Utf8);
    let mut dst = BytesMut::new();

    // "€" needs 3 bytes, only 2 left after "a"
    assert_eq!(encoder.encode("a€", &mut dst, 3), 1);
    assert_eq!(&dst[..], b"a");

    let mut latin = Encoder::new(Charset::Latin1);
    let mut dst = BytesMut::new();
    assert_eq!(latin.encode("é€", &mut dst, 8), "é€".len());
    assert_eq!(&dst[..], b"\xe9?");
}

#[test]
fn pool_recycles_per_charset() {
    let pool = Arc::new(ConverterPool::new(2));

    let a = pool.take_decoder(Charset::Utf8);
    let b = pool.take_decoder(Charset::Utf8);
    let c = pool.take_decoder(Charset::Utf8);
    pool.put_decoder(a);
    pool.put_decoder(b);
    pool.put_decoder(c);
    assert_eq!(pool.idle(Charset::Utf8), (2, 0));
    assert_eq!(pool.idle(Charset::Latin1), (0, 0));

    let handles = (0..4)
        .map(|_| {
            let pool = Arc::clone(&pool);
            std::thread::spawn(move || {
                for _ in 0..100 {
                    let encoder = pool.take_encoder(Charset::Latin1);
                    pool.put_encoder(encoder);
                }
            })
        })
        .collect::<Vec<_>>();
    for handle in handles {
        handle.join().unwrap();
    }
    assert!(pool.idle(Charset::Latin1).1 <= 2);

    pool.clear();
    assert_eq!(pool.idle(Charset::Utf8), (0, 0));
}
