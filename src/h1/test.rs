use std::sync::Arc;

use super::{Connection, Parsed};
use crate::app::ReadLine;
use crate::charset::{Charset, ConverterPool};
use crate::config::Config;
use crate::error::{Error, Kind, Misuse};
use crate::filter::{OutputFilter, OutputSink};
use crate::h1::parser::HTTP2_PREFACE;
use crate::http::{Method, StatusCode, Version};
use crate::net::{MemorySocket, ReadStatus};

fn connection_with(config: Config, fragments: &[&'static [u8]]) -> Connection<MemorySocket> {
    let mut conn = Connection::new(Arc::new(config), Arc::new(ConverterPool::default()));
    conn.init(MemorySocket::with_fragments(fragments.iter().copied()));
    conn
}

fn connection(fragments: &[&'static [u8]]) -> Connection<MemorySocket> {
    connection_with(Config::default(), fragments)
}

fn output(conn: &Connection<MemorySocket>) -> String {
    String::from_utf8_lossy(conn.socket().unwrap().output()).into_owned()
}

#[test]
fn keep_alive_pipeline() {
    let mut conn = connection(&[
        b"GET /a HTTP/1.1\r\nHost: x\r\n\r\nGET /b?q=1 HTTP/1.1\r\n",
        b"Host: x\r\n\r\n",
    ]);

    for uri in ["/a", "/b"] {
        assert_eq!(conn.parse_request(true).unwrap(), Parsed::Ready);
        assert_eq!(conn.request().uri(), uri);
        assert_eq!(conn.request().version(), Some(Version::HTTP_11));

        let uri = conn.request().uri().to_owned();
        conn.writer().unwrap().write(uri.as_bytes()).unwrap();
        conn.finish().unwrap();
        assert!(conn.keep_alive());
        if uri == "/b" {
            assert_eq!(conn.request().query(), Some("q=1"));
        }
        conn.next_request();
    }
    assert_eq!(conn.parse_request(true).unwrap(), Parsed::Closed);

    assert_eq!(
        output(&conn),
        "HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\n/a\
        HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\n/b"
    );
}

#[test]
fn nonblocking_parse() {
    let mut conn = Connection::new(Arc::new(Config::default()), Arc::new(ConverterPool::default()));
    conn.init(MemorySocket::new());
    conn.socket_mut().unwrap().push(&b"POST /x HTTP/1.1\r\nHo"[..]);

    assert_eq!(conn.parse_request(false).unwrap(), Parsed::Pending);
    conn.socket_mut().unwrap().push(&b"st: x\r\nContent-Length: 3\r\n\r\n"[..]);
    assert_eq!(conn.parse_request(false).unwrap(), Parsed::Ready);
    assert_eq!(conn.request().content_length(), Some(3));

    let mut buf = [0; 8];
    assert_eq!(conn.body().unwrap().read(&mut buf).unwrap(), ReadStatus::WouldBlock);
    conn.socket_mut().unwrap().push(&b"abc"[..]);
    assert_eq!(conn.body().unwrap().read(&mut buf).unwrap(), ReadStatus::Read(3));
    assert_eq!(&buf[..3], b"abc");
    assert_eq!(conn.body().unwrap().read(&mut buf).unwrap(), ReadStatus::Eof);
}

#[test]
fn expect_continue_and_chunked_body() {
    let mut conn = connection(&[
        b"POST /upload HTTP/1.1\r\nHost: x\r\nExpect: 100-continue\r\n",
        b"Transfer-Encoding: chunked\r\n\r\n",
        b"5\r\nhello\r\n",
        b"6\r\n world\r\n0\r\n\r\n",
    ]);

    assert_eq!(conn.parse_request(true).unwrap(), Parsed::Ready);
    assert!(conn.request().expects_continue());
    assert_eq!(conn.request().content_length(), None);
    assert!(output(&conn).is_empty());

    let mut text = String::new();
    let status = conn.body().unwrap().read_to_string(&mut text).unwrap();
    assert_eq!(status, ReadStatus::Eof);
    assert_eq!(text, "hello world");

    conn.writer().unwrap().write_str("ok").unwrap();
    conn.finish().unwrap();
    assert_eq!(
        output(&conn),
        "HTTP/1.1 100 \r\n\r\nHTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok"
    );
}

#[test]
fn unread_body_is_swallowed() {
    let mut conn = connection(&[
        b"POST /a HTTP/1.1\r\nHost: x\r\nContent-Length: 5\r\n\r\nhel",
        b"loGET /b HTTP/1.1\r\nHost: x\r\n\r\n",
    ]);

    assert_eq!(conn.parse_request(true).unwrap(), Parsed::Ready);
    conn.finish().unwrap();
    conn.next_request();

    assert_eq!(conn.parse_request(true).unwrap(), Parsed::Ready);
    assert_eq!(conn.request().uri(), "/b");
    assert_eq!(*conn.request().method(), Method::GET);
}

#[test]
fn error_responses() {
    macro_rules! test {
        ($input:literal => $kind:pat, $response:literal) => {
            let mut conn = connection(&[$input]);
            let err = conn.parse_request(true).unwrap_err();
            assert!(matches!(err.kind(), $kind), "unexpected error {err:?}");
            assert!(!conn.keep_alive());
            assert_eq!(conn.request().protocol(), "HTTP/1.1");

            conn.send_error(err.status_hint().unwrap()).unwrap();
            assert_eq!(output(&conn), $response);
        };
    }

    test!(
        b"GET /a|b HTTP/1.1\r\nHost: x\r\n\r\n" => Kind::Parse(_),
        "HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
    );
    test!(
        b"GET / HTTP/1.1\r\n\r\n" => Kind::MissingHost,
        "HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
    );
    test!(
        b"GET / HTTP/3.0\r\n\r\n" => Kind::UnsupportedVersion,
        "HTTP/1.1 505 HTTP Version Not Supported\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
    );
    test!(
        b"POST / HTTP/1.1\r\nHost: x\r\nTransfer-Encoding: gzip\r\n\r\n" => Kind::UnsupportedTransferEncoding,
        "HTTP/1.1 501 Not Implemented\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
    );
    test!(
        b"POST / HTTP/1.1\r\nHost: x\r\nContent-Length: 1\r\nContent-Length: 2\r\n\r\n" => Kind::InvalidContentLength,
        "HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
    );
}

#[test]
fn partial_line_survives_error() {
    let mut conn = connection(&[b"DELETE /a/b|c HTTP/1.1\r\n\r\n"]);
    assert!(conn.parse_request(true).is_err());
    assert_eq!(*conn.request().method(), Method::DELETE);
    assert_eq!(conn.request().uri(), "/a/b");
    assert_eq!(conn.request().version(), Some(Version::HTTP_11));
}

#[test]
fn http10_framing() {
    // no length, the connection delimits the body
    let mut conn = connection(&[b"GET / HTTP/1.0\r\n\r\n"]);
    conn.parse_request(true).unwrap();
    assert!(!conn.keep_alive());
    let mut writer = conn.writer().unwrap();
    writer.write(b"abc").unwrap();
    writer.flush().unwrap();
    conn.finish().unwrap();
    assert_eq!(output(&conn), "HTTP/1.1 200 OK\r\nConnection: close\r\n\r\nabc");

    // keep-alive asked for, with a known length
    let mut conn = connection(&[b"GET / HTTP/1.0\r\nConnection: keep-alive\r\n\r\n"]);
    conn.parse_request(true).unwrap();
    assert!(conn.keep_alive());
    conn.response_mut().set_content_length(Some(3)).unwrap();
    conn.writer().unwrap().write(b"abc").unwrap();
    conn.finish().unwrap();
    assert!(conn.keep_alive());
    assert_eq!(
        output(&conn),
        "HTTP/1.1 200 OK\r\nContent-Length: 3\r\nConnection: keep-alive\r\n\r\nabc"
    );
}

#[test]
fn chunked_response_after_flush() {
    let mut conn = connection(&[b"GET / HTTP/1.1\r\nHost: x\r\n\r\n"]);
    conn.parse_request(true).unwrap();

    let mut writer = conn.writer().unwrap();
    writer.write(b"abc").unwrap();
    writer.flush().unwrap();
    writer.write(b"de").unwrap();

    let err = conn.response_mut().set_status(StatusCode::NOT_FOUND).unwrap_err();
    assert!(matches!(err.kind(), Kind::Misuse(Misuse::Committed)));

    conn.finish().unwrap();
    assert_eq!(
        output(&conn),
        "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n2\r\nde\r\n0\r\n\r\n"
    );
}

#[test]
fn head_response_has_no_body() {
    let mut conn = connection(&[b"HEAD / HTTP/1.1\r\nHost: x\r\n\r\n"]);
    conn.parse_request(true).unwrap();
    conn.response_mut().set_content_type("text/plain").unwrap();
    conn.writer().unwrap().write_str("body").unwrap();
    conn.finish().unwrap();
    assert_eq!(
        output(&conn),
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain;charset=ISO-8859-1\r\n\r\n"
    );
}

#[test]
fn http09_has_no_head() {
    let mut conn = connection(&[b"GET /old\r\n"]);
    assert_eq!(conn.parse_request(true).unwrap(), Parsed::Ready);
    assert_eq!(conn.request().version(), Some(Version::HTTP_09));
    assert!(conn.request().headers().is_empty());

    conn.writer().unwrap().write(b"hi").unwrap();
    conn.finish().unwrap();
    assert!(!conn.keep_alive());
    assert_eq!(output(&conn), "hi");
}

#[test]
fn http2_preface() {
    let mut conn = connection(&[HTTP2_PREFACE]);
    assert_eq!(conn.parse_request(true).unwrap(), Parsed::Http2Preface);
    assert!(!conn.keep_alive());
    assert!(conn.release().is_some());

    let err = conn.parse_request(true).unwrap_err();
    assert!(matches!(err.kind(), Kind::Misuse(Misuse::NotBound)));
}

#[test]
fn body_lines_with_mark() {
    let mut conn = connection(&[
        b"POST / HTTP/1.1\r\nHost: x\r\nContent-Length: 13\r\n",
        b"Content-Type: text/plain; charset=utf-8\r\n\r\n",
        "l\u{e9}ne1\r\nline2".as_bytes(),
    ]);
    conn.parse_request(true).unwrap();
    assert_eq!(conn.request().charset(), Some(Charset::Utf8));

    let mut body = conn.body().unwrap();
    assert_eq!(body.charset(), Charset::Utf8);
    body.mark(64);
    assert_eq!(body.read_line().unwrap(), ReadLine::Line("l\u{e9}ne1".into()));
    body.reset().unwrap();
    assert_eq!(body.read_line().unwrap(), ReadLine::Line("l\u{e9}ne1".into()));
    assert_eq!(body.read_line().unwrap(), ReadLine::Line("line2".into()));
    assert_eq!(body.read_line().unwrap(), ReadLine::Eof);

    let err = body.read(&mut [0; 4]).unwrap_err();
    assert!(matches!(err.kind(), Kind::Misuse(Misuse::ModeConflict)));
}

struct Upper;

impl OutputFilter for Upper {
    fn do_write(&mut self, chunk: &[u8], next: &mut dyn OutputSink) -> Result<(), Error> {
        next.write(&chunk.to_ascii_uppercase())
    }

    fn recycle(&mut self) { }
}

#[test]
fn user_filter_wraps_transfer_coding() {
    let mut conn = connection(&[b"GET / HTTP/1.1\r\nHost: x\r\n\r\n"]);
    let upper = conn.register_filter(Box::new(Upper));
    conn.parse_request(true).unwrap();
    conn.response_mut().add_filter(upper).unwrap();

    let mut writer = conn.writer().unwrap();
    writer.write(b"abc").unwrap();
    writer.flush().unwrap();
    conn.finish().unwrap();
    assert_eq!(
        output(&conn),
        "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nABC\r\n0\r\n\r\n"
    );
}

#[test]
fn response_head_overflow() {
    let config = Config { max_response_header_size: 96, ..Config::default() };
    let mut conn = connection_with(config, &[b"GET / HTTP/1.1\r\nHost: x\r\n\r\n"]);
    conn.parse_request(true).unwrap();
    let value = "v".repeat(64).parse().unwrap();
    conn.response_mut().set_header("X-Big".parse().unwrap(), value).unwrap();

    let err = conn.commit().unwrap_err();
    assert!(matches!(err.kind(), Kind::ResponseHeadersTooLarge));
    assert!(!conn.response().is_committed());
    assert!(output(&conn).is_empty());

    conn.send_error(StatusCode::INTERNAL_SERVER_ERROR).unwrap();
    assert_eq!(
        output(&conn),
        "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
    );
}

#[test]
fn server_header_and_request_limit() {
    let config = Config {
        max_keep_alive_requests: Some(1),
        send_reason_phrase: false,
        server_header: Some("h1wire".into()),
        ..Config::default()
    };
    let mut conn = connection_with(config, &[b"GET / HTTP/1.1\r\nHost: x\r\n\r\n"]);
    conn.parse_request(true).unwrap();
    assert!(!conn.keep_alive());
    conn.response_mut().set_status(StatusCode::NOT_FOUND).unwrap();
    conn.finish().unwrap();
    assert_eq!(
        output(&conn),
        "HTTP/1.1 404 \r\nContent-Length: 0\r\nConnection: close\r\nServer: h1wire\r\n\r\n"
    );
}

#[test]
fn recycle_between_sockets() {
    let mut conn = connection(&[b"POST / HTTP/1.1\r\nHost: a\r\nContent-Length: 2\r\nX-Old: 1\r\n\r\nab"]);
    conn.parse_request(true).unwrap();
    conn.body().unwrap().mark(1);
    conn.response_mut().set_status(StatusCode::NOT_FOUND).unwrap();

    conn.init(MemorySocket::with_fragments([&b"GET /new HTTP/1.1\r\nHost: b\r\n\r\n"[..]]));
    conn.parse_request(true).unwrap();
    assert_eq!(conn.request().uri(), "/new");
    assert!(conn.request().header("x-old").is_none());
    assert_eq!(conn.response().status(), StatusCode::OK);

    let err = conn.body().unwrap().reset().unwrap_err();
    assert!(matches!(err.kind(), Kind::Misuse(Misuse::ResetWithoutMark)));
}

#[test]
fn unanswered_expect_continue_closes() {
    let mut conn = Connection::new(Arc::new(Config::default()), Arc::new(ConverterPool::default()));
    conn.init(MemorySocket::new());
    conn.socket_mut().unwrap().push(
        &b"POST /big HTTP/1.1\r\nHost: x\r\nExpect: 100-continue\r\nContent-Length: 5\r\n\r\n"[..],
    );
    assert_eq!(conn.parse_request(true).unwrap(), Parsed::Ready);
    assert!(conn.keep_alive());

    // answered without reading, the client never sends the body
    conn.response_mut().set_status(StatusCode::CONTENT_TOO_LARGE).unwrap();
    conn.finish().unwrap();
    assert!(!conn.keep_alive());
    assert_eq!(
        output(&conn),
        "HTTP/1.1 413 Content Too Large\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
    );
}

#[test]
fn expect_continue_with_empty_body_stays_alive() {
    let mut conn = connection(&[
        b"POST / HTTP/1.1\r\nHost: x\r\nExpect: 100-continue\r\nContent-Length: 0\r\n\r\n",
    ]);
    conn.parse_request(true).unwrap();
    conn.finish().unwrap();
    assert!(conn.keep_alive());
    assert_eq!(output(&conn), "HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
}

#[test]
fn header_injection_is_rejected() {
    let mut conn = connection(&[b"GET / HTTP/1.1\r\nHost: x\r\n\r\n"]);
    conn.parse_request(true).unwrap();
    let err = conn
        .response_mut()
        .set_content_type("text/html\r\nSet-Cookie: evil=1")
        .unwrap_err();
    assert!(matches!(err.kind(), Kind::InvalidResponseHeader));
    assert_eq!(conn.response().content_type(), None);

    let config = Config { server_header: Some("h1wire\r\nSet-Cookie: evil=1".into()), ..Config::default() };
    let mut conn = connection_with(config, &[b"GET / HTTP/1.1\r\nHost: x\r\n\r\n"]);
    conn.parse_request(true).unwrap();
    let err = conn.commit().unwrap_err();
    assert!(matches!(err.kind(), Kind::InvalidResponseHeader));
    assert!(!conn.response().is_committed());
    assert!(output(&conn).is_empty());
}

#[test]
fn framing_headers_are_not_duplicated() {
    let mut conn = connection(&[b"GET / HTTP/1.1\r\nHost: x\r\n\r\n"]);
    conn.parse_request(true).unwrap();
    conn.response_mut()
        .set_header("Transfer-Encoding".parse().unwrap(), "chunked".parse().unwrap())
        .unwrap();

    let mut writer = conn.writer().unwrap();
    writer.write(b"ab").unwrap();
    writer.flush().unwrap();
    conn.finish().unwrap();
    assert_eq!(
        output(&conn),
        "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n2\r\nab\r\n0\r\n\r\n"
    );
}
