//! Connection serving loop.
use std::io;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::charset::ConverterPool;
use crate::config::Config;
use crate::error::Error;
use crate::h1::{Connection, Parsed};
use crate::log::{debug, error, info};
use crate::net::{SocketHandle, TcpSocket};

/// Request handler.
///
/// The handler reads the request and writes the response through the connection. Whatever it
/// leaves unwritten is completed by the server loop.
pub trait Handler<S>: Send + Sync + 'static {
    fn handle(&self, conn: &mut Connection<S>) -> Result<(), Error>;
}

impl<S, F> Handler<S> for F
where
    F: Fn(&mut Connection<S>) -> Result<(), Error> + Send + Sync + 'static,
{
    #[inline]
    fn handle(&self, conn: &mut Connection<S>) -> Result<(), Error> {
        self(conn)
    }
}

/// Serve every request of a blocking connection.
///
/// Returns once the connection is closed, either by the peer, by a response that disables
/// keep-alive, or by an error that [closes the connection now](Error::is_close_now), which is
/// returned.
pub fn run<S, H>(conn: &mut Connection<S>, handler: &H) -> Result<(), Error>
where
    S: SocketHandle,
    H: Handler<S> + ?Sized,
{
    loop {
        match conn.parse_request(true) {
            Ok(Parsed::Ready) => {}
            Ok(Parsed::Closed) => return Ok(()),
            Ok(Parsed::Http2Preface) => {
                debug!("http/2 is not supported, closing connection");
                return Ok(());
            }
            // blocking reads never leave a request pending
            Ok(Parsed::Pending) => return Ok(()),
            Err(err) => return reject(conn, err),
        }

        if let Err(err) = handler.handle(conn) {
            if err.is_close_now() {
                return Err(err);
            }
            error!("handler failed: {err}");
            return reject(conn, err);
        }

        if let Err(err) = conn.finish() {
            if err.is_close_now() {
                return Err(err);
            }
            return reject(conn, err);
        }
        debug!(
            "{} {} {} {}b",
            conn.request().method(),
            conn.request().uri(),
            conn.response().status(),
            conn.bytes_written(),
        );

        if !conn.keep_alive() {
            return Ok(());
        }
        conn.next_request();
    }
}

/// Best effort error response, then close.
fn reject<S: SocketHandle>(conn: &mut Connection<S>, err: Error) -> Result<(), Error> {
    if err.is_close_now() {
        return Err(err);
    }
    debug!("rejecting request: {err}");
    match err.status_hint() {
        Some(status) => conn.send_error(status),
        None => Ok(()),
    }
}

/// Accept connections forever, serving each one on the blocking thread pool.
pub async fn serve<H>(listener: TcpListener, handler: H, config: Config) -> io::Result<()>
where
    H: Handler<TcpSocket>,
{
    let config = Arc::new(config);
    let pool = Arc::new(ConverterPool::new(config.max_idle_converters));
    let handler = Arc::new(handler);

    info!("listening on {}", listener.local_addr()?);

    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(ok) => ok,
            Err(err) => {
                error!("failed to accept connection: {err}");
                continue;
            }
        };

        let config = Arc::clone(&config);
        let pool = Arc::clone(&pool);
        let handler = Arc::clone(&handler);

        tokio::task::spawn_blocking(move || {
            debug!("connection from {addr}");
            let socket = match stream.into_std().and_then(TcpSocket::new) {
                Ok(ok) => ok,
                Err(err) => {
                    error!("failed to set up connection from {addr}: {err}");
                    return;
                }
            };

            let mut conn = Connection::new(config, pool);
            conn.init(socket);
            if let Err(err) = run(&mut conn, &*handler) {
                error!("connection from {addr} failed: {err}");
            }
            conn.recycle();
            debug!("connection from {addr} closed");
        });
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::run;
    use crate::charset::ConverterPool;
    use crate::config::Config;
    use crate::error::{Error, Kind};
    use crate::h1::Connection;
    use crate::headers::HeaderValue;
    use crate::http::StatusCode;
    use crate::net::{MemorySocket, TcpSocket};

    type Conn = Connection<MemorySocket>;

    fn serve(
        input: &'static [u8],
        handler: impl Fn(&mut Conn) -> Result<(), Error> + Send + Sync + 'static,
    ) -> (Result<(), Error>, String) {
        let mut conn = Connection::new(Arc::new(Config::default()), Arc::new(ConverterPool::default()));
        conn.init(MemorySocket::with_fragments([input]));
        let result = run(&mut conn, &handler);
        let output = String::from_utf8_lossy(conn.socket().unwrap().output()).into_owned();
        (result, output)
    }

    fn echo(conn: &mut Conn) -> Result<(), Error> {
        let mut body = String::new();
        conn.body()?.read_to_string(&mut body)?;
        let uri = conn.request().uri().to_owned();
        conn.response_mut()
            .set_header("X-Uri".parse().unwrap(), HeaderValue::from_slice(&uri).unwrap())?;
        conn.writer()?.write_str(&body)
    }

    #[test]
    fn serves_until_close() {
        let (result, output) = serve(
            b"POST /a HTTP/1.1\r\nHost: x\r\nContent-Length: 2\r\n\r\nhi\
            GET /b HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n\
            GET /never HTTP/1.1\r\nHost: x\r\n\r\n",
            echo,
        );
        result.unwrap();
        assert_eq!(
            output,
            "HTTP/1.1 200 OK\r\nContent-Length: 2\r\nX-Uri: /a\r\n\r\nhi\
            HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\nX-Uri: /b\r\n\r\n"
        );
    }

    #[test]
    fn malformed_request_is_answered() {
        let (result, output) = serve(b"GET / HTTP/1.1\r\nBad Header\r\n\r\n", echo);
        result.unwrap();
        assert_eq!(output, "HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
    }

    #[test]
    fn handler_error_becomes_500() {
        let (result, output) = serve(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n", |conn| {
            conn.response_mut().set_status(StatusCode::OK)?;
            Err(Kind::InvalidResponseHeader.into())
        });
        result.unwrap();
        assert!(output.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    }

    #[test]
    fn truncated_body_closes_now() {
        let (result, _) = serve(b"POST / HTTP/1.1\r\nHost: x\r\nContent-Length: 10\r\n\r\nabc", echo);
        assert!(matches!(result.unwrap_err().kind(), Kind::UnexpectedEof));
    }

    #[tokio::test]
    async fn serves_over_tcp() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::{TcpListener, TcpStream};

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handler = |conn: &mut Connection<TcpSocket>| conn.writer()?.write(b"ok");
        tokio::spawn(super::serve(listener, handler, Config::default()));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET / HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut output = String::new();
        stream.read_to_string(&mut output).await.unwrap();
        assert_eq!(output, "HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok");
    }
}
