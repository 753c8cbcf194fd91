use std::io;
use tokio::net::TcpListener;
use h1wire::{
    Config, Connection, Error,
    app::ReadLine,
    headers::{HeaderName, HeaderValue},
    http::StatusCode,
    net::TcpSocket,
};

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let io = TcpListener::bind("0.0.0.0:3000").await?;
    let config = Config {
        server_header: Some("h1wire-example".into()),
        ..Config::from_env()
    };

    h1wire::server::serve(io, handle, config).await
}

fn handle(conn: &mut Connection<TcpSocket>) -> Result<(), Error> {
    let req = conn.request();
    log::info!("> {} {} {}", req.method(), req.uri(), req.protocol());

    let uri = conn.request().uri().to_owned();
    match uri.as_str() {
        "/lines" => lines(conn),
        "/null" => Ok(()),
        "/" => {
            conn.response_mut().set_content_type("text/plain; charset=utf-8")?;
            conn.writer()?.write_str("Hello, World!\n")
        }
        _ => {
            conn.response_mut().set_status(StatusCode::NOT_FOUND)?;
            conn.writer()?.write(b"not found\n")
        }
    }
}

/// Echo the request body line by line, numbered, in a chunked response.
fn lines(conn: &mut Connection<TcpSocket>) -> Result<(), Error> {
    conn.response_mut().set_content_type("text/plain")?;
    conn.response_mut()
        .set_header(HeaderName::from_static("X-Echo"), HeaderValue::from_static(b"lines"))?;

    let mut lines = Vec::new();
    let mut body = conn.body()?;
    while let ReadLine::Line(line) = body.read_line()? {
        lines.push(line);
    }

    let mut writer = conn.writer()?;
    for (i, line) in lines.iter().enumerate() {
        writer.write_str(&format!("{:>4}  {line}\n", i + 1))?;
        writer.flush()?;
    }
    Ok(())
}
