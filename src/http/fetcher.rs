//! Raw-socket HTTP/1.0 GET with redirect following.

use native_tls::TlsConnector;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::response::HttpResponse;

/// Redirects followed before giving up on a feed URL.
pub const REDIRECT_LIMIT: u32 = 25;

/// Bound on connection establishment only. Reads are unbounded: the server
/// is told `Connection: close` and the response is read to EOF, so a server
/// that accepts but never finishes can hang the call. Callers wanting
/// bounded latency must wrap the whole fetch externally.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that can occur while fetching a feed over HTTP.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Socket could not be opened (DNS failure, refused, timed out).
    #[error("failed to connect to {host}: {source}")]
    Connection {
        host: String,
        #[source]
        source: io::Error,
    },
    /// TLS handshake with the server failed.
    #[error("TLS handshake with {host} failed: {message}")]
    Tls { host: String, message: String },
    /// Request write or response read failed mid-stream.
    #[error("I/O error during request: {0}")]
    Io(#[from] io::Error),
    /// Status line or a header line violates the response grammar.
    #[error("malformed HTTP response: {0}")]
    MalformedResponse(String),
    /// Terminal non-2xx/3xx status.
    #[error("HTTP request failed: {code} {message}")]
    HttpStatus { code: u16, message: String },
    /// A 301/302 response without a Location header.
    #[error("server sent a {code} redirect without a Location header")]
    BadRedirect { code: u16 },
    /// The Location header did not resolve to a usable URL.
    #[error("invalid redirect target: {0}")]
    InvalidRedirect(#[from] url::ParseError),
    /// Too many consecutive redirects without reaching a 200.
    #[error("redirect limit exceeded after {0} redirects")]
    RedirectLimitExceeded(u32),
    /// URL has no host component (should not survive URL validation).
    #[error("URL has no host: {0}")]
    NoHost(String),
}

/// Fetch `url`, following 301/302 redirects, and return the first 200
/// response. Exactly one socket is opened per attempt; there are no retries
/// beyond the redirect loop itself.
pub fn fetch(url: &Url) -> Result<HttpResponse, FetchError> {
    let mut current = url.clone();
    let mut redirects: u32 = 0;

    loop {
        tracing::debug!(url = %current, "requesting feed");
        let raw = request_once(&current)?;
        let response = HttpResponse::parse(&raw)?;

        match response.status_code {
            200 => {
                tracing::debug!(url = %current, bytes = response.body.len(), "feed fetched");
                return Ok(response);
            }
            code @ (301 | 302) => {
                let location = response
                    .headers
                    .get("location")
                    .ok_or(FetchError::BadRedirect { code })?;
                // Relative Location values are resolved against the URL
                // that produced the redirect.
                let next = current.join(location)?;

                redirects += 1;
                if redirects >= REDIRECT_LIMIT {
                    return Err(FetchError::RedirectLimitExceeded(redirects));
                }
                tracing::debug!(from = %current, to = %next, code, redirects, "following redirect");
                current = next;
            }
            code => {
                return Err(FetchError::HttpStatus {
                    code,
                    message: response.reason,
                })
            }
        }
    }
}

/// One complete request/response cycle on a fresh socket.
fn request_once(url: &Url) -> Result<Vec<u8>, FetchError> {
    let host = url
        .host_str()
        .ok_or_else(|| FetchError::NoHost(url.to_string()))?;
    let port = url.port_or_known_default().unwrap_or(80);

    let stream = connect(host, port)?;
    let mut transport = if url.scheme() == "https" {
        let connector = TlsConnector::new().map_err(|e| FetchError::Tls {
            host: host.to_string(),
            message: e.to_string(),
        })?;
        let tls = connector.connect(host, stream).map_err(|e| FetchError::Tls {
            host: host.to_string(),
            message: e.to_string(),
        })?;
        Transport::Tls(Box::new(tls))
    } else {
        Transport::Plain(stream)
    };

    let mut request = format!("GET {}", url.path());
    if let Some(query) = url.query() {
        request.push('?');
        request.push_str(query);
    }
    request.push_str(" HTTP/1.0\r\n");
    request.push_str(&format!(
        "Host: {host}\r\nAccept: */*\r\nConnection: close\r\n\r\n"
    ));

    transport.write_all(request.as_bytes())?;
    transport.flush()?;

    // `Connection: close` means the server signals completion by closing.
    let mut raw = Vec::new();
    transport.read_to_end(&mut raw)?;
    Ok(raw)
}

fn connect(host: &str, port: u16) -> Result<TcpStream, FetchError> {
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|e| FetchError::Connection {
            host: host.to_string(),
            source: e,
        })?
        .collect();

    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }

    Err(FetchError::Connection {
        host: host.to_string(),
        source: last_err
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no addresses resolved")),
    })
}

/// Plain or TLS-wrapped stream behind one Read/Write surface, so the request
/// path is transparent to the transport.
enum Transport {
    Plain(TcpStream),
    Tls(Box<native_tls::TlsStream<TcpStream>>),
}

impl Read for Transport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Transport::Plain(s) => s.read(buf),
            Transport::Tls(s) => s.read(buf),
        }
    }
}

impl Write for Transport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Transport::Plain(s) => s.write(buf),
            Transport::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Transport::Plain(s) => s.flush(),
            Transport::Tls(s) => s.flush(),
        }
    }
}
