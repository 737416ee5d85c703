//! Minimal HTTP/1.1 transport in front of a [`Router`].
//!
//! Reads a request head and a `Content-Length` body, hands the request to
//! [`Router::serve`] and writes the response back. Connections are kept
//! alive until the client sends `Connection: close`, goes idle for
//! [`ServerConfig::keep_alive`] or the stream ends.
//!
//! Chunked request bodies are not supported: such requests get `400` and
//! the connection is closed. Bodies above [`ServerConfig::max_body_size`]
//! get `413`, also closing the connection.

use crate::http::{Method, Request, Response, UnknownMethod};
use crate::router::Router;
use std::collections::HashMap;
use std::io::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, ToSocketAddrs};

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub max_connections: usize,
    pub keep_alive: Duration,
    /// Largest accepted `Content-Length`, in bytes.
    pub max_body_size: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_connections: 256,
            keep_alive: Duration::from_secs(5),
            max_body_size: 2 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn max_body_size(mut self, max_body_size: u64) -> Self {
        self.max_body_size = max_body_size;
        self
    }
}

pub struct Server {
    router: Arc<Router>,
    config: ServerConfig,
}

impl Server {
    pub fn new(router: Router) -> Self {
        Self::with_config(router, ServerConfig::default())
    }

    pub fn with_config(router: Router, config: ServerConfig) -> Self {
        Self {
            router: Arc::new(router),
            config,
        }
    }

    pub async fn listen<A: ToSocketAddrs>(self, addr: A) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.run(listener).await
    }

    /// Accepts connections on an already bound listener until it fails.
    pub async fn run(self, listener: TcpListener) -> std::io::Result<()> {
        let connections = Arc::new(AtomicUsize::new(0));
        tracing::info!(
            addr = %listener.local_addr()?,
            max_connections = self.config.max_connections,
            keep_alive_secs = self.config.keep_alive.as_secs(),
            max_body_size = self.config.max_body_size,
            "server listening"
        );

        loop {
            let (mut stream, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    tracing::warn!(error = %err, "accept failed");
                    continue;
                }
            };

            if connections.load(Ordering::Relaxed) >= self.config.max_connections {
                tracing::warn!(%peer, "max connections reached, refusing");
                let busy = Response::text(503, "503 service unavailable");
                if let Err(err) = write_response(&mut stream, &busy, false).await {
                    tracing::debug!(%peer, error = %err, "failed to send 503");
                }
                continue;
            }

            connections.fetch_add(1, Ordering::Relaxed);
            let router = Arc::clone(&self.router);
            let connections = Arc::clone(&connections);
            let config = self.config.clone();

            tokio::spawn(async move {
                if let Err(err) = handle_connection(&router, stream, &config).await {
                    tracing::warn!(%peer, error = %err, "connection error");
                }
                connections.fetch_sub(1, Ordering::Relaxed);
            });
        }
    }
}

/// Why a request could not be read off the wire.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ReadError {
    #[error("malformed request: {0}")]
    Malformed(String),
    #[error("request body of {length} bytes exceeds the {limit} byte limit")]
    TooLarge { length: u64, limit: u64 },
    #[error(transparent)]
    Io(#[from] Error),
}

async fn handle_connection<S>(router: &Router, stream: S, config: &ServerConfig) -> Result<(), Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(stream);
    loop {
        let read = read_request(&mut reader, config.max_body_size);
        let request = match tokio::time::timeout(config.keep_alive, read).await {
            Ok(Ok(Some(request))) => request,
            Ok(Ok(None)) | Err(_) => return Ok(()),
            Ok(Err(ReadError::Io(err))) => return Err(err),
            Ok(Err(err)) => {
                tracing::debug!(error = %err, "rejecting request");
                let refusal = match err {
                    ReadError::TooLarge { .. } => Response::text(413, "413 payload too large"),
                    _ => Response::text(400, "400 bad request"),
                };
                write_response(reader.get_mut(), &refusal, false).await?;
                return Ok(());
            }
        };

        let close = request
            .get_header("connection")
            .map(|value| value.eq_ignore_ascii_case("close"))
            .unwrap_or(false);
        let response = router.serve(request).await;
        write_response(reader.get_mut(), &response, !close).await?;
        if close {
            return Ok(());
        }
    }
}

/// Reads one request; `None` on a clean end of stream.
pub(crate) async fn read_request<R>(reader: &mut R, max_body_size: u64) -> Result<Option<Request>, ReadError>
where
    R: AsyncBufRead + Unpin,
{
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).await? == 0 {
        return Ok(None);
    }

    let invalid = |msg: &str| ReadError::Malformed(msg.to_string());
    let mut parts = request_line.split_whitespace();
    let method: Method = parts
        .next()
        .ok_or_else(|| invalid("missing method"))?
        .parse()
        .map_err(|err: UnknownMethod| ReadError::Malformed(err.to_string()))?;
    let target = parts.next().ok_or_else(|| invalid("missing request target"))?;

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Err(invalid("unexpected end of request head"));
        }
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some((key, value)) = line.split_once(':') {
            headers.insert(key.trim().to_lowercase(), value.trim().to_string());
        }
    }

    if headers.contains_key("transfer-encoding") {
        return Err(invalid("transfer-encoding is not supported"));
    }

    let mut body = Vec::new();
    if let Some(length) = headers.get("content-length") {
        let length: u64 = length
            .parse()
            .map_err(|_| invalid("invalid content-length"))?;
        if length > max_body_size {
            return Err(ReadError::TooLarge {
                length,
                limit: max_body_size,
            });
        }
        reader.take(length).read_to_end(&mut body).await?;
    }

    let mut request = Request::from_target(method, target).with_body(body);
    request.headers = headers;
    Ok(Some(request))
}

pub(crate) async fn write_response<W>(stream: &mut W, response: &Response, keep_alive: bool) -> Result<(), Error>
where
    W: AsyncWrite + Unpin,
{
    let status = response.status();
    let mut head = format!("HTTP/1.1 {} {}\r\n", status, reason_phrase(status));
    for (name, value) in response.headers() {
        if name == "content-length" || name == "connection" {
            continue;
        }
        head += &format!("{}: {}\r\n", name, value);
    }
    head += &format!("content-length: {}\r\n", response.body().len());
    head += if keep_alive {
        "connection: keep-alive\r\n\r\n"
    } else {
        "connection: close\r\n\r\n"
    };

    stream.write_all(head.as_bytes()).await?;
    stream.write_all(response.body()).await?;
    stream.flush().await
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        413 => "Payload Too Large",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "",
    }
}
