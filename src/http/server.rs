//! Minimal line-oriented HTTP/1.1 server: one task per connection, a
//! request line + headers read followed by a `Content-Length`-delimited
//! body, then a single response write and close. No keep-alive.

use crate::cache::Cache;
use crate::error::CacheError;
use crate::metrics::prometheus::PrometheusMeter;
use serde::Serialize;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, warn};

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

#[derive(Serialize)]
struct StatusBody<'a> {
    status: &'a str,
}

const MAX_HEADER_BYTES: usize = 8 * 1024;
const CACHE_PATH_PREFIX: &str = "/api/v1/cache/";

/// The HTTP transport in front of a [`Cache`].
pub struct Server {
    cache: Arc<Cache>,
    meter: Arc<PrometheusMeter>,
}

impl Server {
    pub fn new(cache: Arc<Cache>, meter: Arc<PrometheusMeter>) -> Self {
        Self { cache, meter }
    }

    /// Accept connections forever, handling each on its own task.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> std::io::Result<()> {
        loop {
            let (stream, peer) = listener.accept().await?;
            let server = self.clone();
            tokio::spawn(async move {
                if let Err(err) = server.handle_connection(stream).await {
                    warn!(%peer, error = %err, "error handling connection");
                }
            });
        }
    }

    async fn handle_connection(&self, stream: TcpStream) -> std::io::Result<()> {
        let mut reader = BufReader::new(stream);
        let mut request_line = String::new();
        let n = reader.read_line(&mut request_line).await?;
        if n == 0 {
            return Ok(());
        }

        let (method, path) = match parse_request_line(&request_line) {
            Some(parts) => parts,
            None => return write_response(reader.into_inner(), 400, "application/json", error_body("malformed request line")).await,
        };

        let mut content_length: usize = 0;
        let mut header_bytes = request_line.len();
        loop {
            let mut line = String::new();
            let n = reader.read_line(&mut line).await?;
            header_bytes += n;
            if n == 0 || line == "\r\n" || line == "\n" {
                break;
            }
            if header_bytes > MAX_HEADER_BYTES {
                return write_response(
                    reader.into_inner(),
                    400,
                    "application/json",
                    error_body("headers too large"),
                )
                .await;
            }
            if let Some(value) = line.strip_prefix("Content-Length:").or_else(|| line.strip_prefix("content-length:")) {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }

        let mut body = vec![0u8; content_length];
        if content_length > 0 {
            reader.read_exact(&mut body).await?;
        }

        debug!(%method, %path, "handling request");
        let stream = reader.into_inner();
        self.dispatch(stream, &method, &path, body).await
    }

    async fn dispatch(
        &self,
        stream: TcpStream,
        method: &str,
        path: &str,
        body: Vec<u8>,
    ) -> std::io::Result<()> {
        if path == "/health" {
            return if method == "GET" {
                write_response(stream, 200, "application/json", status_body("ok")).await
            } else {
                write_response(stream, 405, "application/json", error_body("method not allowed")).await
            };
        }

        if path == "/metrics" && method == "GET" {
            return match self.meter.gather_text() {
                Ok(text) => write_response(stream, 200, "text/plain; version=0.0.4", text.into_bytes()).await,
                Err(_) => write_response(stream, 500, "application/json", error_body("failed to gather metrics")).await,
            };
        }

        if let Some(raw_key) = path.strip_prefix(CACHE_PATH_PREFIX) {
            let key = percent_decode(raw_key);
            return match method {
                "GET" => match self.cache.get(&key) {
                    Ok(value) => write_response(stream, 200, "application/octet-stream", value.into()).await,
                    Err(err) => {
                        let (status, message) = get_error_status(&err);
                        write_response(stream, status, "application/json", error_body(message)).await
                    }
                },
                "POST" => match self.cache.set(&key, body) {
                    Ok(()) => write_response(stream, 200, "application/json", status_body("ok")).await,
                    Err(err) => {
                        let (status, message) = set_error_status(&err);
                        write_response(stream, status, "application/json", error_body(message)).await
                    }
                },
                _ => write_response(stream, 405, "application/json", error_body("method not allowed")).await,
            };
        }

        write_response(stream, 404, "application/json", error_body("not found")).await
    }
}

/// Maps a [`CacheError`] from `get` to an HTTP status, per the route table.
fn get_error_status(err: &CacheError) -> (u16, &'static str) {
    match err {
        CacheError::NotFound => (404, "key not found"),
        CacheError::Expired => (404, "key expired"),
        _ => (500, "internal error"),
    }
}

/// Maps a [`CacheError`] from `set` to an HTTP status. `TooManyKeys` maps
/// to 500, not 4xx — preserved from the reference implementation.
fn set_error_status(err: &CacheError) -> (u16, &'static str) {
    match err {
        CacheError::InvalidValue => (400, "value must not be empty"),
        CacheError::ValueTooLarge => (413, "value too large for shard budget"),
        CacheError::CacheFull => (507, "cache is full"),
        CacheError::TooManyKeys => (500, "too many keys in shard"),
        _ => (500, "internal error"),
    }
}

fn parse_request_line(line: &str) -> Option<(String, String)> {
    let mut parts = line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();
    parts.next()?; // HTTP version
    Some((method, path))
}

fn error_body(message: &str) -> Vec<u8> {
    serde_json::to_vec(&ErrorBody { error: message }).expect("error body always serializes")
}

fn status_body(status: &str) -> Vec<u8> {
    serde_json::to_vec(&StatusBody { status }).expect("status body always serializes")
}

async fn write_response(
    mut stream: TcpStream,
    status: u16,
    content_type: &str,
    body: Vec<u8>,
) -> std::io::Result<()> {
    let reason = reason_phrase(status);
    let header = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    stream.write_all(header.as_bytes()).await?;
    stream.write_all(&body).await?;
    stream.shutdown().await
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        507 => "Insufficient Storage",
        _ => "Unknown",
    }
}

/// Decode `%XX` escapes in a URL path segment. Invalid escapes are passed
/// through unchanged rather than rejected.
fn percent_decode(segment: &str) -> String {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(value) = u8::from_str_radix(&segment[i + 1..i + 3], 16) {
                out.push(value);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_decode_handles_escapes() {
        assert_eq!(percent_decode("a%20b"), "a b");
        assert_eq!(percent_decode("plain"), "plain");
        assert_eq!(percent_decode("100%"), "100%");
    }

    #[test]
    fn get_status_mapping_matches_route_table() {
        assert_eq!(get_error_status(&CacheError::NotFound).0, 404);
        assert_eq!(get_error_status(&CacheError::Expired).0, 404);
    }

    #[test]
    fn set_status_mapping_matches_route_table() {
        assert_eq!(set_error_status(&CacheError::InvalidValue).0, 400);
        assert_eq!(set_error_status(&CacheError::ValueTooLarge).0, 413);
        assert_eq!(set_error_status(&CacheError::CacheFull).0, 507);
        assert_eq!(set_error_status(&CacheError::TooManyKeys).0, 500);
    }

    #[test]
    fn parses_well_formed_request_line() {
        let (method, path) = parse_request_line("GET /health HTTP/1.1\r\n").unwrap();
        assert_eq!(method, "GET");
        assert_eq!(path, "/health");
    }

    #[test]
    fn rejects_malformed_request_line() {
        assert!(parse_request_line("garbage\r\n").is_none());
    }
}
