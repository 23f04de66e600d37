// src/rpc/transport.rs

//! HTTP transport to supervisord's XML-RPC endpoint.
//!
//! supervisord serves XML-RPC at `/RPC2`, either on a unix socket
//! (`[unix_http_server]`) or on TCP (`[inet_http_server]`). One request per
//! connection, HTTP/1.0, so the response ends when the server closes.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, UnixStream};
use tracing::trace;

use crate::errors::{Result, StartupError};

pub const SERVER_URL_ENV: &str = "SUPERVISOR_SERVER_URL";
pub const DEFAULT_SERVER_URL: &str = "unix:///var/run/supervisor.sock";
const RPC_PATH: &str = "/RPC2";

/// Where supervisord listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerUrl {
    Unix(PathBuf),
    Http { host: String, port: u16 },
}

impl ServerUrl {
    /// `SUPERVISOR_SERVER_URL` (set by supervisord for its children), or the
    /// default socket.
    pub fn from_env() -> Result<Self> {
        match std::env::var(SERVER_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => url.parse(),
            _ => DEFAULT_SERVER_URL.parse(),
        }
    }

    fn host_header(&self) -> String {
        match self {
            ServerUrl::Unix(_) => "localhost".to_string(),
            ServerUrl::Http { host, port } => format!("{host}:{port}"),
        }
    }
}

impl FromStr for ServerUrl {
    type Err = StartupError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(path) = s.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(StartupError::Transport(format!("empty socket path in '{s}'")));
            }
            return Ok(ServerUrl::Unix(PathBuf::from(path)));
        }

        let Some(rest) = s.strip_prefix("http://") else {
            return Err(StartupError::Transport(format!(
                "unsupported server url '{s}' (expected unix:// or http://)"
            )));
        };

        let authority = rest.split('/').next().unwrap_or_default();
        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|e| {
                    StartupError::Transport(format!("invalid port in '{s}': {e}"))
                })?;
                (host, port)
            }
            None => (authority, 80),
        };
        if host.is_empty() {
            return Err(StartupError::Transport(format!("missing host in '{s}'")));
        }

        Ok(ServerUrl::Http {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for ServerUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerUrl::Unix(path) => write!(f, "unix://{}", path.display()),
            ServerUrl::Http { host, port } => write!(f, "http://{host}:{port}"),
        }
    }
}

/// POST `body` to `/RPC2` and return the response body.
pub async fn post_xml(url: &ServerUrl, body: &str) -> Result<String> {
    let connect_err =
        |e: std::io::Error| StartupError::Transport(format!("failed to connect to {url}: {e}"));

    match url {
        ServerUrl::Unix(path) => {
            let stream = UnixStream::connect(path).await.map_err(connect_err)?;
            exchange(stream, &url.host_header(), body).await
        }
        ServerUrl::Http { host, port } => {
            let stream = TcpStream::connect((host.as_str(), *port))
                .await
                .map_err(connect_err)?;
            exchange(stream, &url.host_header(), body).await
        }
    }
}

async fn exchange<S>(mut stream: S, host: &str, body: &str) -> Result<String>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = format!(
        "POST {RPC_PATH} HTTP/1.0\r\n\
         Host: {host}\r\n\
         User-Agent: supervisord-dependent-startup\r\n\
         Content-Type: text/xml\r\n\
         Content-Length: {}\r\n\
         \r\n\
         {body}",
        body.len()
    );
    trace!(%request, "rpc request");

    stream.write_all(request.as_bytes()).await?;
    stream.flush().await?;

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await?;
    let response = String::from_utf8_lossy(&raw);
    trace!(%response, "rpc response");

    split_response(&response)
}

/// Check the status line and return the body.
fn split_response(response: &str) -> Result<String> {
    let (head, body) = response
        .split_once("\r\n\r\n")
        .or_else(|| response.split_once("\n\n"))
        .ok_or_else(|| StartupError::Transport("truncated HTTP response".to_string()))?;

    let status_line = head.lines().next().unwrap_or_default();
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| {
            StartupError::Transport(format!("invalid HTTP status line '{status_line}'"))
        })?;

    if status != 200 {
        return Err(StartupError::Transport(format!(
            "supervisord answered '{status_line}'"
        )));
    }
    Ok(body.to_string())
}
