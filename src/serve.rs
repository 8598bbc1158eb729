// src/serve.rs

//! Minimal static file server for the public dir.
//!
//! Threaded WebAssembly needs `SharedArrayBuffer`, which browsers only expose
//! to cross-origin isolated pages. Every response therefore carries
//! `Cross-Origin-Embedder-Policy: require-corp` and
//! `Cross-Origin-Opener-Policy: same-origin`, and `.wasm` is always served as
//! `application/wasm` so streaming compilation works.
//!
//! Only GET and HEAD are supported. One request per connection.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const MAX_REQUEST_HEAD: usize = 16 * 1024;

const MIME_TYPES: &[(&str, &str)] = &[
    ("html", "text/html; charset=utf-8"),
    ("htm", "text/html; charset=utf-8"),
    ("js", "text/javascript; charset=utf-8"),
    ("mjs", "text/javascript; charset=utf-8"),
    ("css", "text/css; charset=utf-8"),
    ("json", "application/json"),
    ("map", "application/json"),
    ("wasm", "application/wasm"),
    ("txt", "text/plain; charset=utf-8"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("svg", "image/svg+xml"),
    ("ico", "image/x-icon"),
    ("webp", "image/webp"),
    ("wav", "audio/wav"),
    ("mp3", "audio/mpeg"),
    ("ogg", "audio/ogg"),
    ("ttf", "font/ttf"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
];

/// MIME type for a file, by extension (case-insensitive).
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    MIME_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or("application/octet-stream")
}

pub async fn bind(port: u16) -> Result<TcpListener> {
    TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("binding HTTP server to port {port}"))
}

/// Accept connections until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    root: PathBuf,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let root = Arc::new(root.canonicalize().unwrap_or(root));
    info!(
        addr = ?listener.local_addr().ok(),
        root = ?root,
        "serving with cross-origin isolation headers"
    );

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                debug!("shutdown requested");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let root = root.clone();
                    tokio::spawn(async move {
                        if let Err(err) = handle_connection(stream, &root).await {
                            debug!(peer = %peer, error = %format!("{err:#}"), "connection error");
                        }
                    });
                }
                Err(err) => warn!(error = %err, "accept failed"),
            },
        }
    }

    info!("server stopped");
    Ok(())
}

struct Response {
    status: u16,
    reason: &'static str,
    content_type: &'static str,
    body: Vec<u8>,
    allow: bool,
}

impl Response {
    fn ok(content_type: &'static str, body: Vec<u8>) -> Self {
        Self {
            status: 200,
            reason: "OK",
            content_type,
            body,
            allow: false,
        }
    }

    fn error(status: u16, reason: &'static str) -> Self {
        Self {
            status,
            reason,
            content_type: "text/plain; charset=utf-8",
            body: format!("{status} {reason}\n").into_bytes(),
            allow: status == 405,
        }
    }

    fn head(&self, content_length: usize) -> String {
        let mut head = format!(
            "HTTP/1.1 {} {}\r\n\
             Content-Type: {}\r\n\
             Content-Length: {}\r\n\
             Cross-Origin-Embedder-Policy: require-corp\r\n\
             Cross-Origin-Opener-Policy: same-origin\r\n\
             Cache-Control: no-cache\r\n\
             Connection: close\r\n",
            self.status, self.reason, self.content_type, content_length
        );
        if self.allow {
            head.push_str("Allow: GET, HEAD\r\n");
        }
        head.push_str("\r\n");
        head
    }
}

async fn handle_connection(mut stream: TcpStream, root: &Path) -> Result<()> {
    let head = read_request_head(&mut stream).await?;
    let mut parts = head.lines().next().unwrap_or_default().split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or("/").to_string();

    let response = match method.as_str() {
        "GET" | "HEAD" => respond(root, &target).await,
        _ => Response::error(405, "Method Not Allowed"),
    };

    debug!(method = %method, target = %target, status = response.status, "request");

    stream
        .write_all(response.head(response.body.len()).as_bytes())
        .await?;
    if method != "HEAD" {
        stream.write_all(&response.body).await?;
    }
    stream.shutdown().await.ok();
    Ok(())
}

async fn read_request_head(stream: &mut TcpStream) -> Result<String> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") || buf.len() >= MAX_REQUEST_HEAD {
            break;
        }
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

async fn respond(root: &Path, target: &str) -> Response {
    let Some(mut path) = resolve_target(root, target) else {
        return Response::error(403, "Forbidden");
    };

    if tokio::fs::metadata(&path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
    {
        path.push("index.html");
    }

    // Symlinks may point outside the root.
    match tokio::fs::canonicalize(&path).await {
        Ok(canonical) if !canonical.starts_with(root) => {
            return Response::error(403, "Forbidden");
        }
        Ok(_) => {}
        Err(_) => return Response::error(404, "Not Found"),
    }

    match tokio::fs::read(&path).await {
        Ok(body) => Response::ok(content_type_for(&path), body),
        Err(err) => {
            debug!(path = ?path, error = %err, "read failed");
            Response::error(404, "Not Found")
        }
    }
}

/// Map a request target onto a path under `root`, or `None` if it tries to
/// escape it.
fn resolve_target(root: &Path, target: &str) -> Option<PathBuf> {
    let path_part = target.split(['?', '#']).next().unwrap_or_default();
    let decoded = percent_decode(path_part);

    let mut resolved = root.to_path_buf();
    for component in Path::new(decoded.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(resolved)
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hi = (bytes[i + 1] as char).to_digit(16);
            let lo = (bytes[i + 2] as char).to_digit(16);
            if let (Some(hi), Some(lo)) = (hi, lo) {
                out.push((hi * 16 + lo) as u8);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
