// tests/serve_http.rs

mod common;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use buildmon::serve::{content_type_for, serve};

use crate::common::with_timeout;

struct Server {
    addr: SocketAddr,
    shutdown: broadcast::Sender<()>,
    task: JoinHandle<anyhow::Result<()>>,
}

async fn start(root: &Path) -> Server {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown, rx) = broadcast::channel(1);
    let task = tokio::spawn(serve(listener, root.to_path_buf(), rx));
    Server { addr, shutdown, task }
}

impl Server {
    async fn stop(self) {
        self.shutdown.send(()).unwrap();
        with_timeout(self.task).await.unwrap().unwrap();
    }
}

/// Send a raw request and return (status line, headers lowercased, body).
async fn request(addr: SocketAddr, method: &str, target: &str) -> (String, String, Vec<u8>) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let req = format!("{method} {target} HTTP/1.1\r\nHost: localhost\r\n\r\n");
    stream.write_all(req.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    with_timeout(stream.read_to_end(&mut raw)).await.unwrap();

    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("response has a header block");
    let head = String::from_utf8_lossy(&raw[..split]).into_owned();
    let body = raw[split + 4..].to_vec();
    let (status, headers) = head.split_once("\r\n").unwrap_or((head.as_str(), ""));
    (status.to_string(), headers.to_lowercase(), body)
}

fn public_dir() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let public = dir.path().join("public");
    std::fs::create_dir_all(&public).unwrap();
    std::fs::write(public.join("index.html"), "<html>game</html>").unwrap();
    std::fs::write(public.join("game_engine.js"), "console.log('hi');").unwrap();
    std::fs::write(public.join("game_engine.wasm"), [0u8, 97, 115, 109]).unwrap();
    std::fs::write(dir.path().join("secret.txt"), "outside the root").unwrap();
    (dir, public)
}

#[test]
fn mime_table() {
    assert_eq!(content_type_for(Path::new("a.wasm")), "application/wasm");
    assert_eq!(content_type_for(Path::new("A.WASM")), "application/wasm");
    assert_eq!(content_type_for(Path::new("a.html")), "text/html; charset=utf-8");
    assert_eq!(content_type_for(Path::new("a.js")), "text/javascript; charset=utf-8");
    assert_eq!(content_type_for(Path::new("a.data")), "application/octet-stream");
    assert_eq!(content_type_for(Path::new("Makefile")), "application/octet-stream");
}

#[tokio::test]
async fn wasm_is_served_with_isolation_headers() {
    let (_dir, public) = public_dir();
    let server = start(&public).await;

    let (status, headers, body) = request(server.addr, "GET", "/game_engine.wasm").await;
    assert_eq!(status, "HTTP/1.1 200 OK");
    assert!(headers.contains("content-type: application/wasm"));
    assert!(headers.contains("cross-origin-embedder-policy: require-corp"));
    assert!(headers.contains("cross-origin-opener-policy: same-origin"));
    assert!(headers.contains("content-length: 4"));
    assert_eq!(body, vec![0u8, 97, 115, 109]);

    server.stop().await;
}

#[tokio::test]
async fn directory_serves_index_html() {
    let (_dir, public) = public_dir();
    let server = start(&public).await;

    let (status, headers, body) = request(server.addr, "GET", "/").await;
    assert_eq!(status, "HTTP/1.1 200 OK");
    assert!(headers.contains("content-type: text/html"));
    assert_eq!(body, b"<html>game</html>");

    server.stop().await;
}

#[tokio::test]
async fn head_has_headers_but_no_body() {
    let (_dir, public) = public_dir();
    let server = start(&public).await;

    let (status, headers, body) = request(server.addr, "HEAD", "/game_engine.js?v=2").await;
    assert_eq!(status, "HTTP/1.1 200 OK");
    assert!(headers.contains("content-length: 18"));
    assert!(body.is_empty());

    server.stop().await;
}

#[tokio::test]
async fn errors_carry_isolation_headers_too() {
    let (_dir, public) = public_dir();
    let server = start(&public).await;

    let (status, headers, _) = request(server.addr, "GET", "/missing.js").await;
    assert_eq!(status, "HTTP/1.1 404 Not Found");
    assert!(headers.contains("cross-origin-embedder-policy: require-corp"));

    let (status, _, _) = request(server.addr, "GET", "/../secret.txt").await;
    assert_eq!(status, "HTTP/1.1 403 Forbidden");

    let (status, _, _) = request(server.addr, "GET", "/%2e%2e/secret.txt").await;
    assert_eq!(status, "HTTP/1.1 403 Forbidden");

    let (status, headers, _) = request(server.addr, "POST", "/index.html").await;
    assert_eq!(status, "HTTP/1.1 405 Method Not Allowed");
    assert!(headers.contains("allow: get, head"));
    assert!(headers.contains("cross-origin-opener-policy: same-origin"));

    server.stop().await;
}
