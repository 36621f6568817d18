//! One-shot HTTP server for exercising the backends over a real socket.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub const SSE_HEAD: &str =
    "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\nconnection: close\r\n\r\n";

/// Accept one connection, read the whole request, write `head` and then each
/// body part after its delay. Returns the base URL.
pub async fn serve_once(head: &str, parts: Vec<(Duration, Vec<u8>)>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let head = head.to_string();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;

        socket.write_all(head.as_bytes()).await.unwrap();
        for (delay, part) in parts {
            tokio::time::sleep(delay).await;
            if socket.write_all(&part).await.is_err() {
                return;
            }
        }
        let _ = socket.shutdown().await;
    });

    format!("http://{addr}")
}

/// Read headers plus a `content-length` body so closing never resets the
/// connection under unread data.
async fn read_request(socket: &mut tokio::net::TcpStream) {
    let mut request = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        if let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&request[..end]).to_lowercase();
            let body_len = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if request.len() >= end + 4 + body_len {
                return;
            }
        }
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            return;
        }
        request.extend_from_slice(&buf[..n]);
    }
}

/// One SSE `data:` line carrying a streamed token.
pub fn delta(token: &str) -> Vec<u8> {
    let chunk = serde_json::json!({"choices": [{"index": 0, "delta": {"content": token}}]});
    format!("data: {chunk}\n\n").into_bytes()
}
