//! Shared helpers for integration tests
#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use ragterm::embedding::{EmbeddingMatrix, TextEmbedder};
use ragterm::ingest::{extract::has_extension, TextExtractor};
use ragterm::Result;

/// A request captured by the stub server
#[derive(Debug)]
pub struct CapturedRequest {
    pub head: String,
    pub body: serde_json::Value,
}

/// One-shot HTTP server answering a single request with `response`
///
/// Returns the base URL (ending in `/v1`) and a receiver for the request.
pub async fn serve_once(response: String) -> (String, oneshot::Receiver<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let Some(request) = read_request(&mut socket).await else {
            return;
        };
        let _ = tx.send(request);

        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
    });

    (format!("http://{}/v1", addr), rx)
}

/// One-shot SSE server that writes one event every `gap`, then closes
///
/// Returns the base URL (ending in `/v1`).
pub async fn serve_slowly(events: Vec<String>, gap: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        if read_request(&mut socket).await.is_none() {
            return;
        }

        let head = "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n";
        if socket.write_all(head.as_bytes()).await.is_err() {
            return;
        }
        for event in events {
            tokio::time::sleep(gap).await;
            let frame = format!("data: {}\n\n", event);
            if socket.write_all(frame.as_bytes()).await.is_err() {
                return;
            }
            socket.flush().await.ok();
        }
        socket.shutdown().await.ok();
    });

    format!("http://{}/v1", addr)
}

/// Read one HTTP request (head plus `Content-Length` body)
async fn read_request(socket: &mut TcpStream) -> Option<CapturedRequest> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buffer.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find(&buffer, b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);

    while buffer.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
    }

    let body = serde_json::from_slice(&buffer[header_end..]).unwrap_or(serde_json::Value::Null);
    Some(CapturedRequest { head, body })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Server-sent events response, closed by the server
pub fn sse_response(events: &[&str]) -> String {
    let mut body = String::new();
    for event in events {
        body.push_str("data: ");
        body.push_str(event);
        body.push_str("\n\n");
    }
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n{}",
        body
    )
}

/// JSON response with an explicit status line
pub fn json_response(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    )
}

/// A streamed delta event carrying `content`
pub fn delta(content: &str) -> String {
    serde_json::json!({ "choices": [{ "delta": { "content": content } }] }).to_string()
}

/// Reads `.pdf` fixtures as plain text
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn accepts(&self, path: &Path) -> bool {
        has_extension(path, "pdf")
    }

    fn extract(&self, path: &Path) -> Result<String> {
        Ok(std::fs::read_to_string(path)?)
    }
}

/// Embeds by keyword counts, one axis per keyword plus a constant bias axis
pub struct KeywordEmbedder {
    pub keywords: Vec<&'static str>,
}

impl TextEmbedder for KeywordEmbedder {
    fn embed(&self, texts: &[&str]) -> Result<EmbeddingMatrix> {
        let rows = texts
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                let mut row: Vec<f32> = self
                    .keywords
                    .iter()
                    .map(|k| lower.matches(k).count() as f32)
                    .collect();
                row.push(0.1);
                let norm = row.iter().map(|x| x * x).sum::<f32>().sqrt();
                row.iter().map(|x| x / norm).collect()
            })
            .collect();
        EmbeddingMatrix::from_rows(rows)
    }
}

pub fn words(prefix: &str, n: usize) -> String {
    (0..n)
        .map(|i| format!("{}{}", prefix, i))
        .collect::<Vec<_>>()
        .join(" ")
}
