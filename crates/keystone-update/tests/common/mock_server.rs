//! Wiremock helpers for archive downloads

use std::net::TcpListener;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::constants::*;

/// Serve `archive` at [`ARCHIVE_PATH`]
pub async fn mock_archive(server: &MockServer, archive: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(ARCHIVE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(archive))
        .mount(server)
        .await;
}

/// Serve `archive` and require exactly `times` requests
pub async fn mock_archive_expecting(server: &MockServer, archive: Vec<u8>, times: u64) {
    Mock::given(method("GET"))
        .and(path(ARCHIVE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(archive))
        .expect(times)
        .mount(server)
        .await;
}

/// Answer every archive request with `status`
pub async fn mock_archive_status(server: &MockServer, status: u16) {
    Mock::given(method("GET"))
        .and(path(ARCHIVE_PATH))
        .respond_with(ResponseTemplate::new(status).set_body_string("<html>error</html>"))
        .mount(server)
        .await;
}

/// Full archive URL on `server`
pub fn archive_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), ARCHIVE_PATH)
}

/// A URL on a local port nothing listens on
pub fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}{ARCHIVE_PATH}")
}

/// Serve one connection with a hand-written HTTP response, then close it.
///
/// Used for responses wiremock cannot produce: bodies cut short of their
/// declared length and bodies without any length.
pub async fn raw_http_server(response: Vec<u8>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let read = socket.read(&mut buf).await.unwrap();
            if read == 0 {
                return;
            }
            request.extend_from_slice(&buf[..read]);
        }
        let _ = socket.write_all(&response).await;
        let _ = socket.shutdown().await;
    });

    format!("http://127.0.0.1:{port}{ARCHIVE_PATH}")
}

/// A response declaring the full length of `body` but carrying only the
/// first `sent` bytes
pub fn truncated_response(body: &[u8], sent: usize) -> Vec<u8> {
    let mut response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/gzip\r\nContent-Length: {}\r\n\r\n",
        body.len()
    )
    .into_bytes();
    response.extend_from_slice(&body[..sent]);
    response
}

/// A chunked response with no declared length
pub fn chunked_response(body: &[u8]) -> Vec<u8> {
    let mut response =
        b"HTTP/1.1 200 OK\r\nContent-Type: application/gzip\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n"
            .to_vec();
    for chunk in body.chunks(16 * 1024) {
        response.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
        response.extend_from_slice(chunk);
        response.extend_from_slice(b"\r\n");
    }
    response.extend_from_slice(b"0\r\n\r\n");
    response
}
