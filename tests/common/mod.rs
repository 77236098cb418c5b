//! Common test utilities and helpers
//!
//! Every upstream origin (identity, API, CDN) is pointed at one wiremock
//! server, under `/v1`, `/api` and `/cdn` respectively.

#![allow(dead_code)]

use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use suno_client::config::Settings;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const COOKIE: &str = "__client=test-client-cookie; __client_uat=1717000000";
pub const SESSION_ID: &str = "sess_test";
pub const JWT: &str = "jwt-token";
pub const SONG_ID: &str = "0f6c3a9e-3c43-4c1b-9a1e-1d2f3a4b5c6d";

/// Settings pointing at the mock server with fast retry timings
pub fn test_settings(server: &MockServer) -> Settings {
    let mut settings = Settings::new(COOKIE);
    settings.auth.clerk_base_url = format!("{}/v1", server.uri());
    settings.api.base_url = format!("{}/api", server.uri());
    settings.api.cdn_base_url = format!("{}/cdn", server.uri());
    settings.api.request_timeout = Duration::from_secs(5);
    settings.retry.base_delay = Duration::from_millis(10);
    settings.retry.max_jitter = Duration::ZERO;
    settings.retry.relax_tls_on_failure = false;
    settings.polling.check_interval = Duration::from_millis(20);
    settings.polling.max_wait = Duration::from_millis(200);
    settings.download.retry_delay = Duration::from_millis(10);
    settings.download.timeout = Duration::from_secs(5);
    settings.challenge.page_url = format!("{}/create", server.uri());
    settings
}

/// Mount the Clerk session lookup
pub async fn mount_session_lookup(server: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/v1/client"))
        .and(query_param("__clerk_api_version", "2021-02-05"))
        .and(query_param("_clerk_js_version", "5.35.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": {"last_active_session_id": SESSION_ID, "sessions": []},
            "client": null
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// Mount Clerk token minting
pub async fn mount_token_mint(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(format!("/v1/client/sessions/{}/tokens", SESSION_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "token",
            "jwt": JWT
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// Feed entry as upstream renders it
pub fn song_json(id: &str, audio_ready: bool, image_ready: bool) -> Value {
    let status = if audio_ready { "complete" } else { "streaming" };
    let audio_url = if audio_ready {
        Value::from(format!("https://cdn1.suno.ai/{}.mp3", id))
    } else {
        Value::from("")
    };
    let image_large_url = if image_ready {
        Value::from(format!("https://cdn1.suno.ai/image_large_{}.jpeg", id))
    } else {
        Value::Null
    };

    json!({
        "id": id,
        "status": status,
        "title": "Night Drive",
        "audio_url": audio_url,
        "video_url": "",
        "image_url": null,
        "image_large_url": image_large_url,
        "major_model_version": "v3.5",
        "model_name": "chirp-v3",
        "metadata": {"tags": "synthwave", "duration": 142.5},
        "is_liked": false,
        "user_id": "user_1",
        "is_trashed": false,
        "reaction": null,
        "created_at": "2024-06-01T12:30:00.000Z",
        "play_count": 0,
        "upvote_count": 0,
        "is_public": false
    })
}

/// Plain TCP upstream for failures wiremock cannot produce (dropped
/// connections, truncated bodies). Connection `n` (0-based) is answered with
/// the raw bytes of `respond(n)` and then closed; `None` closes it without
/// writing anything. Returns the bound address and a connection counter.
pub async fn raw_http_server<F>(respond: F) -> (SocketAddr, Arc<AtomicUsize>)
where
    F: Fn(usize) -> Option<Vec<u8>> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let n = counter.fetch_add(1, Ordering::SeqCst);
            read_request_head(&mut stream).await;
            if let Some(bytes) = respond(n) {
                let _ = stream.write_all(&bytes).await;
                let _ = stream.flush().await;
            }
            let _ = stream.shutdown().await;
        }
    });

    (addr, hits)
}

async fn read_request_head(stream: &mut TcpStream) {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
}

/// Raw `200 OK` response with a complete body
pub fn http_ok(content_type: &str, body: &[u8]) -> Vec<u8> {
    let mut response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        content_type,
        body.len()
    )
    .into_bytes();
    response.extend_from_slice(body);
    response
}

/// Raw `200 OK` that announces `announced` bytes but carries only `body`
pub fn http_truncated(announced: usize, body: &[u8]) -> Vec<u8> {
    let mut response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: {}\r\n\r\n",
        announced
    )
    .into_bytes();
    response.extend_from_slice(body);
    response
}
