//! Request executor integration tests
//!
//! Drives the classified-retry loop against a mock upstream.

mod common;

use async_trait::async_trait;
use common::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use suno_client::{
    Error, Result, Settings, SunoClient,
    challenge::ChallengeResolver,
    config::UnprocessableStrategy,
    session::CookieJar,
    types::Credentials,
};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn cloudflare_block(status: u16) -> ResponseTemplate {
    ResponseTemplate::new(status)
        .insert_header("server", "cloudflare")
        .insert_header("cf-ray", "8a1b2c3d4e5f-AMS")
        .set_body_string("<html>Just a moment...</html>")
}

#[derive(Debug, Default)]
struct FakeResolver {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl ChallengeResolver for FakeResolver {
    async fn solve(&self, _target_url: &str, credentials: &Credentials) -> Result<CookieJar> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(credentials.raw_cookie.contains("__client=test-client-cookie"));
        if self.fail {
            return Err(Error::challenge("widget never appeared"));
        }
        let mut jar = CookieJar::new();
        jar.insert("cf_clearance".to_string(), "cleared".to_string());
        jar.insert("__session".to_string(), "fresh-jwt".to_string());
        Ok(jar)
    }
}

#[tokio::test]
async fn test_expired_token_is_renewed_per_401() {
    let server = MockServer::start().await;
    mount_session_lookup(&server, 1).await;
    mount_token_mint(&server, 2).await;

    Mock::given(method("GET"))
        .and(path("/api/feed"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(2)
        .with_priority(1)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/feed"))
        .and(header("authorization", "Bearer jwt-token"))
        .and(header("cookie", COOKIE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([song_json(SONG_ID, true, true)])))
        .expect(1)
        .mount(&server)
        .await;

    let client = SunoClient::new(test_settings(&server)).unwrap();
    let songs = client.get_songs().await.unwrap();

    assert_eq!(songs.len(), 1);
    assert_eq!(songs[0].id, SONG_ID);
}

#[tokio::test]
async fn test_unprocessable_without_resolver_fails_fast() {
    let server = MockServer::start().await;
    mount_token_mint(&server, 0).await;

    Mock::given(method("GET"))
        .and(path("/api/feed"))
        .respond_with(ResponseTemplate::new(422).set_body_string("token validation failed"))
        .expect(1)
        .mount(&server)
        .await;

    let client = SunoClient::new(test_settings(&server)).unwrap();
    let err = client.get_songs().await.unwrap_err();

    assert!(matches!(err, Error::ChallengeRequired { .. }), "{err:?}");
}

#[tokio::test]
async fn test_edge_block_backs_off_without_touching_credentials() {
    let server = MockServer::start().await;
    mount_session_lookup(&server, 0).await;
    mount_token_mint(&server, 0).await;

    Mock::given(method("GET"))
        .and(path("/api/feed"))
        .respond_with(cloudflare_block(503))
        .up_to_n_times(2)
        .with_priority(1)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/feed"))
        .and(header("cookie", COOKIE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = SunoClient::new(test_settings(&server)).unwrap();
    let songs = client.get_songs().await.unwrap();

    assert!(songs.is_empty());
}

#[tokio::test]
async fn test_plain_forbidden_is_surfaced_unchanged() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/feed"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .expect(1)
        .mount(&server)
        .await;

    let client = SunoClient::new(test_settings(&server)).unwrap();
    let err = client.get_songs().await.unwrap_err();

    match err {
        Error::Upstream { status, body } => {
            assert_eq!(status, 403);
            assert_eq!(body, "forbidden");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_retry_budget_is_bounded() {
    let server = MockServer::start().await;
    mount_session_lookup(&server, 1).await;
    mount_token_mint(&server, 2).await;

    Mock::given(method("GET"))
        .and(path("/api/feed"))
        .respond_with(ResponseTemplate::new(401))
        .expect(3)
        .mount(&server)
        .await;

    let mut settings = test_settings(&server);
    settings.retry.max_retries = 3;
    let client = SunoClient::new(settings).unwrap();
    let err = client.get_songs().await.unwrap_err();

    match err {
        Error::RetryExhausted {
            last_status,
            attempts,
        } => {
            assert_eq!(last_status, Some(401));
            assert_eq!(attempts, 3);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_resolver_cookies_are_installed_before_retry() {
    let server = MockServer::start().await;
    mount_token_mint(&server, 0).await;

    Mock::given(method("GET"))
        .and(path("/api/feed"))
        .respond_with(ResponseTemplate::new(422))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/feed"))
        .and(header("authorization", "Bearer fresh-jwt"))
        .and(header(
            "cookie",
            "__client=test-client-cookie; __client_uat=1717000000; __session=fresh-jwt; cf_clearance=cleared",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = Arc::new(FakeResolver::default());
    let client = SunoClient::builder(test_settings(&server))
        .challenge_resolver(resolver.clone())
        .build()
        .unwrap();

    client.get_songs().await.unwrap();

    assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failing_resolver_terminates_within_budget() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/feed"))
        .respond_with(ResponseTemplate::new(422))
        .expect(4)
        .mount(&server)
        .await;

    let mut settings = test_settings(&server);
    settings.retry.max_retries = 4;
    let resolver = Arc::new(FakeResolver {
        fail: true,
        ..FakeResolver::default()
    });
    let client = SunoClient::builder(settings)
        .challenge_resolver(resolver.clone())
        .build()
        .unwrap();

    let err = client.get_songs().await.unwrap_err();

    assert!(
        matches!(
            err,
            Error::RetryExhausted {
                last_status: Some(422),
                attempts: 4
            }
        ),
        "{err:?}"
    );
    // The last 422 exhausts the budget without another solve
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_extend_session_strategy_retries_after_extension() {
    let server = MockServer::start().await;
    mount_session_lookup(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/api/feed"))
        .respond_with(ResponseTemplate::new(422))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/user/extend_session_id/"))
        .and(body_json(json!({"session_id": SESSION_ID})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "is_extended": true,
            "session_id": "sess_extended"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut settings = test_settings(&server);
    settings.retry.unprocessable = UnprocessableStrategy::ExtendSession;
    let client = SunoClient::new(settings).unwrap();

    client.get_songs().await.unwrap();

    assert_eq!(
        client.session().store().session_id().await.as_deref(),
        Some("sess_extended")
    );
}

#[tokio::test]
async fn test_connection_failure_propagates() {
    let mut settings = Settings::new(COOKIE);
    settings.api.base_url = "http://127.0.0.1:9/api".to_string();
    settings.retry.relax_tls_on_failure = true;
    let client = SunoClient::new(settings).unwrap();

    let err = client.get_songs().await.unwrap_err();

    assert!(matches!(err, Error::Network(_)), "{err:?}");
}

fn raw_upstream_settings(addr: std::net::SocketAddr, relax_tls: bool) -> Settings {
    let mut settings = Settings::new(COOKIE);
    settings.api.base_url = format!("http://{}/api", addr);
    settings.retry.relax_tls_on_failure = relax_tls;
    settings
}

#[tokio::test]
async fn test_dropped_connection_retried_once_with_relaxed_client() {
    let (addr, hits) =
        raw_http_server(|n| (n > 0).then(|| http_ok("application/json", b"[]"))).await;
    let client = SunoClient::new(raw_upstream_settings(addr, true)).unwrap();

    let songs = client.get_songs().await.unwrap();

    assert!(songs.is_empty());
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_dropped_connection_not_retried_when_relaxing_disabled() {
    let (addr, hits) =
        raw_http_server(|n| (n > 0).then(|| http_ok("application/json", b"[]"))).await;
    let client = SunoClient::new(raw_upstream_settings(addr, false)).unwrap();

    let err = client.get_songs().await.unwrap_err();

    assert!(matches!(err, Error::Network(_)), "{err:?}");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_relaxed_retry_happens_only_once() {
    let (addr, hits) = raw_http_server(|_| None).await;
    let client = SunoClient::new(raw_upstream_settings(addr, true)).unwrap();

    let err = client.get_songs().await.unwrap_err();

    assert!(matches!(err, Error::Network(_)), "{err:?}");
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}
