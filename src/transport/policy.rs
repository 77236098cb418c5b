//! Response classification and retry policy
//!
//! Pure decision logic for the request executor: every response is
//! classified, and the classification plus the attempt count decide what
//! happens next. Nothing in here performs I/O.

use crate::config::RetrySettings;
use rand::Rng;
use reqwest::{
    StatusCode,
    header::{HeaderMap, SERVER},
};
use std::time::Duration;

/// What a response means for the current call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// 2xx
    Success,
    /// Bearer token expired or missing
    AuthExpired,
    /// Human-verification (or session) problem reported as 422
    ChallengeRequired,
    /// Edge proxy blocked or rate limited the request
    EdgeBlocked,
    /// Anything else; surfaced to the caller unchanged
    Fatal,
}

/// Classify a response by status and headers
pub fn classify(status: StatusCode, headers: &HeaderMap) -> Classification {
    if status.is_success() {
        return Classification::Success;
    }
    match status {
        StatusCode::UNAUTHORIZED => Classification::AuthExpired,
        StatusCode::UNPROCESSABLE_ENTITY => Classification::ChallengeRequired,
        StatusCode::FORBIDDEN | StatusCode::SERVICE_UNAVAILABLE if has_edge_markers(headers) => {
            Classification::EdgeBlocked
        }
        _ => Classification::Fatal,
    }
}

/// Whether the response was produced by the edge proxy rather than the API
pub fn has_edge_markers(headers: &HeaderMap) -> bool {
    if headers.contains_key("cf-mitigated") {
        return true;
    }
    if headers
        .keys()
        .any(|name| name.as_str().starts_with("cf-chl"))
    {
        return true;
    }
    let served_by_edge = headers
        .get(SERVER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("cloudflare"));
    served_by_edge && headers.contains_key("cf-ray")
}

/// Backoff parameters and attempt budget
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per logical call
    pub max_retries: u32,
    /// Delay before the second attempt, doubled for each further attempt
    pub base_delay: Duration,
    /// Upper bound of the uniform jitter added to each delay
    pub max_jitter: Duration,
}

impl RetryPolicy {
    /// Backoff after the given (1-based) attempt, without jitter
    pub fn base_backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Backoff after the given (1-based) attempt, with jitter
    pub fn backoff(&self, attempt: u32) -> Duration {
        let jitter = if self.max_jitter.is_zero() {
            Duration::ZERO
        } else {
            let millis = self.max_jitter.as_millis().min(u64::MAX as u128) as u64;
            Duration::from_millis(rand::rng().random_range(0..=millis))
        };
        self.base_backoff(attempt).saturating_add(jitter)
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_retries: settings.max_retries.max(1),
            base_delay: settings.base_delay,
            max_jitter: settings.max_jitter,
        }
    }
}

/// Next step chosen by [`RetryState::next`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Hand the response to the caller
    Return,
    /// Renew the bearer token, then retry
    RenewAuth,
    /// Solve the challenge, then retry
    SolveChallenge,
    /// Sleep, then retry
    Backoff(Duration),
    /// Surface the response as an error
    Fail,
    /// Budget spent on retryable outcomes
    Exhausted,
}

/// Attempt bookkeeping for one logical call
#[derive(Debug)]
pub struct RetryState<'a> {
    policy: &'a RetryPolicy,
    attempts: u32,
    last_status: Option<u16>,
}

impl<'a> RetryState<'a> {
    /// Fresh state for a new call
    pub fn new(policy: &'a RetryPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
            last_status: None,
        }
    }

    /// Attempts made so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Status of the last classified response
    pub fn last_status(&self) -> Option<u16> {
        self.last_status
    }

    /// Record an attempt that ended with `status` and decide what to do
    pub fn next(&mut self, status: StatusCode, classification: Classification) -> Decision {
        self.attempts += 1;
        self.last_status = Some(status.as_u16());

        match classification {
            Classification::Success => Decision::Return,
            Classification::Fatal => Decision::Fail,
            _ if self.attempts >= self.policy.max_retries => Decision::Exhausted,
            Classification::AuthExpired => Decision::RenewAuth,
            Classification::ChallengeRequired => Decision::SolveChallenge,
            Classification::EdgeBlocked => Decision::Backoff(self.policy.backoff(self.attempts)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use reqwest::header::HeaderValue;
    use rstest::rstest;

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_secs(3),
            max_jitter: Duration::ZERO,
        }
    }

    fn cloudflare_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(SERVER, HeaderValue::from_static("cloudflare"));
        headers.insert("cf-ray", HeaderValue::from_static("8a1b2c3d4e5f-AMS"));
        headers
    }

    #[rstest]
    #[case(200, Classification::Success)]
    #[case(201, Classification::Success)]
    #[case(401, Classification::AuthExpired)]
    #[case(422, Classification::ChallengeRequired)]
    #[case(429, Classification::Fatal)]
    #[case(400, Classification::Fatal)]
    #[case(404, Classification::Fatal)]
    #[case(500, Classification::Fatal)]
    fn test_classify_by_status(#[case] status: u16, #[case] expected: Classification) {
        let status = StatusCode::from_u16(status).unwrap();
        assert_eq!(classify(status, &HeaderMap::new()), expected);
    }

    #[rstest]
    #[case(403)]
    #[case(503)]
    fn test_edge_block_requires_markers(#[case] status: u16) {
        let status = StatusCode::from_u16(status).unwrap();
        assert_eq!(classify(status, &HeaderMap::new()), Classification::Fatal);
        assert_eq!(
            classify(status, &cloudflare_headers()),
            Classification::EdgeBlocked
        );
    }

    #[test]
    fn test_edge_markers() {
        let mut headers = HeaderMap::new();
        assert!(!has_edge_markers(&headers));

        headers.insert(SERVER, HeaderValue::from_static("cloudflare"));
        assert!(!has_edge_markers(&headers));

        headers.insert("cf-ray", HeaderValue::from_static("abc"));
        assert!(has_edge_markers(&headers));

        let mut mitigated = HeaderMap::new();
        mitigated.insert("cf-mitigated", HeaderValue::from_static("challenge"));
        assert!(has_edge_markers(&mitigated));

        let mut chl = HeaderMap::new();
        chl.insert("cf-chl-bypass", HeaderValue::from_static("1"));
        assert!(has_edge_markers(&chl));
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = policy(5);
        assert_eq!(policy.base_backoff(1), Duration::from_secs(3));
        assert_eq!(policy.base_backoff(2), Duration::from_secs(6));
        assert_eq!(policy.base_backoff(3), Duration::from_secs(12));
    }

    #[test]
    fn test_backoff_jitter_bounded() {
        let policy = RetryPolicy {
            max_retries: 5,
            base_delay: Duration::from_secs(1),
            max_jitter: Duration::from_millis(500),
        };
        for _ in 0..50 {
            let delay = policy.backoff(2);
            assert!(delay >= Duration::from_secs(2));
            assert!(delay <= Duration::from_millis(2500));
        }
    }

    #[test]
    fn test_success_and_fatal_decisions() {
        let policy = policy(3);
        let mut state = RetryState::new(&policy);
        assert_eq!(
            state.next(StatusCode::OK, Classification::Success),
            Decision::Return
        );

        let mut state = RetryState::new(&policy);
        assert_eq!(
            state.next(StatusCode::BAD_REQUEST, Classification::Fatal),
            Decision::Fail
        );
        assert_eq!(state.last_status(), Some(400));
    }

    #[test]
    fn test_retryable_until_exhausted() {
        let policy = policy(3);
        let mut state = RetryState::new(&policy);

        assert_eq!(
            state.next(StatusCode::UNAUTHORIZED, Classification::AuthExpired),
            Decision::RenewAuth
        );
        assert_eq!(
            state.next(StatusCode::UNPROCESSABLE_ENTITY, Classification::ChallengeRequired),
            Decision::SolveChallenge
        );
        assert_eq!(
            state.next(StatusCode::FORBIDDEN, Classification::EdgeBlocked),
            Decision::Exhausted
        );
        assert_eq!(state.attempts(), 3);
    }

    #[test]
    fn test_success_on_last_attempt_is_returned() {
        let policy = policy(2);
        let mut state = RetryState::new(&policy);
        state.next(StatusCode::UNAUTHORIZED, Classification::AuthExpired);
        assert_eq!(
            state.next(StatusCode::OK, Classification::Success),
            Decision::Return
        );
    }

    #[test]
    fn test_edge_block_backs_off() {
        let policy = policy(5);
        let mut state = RetryState::new(&policy);
        state.next(StatusCode::SERVICE_UNAVAILABLE, Classification::EdgeBlocked);
        assert_eq!(
            state.next(StatusCode::SERVICE_UNAVAILABLE, Classification::EdgeBlocked),
            Decision::Backoff(Duration::from_secs(6))
        );
    }

    #[test]
    fn test_each_challenge_counts_once() {
        let policy = policy(3);
        let mut state = RetryState::new(&policy);
        let unprocessable = StatusCode::UNPROCESSABLE_ENTITY;

        assert_eq!(
            state.next(unprocessable, Classification::ChallengeRequired),
            Decision::SolveChallenge
        );
        assert_eq!(
            state.next(unprocessable, Classification::ChallengeRequired),
            Decision::SolveChallenge
        );
        assert_eq!(
            state.next(unprocessable, Classification::ChallengeRequired),
            Decision::Exhausted
        );
        assert_eq!(state.attempts(), 3);
        assert_eq!(state.last_status(), Some(422));
    }
}
