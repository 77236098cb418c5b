//! Human-verification challenge solving
//!
//! When upstream answers 422 the request executor hands the protected page
//! URL and the current credentials to a [`ChallengeResolver`]. A resolver
//! returns the complete refreshed cookie jar, which is merged back into the
//! credential store before the request is retried.

#[cfg(feature = "browser")]
pub mod browser;

use crate::{Result, session::CookieJar, types::Credentials};
use async_trait::async_trait;

#[cfg(feature = "browser")]
pub use browser::BrowserChallengeResolver;

/// Solves an interactive challenge and returns refreshed cookies
#[async_trait]
pub trait ChallengeResolver: Send + Sync + std::fmt::Debug {
    /// Solve the challenge guarding `target_url`.
    ///
    /// Implementations must return every cookie they can read back, or an
    /// error; never a partial jar.
    async fn solve(&self, target_url: &str, credentials: &Credentials) -> Result<CookieJar>;
}
