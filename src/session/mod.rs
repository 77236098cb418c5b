//! Session management
//!
//! Credential state for one client instance and the identity provider
//! calls that derive a session id and bearer tokens from the cookie.

pub mod cookies;
pub mod credentials;
pub mod identity;
pub mod manager;

pub use cookies::{CookieJar, merge_cookie_string, parse_cookie_string, to_cookie_string};
pub use credentials::CredentialStore;
pub use identity::{ClerkClient, IdentityProvider};
pub use manager::{SessionManager, SessionManagerGeneric};
