//! Transport layer
//!
//! HTTP client construction, response classification and the resilient
//! request executor that wraps every content API call.

pub mod executor;
pub mod http;
pub mod policy;

pub use executor::{RequestExecutor, UpstreamResponse};
pub use http::{browser_headers, build_client};
pub use policy::{Classification, Decision, RetryPolicy, RetryState, classify};
