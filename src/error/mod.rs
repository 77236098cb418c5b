//! Error handling for the Suno client
//!
//! This module defines the error taxonomy surfaced by every client operation.

pub mod types;

pub use types::{Error, Result};
