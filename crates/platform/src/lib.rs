//! # eapike platform
//!
//! Core platform types and traits shared by the eapike crates.
//!
//! This crate provides:
//! - Unified error types (`EapikeError`, `EapikeResult`)
//! - The `SecurityModule` lifecycle trait
//! - `Severity`, used to rank security-relevant failures
//!
//! # Examples
//!
//! ```
//! use eapike_platform::{EapikeError, EapikeResult};
//!
//! fn lookup_secret(id: &str) -> EapikeResult<Vec<u8>> {
//!     if id.is_empty() {
//!         return Err(EapikeError::Config("identity is empty".to_string()));
//!     }
//!     Ok(id.as_bytes().to_vec())
//! }
//!
//! # fn main() -> EapikeResult<()> {
//! let secret = lookup_secret("peer@example.org")?;
//! assert!(!secret.is_empty());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod error;
pub mod traits;

pub use error::{EapikeError, EapikeResult};
pub use traits::{SecurityModule, Severity};

