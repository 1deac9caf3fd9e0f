//! Shared building blocks for the OIDC relying-party workspace
//!
//! Holds the pieces every crate needs but none owns: the redacting `Secret`
//! wrapper used for tokens, and the configuration error type returned while
//! loading TOML client configuration.

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
