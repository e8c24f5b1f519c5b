//! Shared configuration, error and data types for Cora.
//!
//! Every other crate in the workspace depends on this one. It performs no
//! network I/O.

pub mod config;
pub mod error;
pub mod types;

pub use config::CoraConfig;
pub use error::{CoraError, Result};
pub use types::*;
