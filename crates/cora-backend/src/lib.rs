//! Backend access for Cora.
//!
//! Typed wrappers for the NL-to-SQL backend endpoints, the identity token
//! providers that authorize them, and the warehouses that execute generated
//! SQL. Every outbound call fetches a fresh token and performs exactly one
//! HTTP request.

pub mod client;
pub mod error;
pub mod http_client;
pub mod identity;
pub mod warehouse;
pub mod wire;

pub use client::{Backend, BackendClient};
pub use error::{AuthError, BackendError, BackendErrorCause};
pub use http_client::build_http_client;
pub use identity::{
    token_provider_from_config, CommandTokenProvider, MetadataTokenProvider, StaticTokenProvider,
    Token, TokenProvider,
};
pub use warehouse::{BackendWarehouse, BigQueryWarehouse, Warehouse};
