//! # Azure Data Core
//!
//! Shared plumbing for the Azure data-plane Rust clients: the HTTP
//! [`client::ServiceClient`], [`auth::StorageCredential`] resolution,
//! [`connection`] string parsing, and the common [`error::ServiceError`]
//! surface.
//!
//! Service crates such as `azure_data_tables` build on this crate; it is
//! rarely used directly.

pub mod auth;
pub mod client;
pub mod connection;
pub mod error;

pub use error::ServiceError;
