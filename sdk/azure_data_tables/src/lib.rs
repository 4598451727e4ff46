//! # Azure Data Tables
//!
//! Azure Table storage client for Rust, built on
//! [`azure_data_core`](https://docs.rs/azure_data_core).
//!
//! The centerpiece is the transactional batch: an ordered list of
//! operations against one partition, packed into a single multipart HTTP
//! request, applied atomically by the service, and demultiplexed back into
//! ordered per-operation results.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use azure_data_tables::client::TableClient;
//! use azure_data_tables::entity::TableEntity;
//! use azure_data_tables::operation::{TransactionOperation, UpdateMode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = TableClient::from_connection_string(
//!         "AccountName=myaccount;SharedAccessSignature=sv=2019-02-02&sig=...",
//!         "Orders",
//!     )?;
//!
//!     let results = client
//!         .submit_transaction(vec![
//!             TransactionOperation::insert(
//!                 TableEntity::new("sales", "order-001").property("Amount", 250),
//!             ),
//!             TransactionOperation::upsert(
//!                 TableEntity::new("sales", "order-002").property("Amount", 120),
//!                 UpdateMode::Merge,
//!             ),
//!         ])
//!         .await?;
//!
//!     println!("committed {} operations", results.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Core Concepts
//!
//! - **Entity**: a row addressed by partition key + row key, carrying a
//!   property map.
//! - **Transaction**: an ordered set of operations against one partition
//!   key, committed atomically — all or nothing.
//! - **Sub-response**: one decoded HTTP response per operation, matched by
//!   position; attached to errors so failures can be traced back to the
//!   operation that caused them.
//!
//! ## Modules
//!
//! - [`client`] - Account and table scoped clients
//! - [`entity`] - The table entity model
//! - [`operation`] - Transaction operation kinds
//! - [`transaction`] - Transaction results and metadata
//! - [`error`] - The error taxonomy

pub mod client;
pub mod entity;
pub mod error;
pub mod multipart;
pub mod operation;
pub mod transaction;

pub use client::{TableClient, TableServiceClient};
pub use entity::TableEntity;
pub use error::{TableError, TableResult};
pub use multipart::SubResponse;
pub use operation::{TransactionOperation, UpdateMode};
pub use transaction::{BatchResult, OperationMetadata};
