//! Account-scoped and table-scoped clients.
//!
//! [`TableServiceClient`] addresses a storage account; [`TableClient`]
//! addresses one table within it and submits transactions. Both are cheaply
//! cloneable and safe to share across tasks.
//!
//! # Example
//!
//! ```rust,no_run
//! use azure_data_core::auth::StorageCredential;
//! use azure_data_core::client::ServiceClient;
//! use azure_data_tables::client::TableServiceClient;
//! use azure_data_tables::entity::TableEntity;
//! use azure_data_tables::operation::TransactionOperation;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = ServiceClient::builder()
//!     .endpoint("https://myaccount.table.core.windows.net")
//!     .credential(StorageCredential::sas_token("sv=2019-02-02&sig=..."))
//!     .build()?;
//!
//! let table = TableServiceClient::new(service).table_client("People");
//!
//! let results = table
//!     .submit_transaction(vec![
//!         TransactionOperation::insert(
//!             TableEntity::new("sales", "order-001").property("Amount", 250),
//!         ),
//!         TransactionOperation::delete("sales", "order-000"),
//!     ])
//!     .await?;
//!
//! for (operation, metadata) in &results {
//!     println!("{} -> {:?}", operation.row_key(), metadata.etag());
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::{TableError, TableResult};
use crate::operation::TransactionOperation;
use crate::transaction::{self, BatchResult};
use azure_data_core::client::ServiceClient;
use azure_data_core::connection::parse_connection_string;
use url::Url;

/// Account-level client for the table service.
#[derive(Debug, Clone)]
pub struct TableServiceClient {
    service: ServiceClient,
}

impl TableServiceClient {
    /// Create a client over an already configured [`ServiceClient`].
    pub fn new(service: ServiceClient) -> Self {
        Self { service }
    }

    /// Create a client from a storage connection string.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string is malformed, carries no
    /// usable credential, or yields an invalid endpoint.
    pub fn from_connection_string(conn: &str) -> TableResult<Self> {
        let (endpoint, credential) = parse_connection_string(conn)?;
        let service = ServiceClient::builder()
            .endpoint(endpoint.as_str())
            .credential(credential)
            .build()?;
        Ok(Self { service })
    }

    /// Get the account endpoint URL.
    pub fn endpoint(&self) -> &Url {
        self.service.endpoint()
    }

    /// Get a client scoped to one table.
    pub fn table_client(&self, table_name: impl Into<String>) -> TableClient {
        TableClient {
            service: self.service.clone(),
            table_name: table_name.into(),
        }
    }
}

/// Client for one table; the entry point for transactions.
#[derive(Debug, Clone)]
pub struct TableClient {
    service: ServiceClient,
    table_name: String,
}

impl TableClient {
    /// Create a client over an already configured [`ServiceClient`].
    pub fn new(service: ServiceClient, table_name: impl Into<String>) -> Self {
        Self {
            service,
            table_name: table_name.into(),
        }
    }

    /// Create a client from a storage connection string.
    pub fn from_connection_string(conn: &str, table_name: impl Into<String>) -> TableResult<Self> {
        Ok(TableServiceClient::from_connection_string(conn)?.table_client(table_name))
    }

    /// Get the table name this client addresses.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Get the account endpoint URL.
    pub fn endpoint(&self) -> &Url {
        self.service.endpoint()
    }

    /// Submit a transaction: all operations commit atomically at the
    /// service, or none do.
    ///
    /// Operations are executed as a single wire request and their results
    /// come back in submission order. Every operation in one transaction
    /// must target the same partition key.
    ///
    /// # Errors
    ///
    /// - [`TableError::Validation`] for an empty operation list or mixed
    ///   partition keys, without contacting the service.
    /// - [`TableError::Authentication`], [`TableError::NotFound`],
    ///   [`TableError::PayloadTooLarge`], or [`TableError::BatchFailure`]
    ///   when the service rejects the batch; failures that stem from the
    ///   change set carry the full ordered sub-response list.
    ///
    /// # Tracing
    ///
    /// Emits a span named `tables::submit_transaction`.
    #[tracing::instrument(
        name = "tables::submit_transaction",
        skip(self, operations),
        fields(table = %self.table_name, operations = operations.len())
    )]
    pub async fn submit_transaction(
        &self,
        operations: Vec<TransactionOperation>,
    ) -> TableResult<BatchResult> {
        if let Some(first) = operations.first() {
            let partition_key = first.partition_key().to_string();
            if let Some(stray) = operations
                .iter()
                .find(|operation| operation.partition_key() != partition_key)
            {
                return Err(TableError::Validation(format!(
                    "all operations in a transaction must target partition key \
                     {partition_key:?}, found {:?}",
                    stray.partition_key()
                )));
            }
        }

        transaction::submit(&self.service, &self.table_name, operations).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::TableEntity;

    #[test]
    fn from_connection_string_builds_the_endpoint() {
        let client = TableClient::from_connection_string(
            "AccountName=myacct;SharedAccessSignature=sv=2019-02-02&sig=abc",
            "People",
        )
        .expect("should build");

        assert_eq!(client.table_name(), "People");
        assert_eq!(
            client.endpoint().as_str(),
            "https://myacct.table.core.windows.net/"
        );
    }

    #[test]
    fn from_connection_string_rejects_account_key_only() {
        let result = TableClient::from_connection_string(
            "AccountName=myacct;AccountKey=c2VjcmV0",
            "People",
        );

        assert!(matches!(result, Err(TableError::Core(_))));
    }

    #[tokio::test]
    async fn mixed_partition_keys_are_rejected_locally() {
        let client = TableClient::from_connection_string(
            "AccountName=myacct;SharedAccessSignature=sig=abc",
            "People",
        )
        .expect("should build");

        let operations = vec![
            TransactionOperation::insert(TableEntity::new("pk1", "rk1")),
            TransactionOperation::insert(TableEntity::new("pk2", "rk2")),
        ];

        let err = client
            .submit_transaction(operations)
            .await
            .expect_err("should fail");

        assert!(matches!(err, TableError::Validation(_)));
        assert!(err.to_string().contains("partition key"));
    }
}
