//! Transaction operation kinds and their unsent HTTP requests.
//!
//! Each [`TransactionOperation`] describes one table mutation. The request
//! builder here turns an operation into a fully formed but unsent request —
//! method, absolute entity URL, headers, serialized body — ready to be
//! embedded as one part of a change set. The builder is a pure
//! transformation: no transport framing, no authorization. Only the outer
//! batch request is signed.

use crate::entity::TableEntity;
use crate::error::TableResult;
use azure_data_core::error::ServiceError;
use reqwest::Method;
use url::Url;

const ACCEPT_JSON: &str = "application/json;odata=minimalmetadata";

/// How an update or upsert applies its properties to a stored entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Replace the stored entity with exactly the submitted properties.
    Replace,
    /// Merge the submitted properties into the stored entity, keeping
    /// properties the submission does not name.
    Merge,
}

/// One mutation inside a table transaction. Immutable once submitted.
#[derive(Debug, Clone)]
pub enum TransactionOperation {
    /// Insert a new entity; fails if it already exists.
    Insert { entity: TableEntity },

    /// Update an existing entity; fails if it does not exist, or if `etag`
    /// is set and no longer matches.
    Update {
        entity: TableEntity,
        mode: UpdateMode,
        etag: Option<String>,
    },

    /// Insert the entity or apply it to an existing one, per `mode`.
    Upsert {
        entity: TableEntity,
        mode: UpdateMode,
    },

    /// Delete an entity by its keys; fails if `etag` is set and no longer
    /// matches.
    Delete {
        partition_key: String,
        row_key: String,
        etag: Option<String>,
    },
}

impl TransactionOperation {
    /// Insert a new entity.
    pub fn insert(entity: TableEntity) -> Self {
        Self::Insert { entity }
    }

    /// Update an existing entity unconditionally.
    pub fn update(entity: TableEntity, mode: UpdateMode) -> Self {
        Self::Update {
            entity,
            mode,
            etag: None,
        }
    }

    /// Update an existing entity only if its ETag still matches.
    pub fn update_if_match(entity: TableEntity, mode: UpdateMode, etag: impl Into<String>) -> Self {
        Self::Update {
            entity,
            mode,
            etag: Some(etag.into()),
        }
    }

    /// Insert the entity or apply it to an existing one.
    pub fn upsert(entity: TableEntity, mode: UpdateMode) -> Self {
        Self::Upsert { entity, mode }
    }

    /// Delete an entity unconditionally.
    pub fn delete(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Self::Delete {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            etag: None,
        }
    }

    /// Delete an entity only if its ETag still matches.
    pub fn delete_if_match(
        partition_key: impl Into<String>,
        row_key: impl Into<String>,
        etag: impl Into<String>,
    ) -> Self {
        Self::Delete {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            etag: Some(etag.into()),
        }
    }

    /// The partition key this operation targets.
    pub fn partition_key(&self) -> &str {
        match self {
            Self::Insert { entity }
            | Self::Update { entity, .. }
            | Self::Upsert { entity, .. } => entity.partition_key(),
            Self::Delete { partition_key, .. } => partition_key,
        }
    }

    /// The row key this operation targets.
    pub fn row_key(&self) -> &str {
        match self {
            Self::Insert { entity }
            | Self::Update { entity, .. }
            | Self::Upsert { entity, .. } => entity.row_key(),
            Self::Delete { row_key, .. } => row_key,
        }
    }
}

/// An unsent HTTP request, ready for embedding as one multipart part.
#[derive(Debug)]
pub(crate) struct PartRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<String>,
}

/// Build the unsent request for one operation.
pub(crate) fn build_part_request(
    endpoint: &Url,
    table: &str,
    operation: &TransactionOperation,
) -> TableResult<PartRequest> {
    let request = match operation {
        TransactionOperation::Insert { entity } => PartRequest {
            method: Method::POST,
            url: table_url(endpoint, table)?,
            headers: vec![
                ("Accept", ACCEPT_JSON.to_string()),
                ("Content-Type", "application/json".to_string()),
                ("Prefer", "return-no-content".to_string()),
            ],
            body: Some(entity.to_json().to_string()),
        },
        TransactionOperation::Update { entity, mode, etag } => PartRequest {
            method: method_for(*mode),
            url: entity_url(endpoint, table, entity.partition_key(), entity.row_key())?,
            headers: vec![
                ("Accept", ACCEPT_JSON.to_string()),
                ("Content-Type", "application/json".to_string()),
                ("If-Match", etag.clone().unwrap_or_else(|| "*".to_string())),
            ],
            body: Some(entity.to_json().to_string()),
        },
        TransactionOperation::Upsert { entity, mode } => PartRequest {
            method: method_for(*mode),
            url: entity_url(endpoint, table, entity.partition_key(), entity.row_key())?,
            headers: vec![
                ("Accept", ACCEPT_JSON.to_string()),
                ("Content-Type", "application/json".to_string()),
            ],
            body: Some(entity.to_json().to_string()),
        },
        TransactionOperation::Delete {
            partition_key,
            row_key,
            etag,
        } => PartRequest {
            method: Method::DELETE,
            url: entity_url(endpoint, table, partition_key, row_key)?,
            headers: vec![
                ("Accept", ACCEPT_JSON.to_string()),
                ("If-Match", etag.clone().unwrap_or_else(|| "*".to_string())),
            ],
            body: None,
        },
    };
    Ok(request)
}

fn method_for(mode: UpdateMode) -> Method {
    match mode {
        UpdateMode::Replace => Method::PUT,
        UpdateMode::Merge => Method::PATCH,
    }
}

fn table_url(endpoint: &Url, table: &str) -> TableResult<Url> {
    endpoint.join(table).map_err(|e| {
        ServiceError::InvalidEndpoint(format!("failed to construct URL for table {table}: {e}"))
            .into()
    })
}

/// The address of one entity: `Table(PartitionKey='pk',RowKey='rk')`.
/// Single quotes inside key values are escaped by doubling.
fn entity_url(endpoint: &Url, table: &str, partition_key: &str, row_key: &str) -> TableResult<Url> {
    let address = format!(
        "{}(PartitionKey='{}',RowKey='{}')",
        table,
        escape_key(partition_key),
        escape_key(row_key)
    );
    endpoint.join(&address).map_err(|e| {
        ServiceError::InvalidEndpoint(format!("failed to construct URL for {address}: {e}")).into()
    })
}

fn escape_key(value: &str) -> String {
    value.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> Url {
        Url::parse("https://myacct.table.core.windows.net").unwrap()
    }

    fn entity() -> TableEntity {
        TableEntity::new("pk1", "rk1").property("Name", "widget")
    }

    #[test]
    fn insert_posts_to_the_table_with_prefer_header() {
        let op = TransactionOperation::insert(entity());

        let request = build_part_request(&endpoint(), "People", &op).unwrap();

        assert_eq!(request.method, Method::POST);
        assert_eq!(
            request.url.as_str(),
            "https://myacct.table.core.windows.net/People"
        );
        assert!(request
            .headers
            .iter()
            .any(|(name, value)| *name == "Prefer" && value == "return-no-content"));
        let body = request.body.expect("insert has a body");
        assert!(body.contains("\"PartitionKey\":\"pk1\""));
    }

    #[test]
    fn update_replace_puts_to_the_entity_address() {
        let op = TransactionOperation::update(entity(), UpdateMode::Replace);

        let request = build_part_request(&endpoint(), "People", &op).unwrap();

        assert_eq!(request.method, Method::PUT);
        assert_eq!(
            request.url.as_str(),
            "https://myacct.table.core.windows.net/People(PartitionKey='pk1',RowKey='rk1')"
        );
        assert!(request
            .headers
            .iter()
            .any(|(name, value)| *name == "If-Match" && value == "*"));
    }

    #[test]
    fn update_merge_uses_patch_and_carries_the_etag() {
        let op =
            TransactionOperation::update_if_match(entity(), UpdateMode::Merge, "W/\"etag-1\"");

        let request = build_part_request(&endpoint(), "People", &op).unwrap();

        assert_eq!(request.method, Method::PATCH);
        assert!(request
            .headers
            .iter()
            .any(|(name, value)| *name == "If-Match" && value == "W/\"etag-1\""));
    }

    #[test]
    fn upsert_sends_no_if_match() {
        let op = TransactionOperation::upsert(entity(), UpdateMode::Replace);

        let request = build_part_request(&endpoint(), "People", &op).unwrap();

        assert_eq!(request.method, Method::PUT);
        assert!(!request.headers.iter().any(|(name, _)| *name == "If-Match"));
    }

    #[test]
    fn delete_has_no_body() {
        let op = TransactionOperation::delete("pk1", "rk1");

        let request = build_part_request(&endpoint(), "People", &op).unwrap();

        assert_eq!(request.method, Method::DELETE);
        assert!(request.body.is_none());
        assert!(request
            .headers
            .iter()
            .any(|(name, value)| *name == "If-Match" && value == "*"));
    }

    #[test]
    fn single_quotes_in_keys_are_doubled() {
        let op = TransactionOperation::delete("o'brien", "rk'1");

        let request = build_part_request(&endpoint(), "People", &op).unwrap();

        assert!(request
            .url
            .as_str()
            .contains("PartitionKey='o''brien',RowKey='rk''1'"));
    }

    #[test]
    fn operation_exposes_its_keys() {
        let insert = TransactionOperation::insert(entity());
        assert_eq!(insert.partition_key(), "pk1");
        assert_eq!(insert.row_key(), "rk1");

        let delete = TransactionOperation::delete("pk2", "rk2");
        assert_eq!(delete.partition_key(), "pk2");
        assert_eq!(delete.row_key(), "rk2");
    }
}
