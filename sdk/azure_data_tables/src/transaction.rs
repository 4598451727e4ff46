//! The table transaction pipeline.
//!
//! A transaction packs an ordered list of operations into one nested
//! multipart request, sends it through the core client as a single wire
//! call, and demultiplexes the response back into ordered per-operation
//! results. The service applies the change set atomically: on any failure
//! the whole transaction fails, and the caller receives one error carrying
//! every decoded sub-response for inspection.
//!
//! Encoding and decoding are pure, synchronous, in-memory work; the only
//! suspension point is the wire call itself. Each call (and each retry
//! attempt inside the core client) encodes a fresh envelope, so boundary
//! tokens are never replayed.

use crate::error::{TableError, TableResult};
use crate::multipart::{decode_batch_response, encode_batch, SubResponse};
use crate::operation::{build_part_request, TransactionOperation};
use azure_data_core::client::ServiceClient;
use azure_data_core::error::{sanitize, ServiceError};

/// Metadata extracted from one successful sub-response.
#[derive(Debug, Clone, Default)]
pub struct OperationMetadata {
    etag: Option<String>,
}

impl OperationMetadata {
    /// The ETag assigned to the entity by this operation, when the service
    /// returned one.
    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }
}

/// Ordered (operation, metadata) pairs returned by a committed transaction.
/// The order equals the submission order.
pub type BatchResult = Vec<(TransactionOperation, OperationMetadata)>;

const BATCH_PATH: &str = "$batch";

/// Headers on the outer batch request, alongside `x-ms-version` and the
/// multipart `Content-Type` set by the core client.
const BATCH_HEADERS: &[(&str, &str)] = &[
    ("DataServiceVersion", "3.0"),
    ("MaxDataServiceVersion", "3.0;NetFx"),
    ("Accept", "application/json"),
];

/// The change-set statuses with a dedicated error kind, in precedence
/// order: the first status present anywhere in the sub-response list picks
/// the error. Everything else falls back to a generic batch failure.
const FAILURE_PRECEDENCE: &[(u16, fn(Vec<SubResponse>) -> TableError)] = &[
    (404, |parts| TableError::NotFound { parts }),
    (413, |parts| TableError::PayloadTooLarge { parts }),
];

/// Execute one transaction against `table`.
pub(crate) async fn submit(
    client: &ServiceClient,
    table: &str,
    operations: Vec<TransactionOperation>,
) -> TableResult<BatchResult> {
    if operations.is_empty() {
        // A zero-operation change set carries no information; rejecting it
        // here saves the round trip.
        return Err(TableError::Validation(
            "a transaction must contain at least one operation".into(),
        ));
    }

    let requests = operations
        .iter()
        .map(|operation| build_part_request(client.endpoint(), table, operation))
        .collect::<TableResult<Vec<_>>>()?;

    tracing::debug!(operations = operations.len(), "sending batch request");

    let response = client
        .post_raw(BATCH_PATH, BATCH_HEADERS, || {
            let encoded = encode_batch(&requests);
            (encoded.content_type(), encoded.body)
        })
        .await?;

    let status = response.status().as_u16();
    match status {
        202 => {}
        403 => return Err(TableError::Authentication),
        404 => return Err(TableError::NotFound { parts: Vec::new() }),
        413 => return Err(TableError::PayloadTooLarge { parts: Vec::new() }),
        _ => {
            let message = sanitize(&response.text().await.unwrap_or_default());
            return Err(TableError::BatchFailure {
                status,
                message,
                parts: Vec::new(),
            });
        }
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = response.text().await.map_err(ServiceError::from)?;

    let parts = decode_batch_response(&content_type, &body)?;
    let parts = classify_failures(parts)?;

    if parts.len() != operations.len() {
        return Err(TableError::InvalidResponse(format!(
            "expected {} sub-responses, found {}",
            operations.len(),
            parts.len()
        )));
    }

    tracing::debug!(operations = parts.len(), "transaction committed");

    Ok(operations
        .into_iter()
        .zip(parts.into_iter().map(extract_metadata))
        .collect())
}

/// Check every sub-response status and pick the error for a failed change
/// set from the precedence table. Returns the parts untouched when all
/// succeeded.
fn classify_failures(parts: Vec<SubResponse>) -> Result<Vec<SubResponse>, TableError> {
    if parts.iter().all(SubResponse::is_success) {
        return Ok(parts);
    }

    for (status, build_error) in FAILURE_PRECEDENCE {
        if parts.iter().any(|part| part.status() == *status) {
            return Err(build_error(parts));
        }
    }

    let status = parts
        .iter()
        .find(|part| !part.is_success())
        .map(SubResponse::status)
        .unwrap_or_default();
    Err(TableError::BatchFailure {
        status,
        message: "the change set was rejected by the service".into(),
        parts,
    })
}

fn extract_metadata(part: SubResponse) -> OperationMetadata {
    OperationMetadata {
        etag: part.header("ETag").map(str::to_string),
    }
}
