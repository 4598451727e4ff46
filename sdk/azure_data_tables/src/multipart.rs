//! Multipart envelope encoding and response demultiplexing.
//!
//! A table transaction travels as two nested `multipart/mixed` envelopes:
//! an inner change set holding one serialized HTTP request per operation,
//! wrapped as the single part of an outer batch. Both envelopes are encoded
//! by the same [`encode_envelope`] function under different boundary tokens.
//!
//! Boundary tokens are freshly generated random identifiers, never reused
//! across calls: a boundary string from an earlier attempt leaking into a
//! retried body would corrupt parsing on the service side. The `changeset_`
//! and `batch_` prefixes keep the two nesting levels distinguishable.

use crate::error::{TableError, TableResult};
use crate::operation::PartRequest;
use uuid::Uuid;

/// An encoded batch body with its outer boundary token.
#[derive(Debug)]
pub(crate) struct EncodedBatch {
    pub boundary: String,
    pub body: String,
}

impl EncodedBatch {
    /// The `Content-Type` value declaring the outer boundary.
    pub fn content_type(&self) -> String {
        format!("multipart/mixed; boundary={}", self.boundary)
    }
}

/// One part of an envelope: part headers plus an opaque body.
struct Part {
    headers: Vec<String>,
    body: String,
}

fn boundary_token(prefix: &str) -> String {
    format!("{prefix}{}", Uuid::new_v4())
}

/// Encode the change set for `requests` and wrap it into a batch envelope.
pub(crate) fn encode_batch(requests: &[PartRequest]) -> EncodedBatch {
    let changeset_boundary = boundary_token("changeset_");
    let changeset_parts: Vec<Part> = requests
        .iter()
        .map(|request| Part {
            headers: vec![
                "Content-Type: application/http".to_string(),
                "Content-Transfer-Encoding: binary".to_string(),
            ],
            body: serialize_request(request),
        })
        .collect();
    let changeset_body = encode_envelope(&changeset_boundary, &changeset_parts);

    let batch_boundary = boundary_token("batch_");
    let batch_part = Part {
        headers: vec![format!(
            "Content-Type: multipart/mixed; boundary={changeset_boundary}"
        )],
        body: changeset_body,
    };
    let body = encode_envelope(&batch_boundary, std::slice::from_ref(&batch_part));

    EncodedBatch {
        boundary: batch_boundary,
        body,
    }
}

/// Serialize ordered parts under one boundary.
fn encode_envelope(boundary: &str, parts: &[Part]) -> String {
    let mut out = String::new();
    for part in parts {
        out.push_str("--");
        out.push_str(boundary);
        out.push_str("\r\n");
        for header in &part.headers {
            out.push_str(header);
            out.push_str("\r\n");
        }
        out.push_str("\r\n");
        out.push_str(&part.body);
        out.push_str("\r\n");
    }
    out.push_str("--");
    out.push_str(boundary);
    out.push_str("--\r\n");
    out
}

/// Render one unsent request in HTTP/1.1 message form.
fn serialize_request(request: &PartRequest) -> String {
    let mut raw = format!("{} {} HTTP/1.1\r\n", request.method, request.url);
    for (name, value) in &request.headers {
        raw.push_str(name);
        raw.push_str(": ");
        raw.push_str(value);
        raw.push_str("\r\n");
    }
    raw.push_str("\r\n");
    if let Some(body) = &request.body {
        raw.push_str(body);
    }
    raw
}

/// One HTTP response extracted from the multipart stream, corresponding
/// positionally to one submitted operation.
#[derive(Debug, Clone)]
pub struct SubResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: String,
}

impl SubResponse {
    /// The HTTP status code of this sub-response.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Look up a header value by name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The raw sub-response body.
    pub fn body(&self) -> &str {
        &self.body
    }
}

/// Decode the nested multipart response into ordered sub-responses.
///
/// The service returns sub-responses in submission order; this decoder
/// preserves that order and never sorts.
pub(crate) fn decode_batch_response(
    content_type: &str,
    body: &str,
) -> TableResult<Vec<SubResponse>> {
    let batch_boundary = boundary_parameter(content_type).ok_or_else(|| {
        TableError::InvalidResponse(format!(
            "response content type carries no boundary parameter: {content_type}"
        ))
    })?;

    let outer_parts = split_envelope(body, &batch_boundary);
    let changeset = outer_parts.first().ok_or_else(|| {
        TableError::InvalidResponse("batch response has no change-set part".into())
    })?;

    let (changeset_headers, changeset_body) = split_part(changeset)?;
    let changeset_boundary = changeset_headers
        .iter()
        .find_map(|header| boundary_parameter(header))
        .ok_or_else(|| {
            TableError::InvalidResponse("change-set part declares no boundary".into())
        })?;

    split_envelope(changeset_body, &changeset_boundary)
        .into_iter()
        .map(|part| {
            let (_, raw_response) = split_part(part)?;
            parse_http_response(raw_response)
        })
        .collect()
}

/// Extract the `boundary=` parameter from a `Content-Type` style value.
fn boundary_parameter(value: &str) -> Option<String> {
    let start = value.find("boundary=")? + "boundary=".len();
    let raw = value[start..].split(';').next().unwrap_or("").trim();
    if raw.is_empty() {
        return None;
    }
    Some(raw.trim_matches('"').to_string())
}

/// Split an envelope body into its parts, in order. The preamble before the
/// first delimiter and everything after the closing delimiter are dropped.
fn split_envelope<'a>(body: &'a str, boundary: &str) -> Vec<&'a str> {
    let delimiter = format!("--{boundary}");
    let mut parts = Vec::new();
    let mut segments = body.split(delimiter.as_str());
    let _preamble = segments.next();
    for segment in segments {
        if segment.starts_with("--") {
            break; // closing delimiter
        }
        let part = segment.strip_prefix("\r\n").unwrap_or(segment);
        let part = part.strip_suffix("\r\n").unwrap_or(part);
        parts.push(part);
    }
    parts
}

/// Split one part into its header lines and body.
fn split_part(part: &str) -> TableResult<(Vec<&str>, &str)> {
    let (head, body) = part.split_once("\r\n\r\n").ok_or_else(|| {
        TableError::InvalidResponse("multipart part is missing its header block".into())
    })?;
    Ok((head.lines().collect(), body))
}

/// Parse one serialized HTTP response: status line, headers, body.
fn parse_http_response(raw: &str) -> TableResult<SubResponse> {
    let (status_line, rest) = raw.split_once("\r\n").unwrap_or((raw, ""));

    let mut pieces = status_line.splitn(3, ' ');
    let version = pieces.next().unwrap_or("");
    if !version.starts_with("HTTP/") {
        return Err(TableError::InvalidResponse(format!(
            "malformed sub-response status line: {status_line}"
        )));
    }
    let status = pieces
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| {
            TableError::InvalidResponse(format!(
                "malformed sub-response status line: {status_line}"
            ))
        })?;

    let (header_block, body) = rest.split_once("\r\n\r\n").unwrap_or((rest, ""));
    let headers = header_block
        .lines()
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            line.split_once(':')
                .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        })
        .collect();

    Ok(SubResponse {
        status,
        headers,
        body: body.to_string(),
    })
}
