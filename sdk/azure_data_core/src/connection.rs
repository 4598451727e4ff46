//! Storage connection-string parsing.
//!
//! A connection string is a `;`-separated list of `Key=Value` segments, as
//! handed out by the Azure portal. The keys understood here are
//! `TableEndpoint`, `AccountName`, `EndpointSuffix`,
//! `DefaultEndpointsProtocol`, and `SharedAccessSignature`. Strings that
//! carry only an `AccountKey` are rejected: shared-key signing is not
//! supported, and without a SAS there is nothing to authorize with.

use crate::auth::StorageCredential;
use crate::error::{ServiceError, ServiceResult};
use url::Url;

const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

/// Parse a storage connection string into a table endpoint and credential.
pub fn parse_connection_string(conn: &str) -> ServiceResult<(Url, StorageCredential)> {
    let mut account_name = None;
    let mut endpoint = None;
    let mut suffix = None;
    let mut protocol = None;
    let mut sas = None;
    let mut has_account_key = false;

    for segment in conn.split(';') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let (key, value) = segment.split_once('=').ok_or_else(|| {
            ServiceError::MissingConfig(format!("malformed connection string segment: {segment}"))
        })?;
        match key.to_ascii_lowercase().as_str() {
            "accountname" => account_name = Some(value.to_string()),
            "accountkey" => has_account_key = true,
            "tableendpoint" => endpoint = Some(value.to_string()),
            "endpointsuffix" => suffix = Some(value.to_string()),
            "defaultendpointsprotocol" => protocol = Some(value.to_string()),
            "sharedaccesssignature" => sas = Some(value.to_string()),
            _ => {}
        }
    }

    let credential = match sas {
        Some(token) => StorageCredential::sas_token(token),
        None if has_account_key => {
            return Err(ServiceError::MissingConfig(
                "connection string carries only an AccountKey; shared-key authentication is \
                 not supported, provide a SharedAccessSignature instead"
                    .into(),
            ))
        }
        None => {
            return Err(ServiceError::MissingConfig(
                "connection string has no SharedAccessSignature".into(),
            ))
        }
    };

    let endpoint = match endpoint {
        Some(endpoint) => endpoint,
        None => {
            let account = account_name.ok_or_else(|| {
                ServiceError::MissingConfig(
                    "connection string needs an AccountName or TableEndpoint".into(),
                )
            })?;
            let scheme = protocol.unwrap_or_else(|| "https".to_string());
            let suffix = suffix.unwrap_or_else(|| DEFAULT_ENDPOINT_SUFFIX.to_string());
            format!("{scheme}://{account}.table.{suffix}")
        }
    };

    let endpoint = Url::parse(&endpoint)
        .map_err(|e| ServiceError::InvalidEndpoint(format!("{endpoint}: {e}")))?;

    Ok((endpoint, credential))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_endpoint_from_account_name() {
        let (endpoint, _) = parse_connection_string(
            "AccountName=myacct;SharedAccessSignature=sv=2019-02-02&sig=abc",
        )
        .expect("should parse");

        assert_eq!(endpoint.as_str(), "https://myacct.table.core.windows.net/");
    }

    #[test]
    fn honors_protocol_and_suffix() {
        let (endpoint, _) = parse_connection_string(
            "DefaultEndpointsProtocol=http;AccountName=myacct;EndpointSuffix=core.chinacloudapi.cn;SharedAccessSignature=sig=abc",
        )
        .expect("should parse");

        assert_eq!(endpoint.as_str(), "http://myacct.table.core.chinacloudapi.cn/");
    }

    #[test]
    fn explicit_table_endpoint_wins() {
        let (endpoint, _) = parse_connection_string(
            "AccountName=myacct;TableEndpoint=https://custom.example.com;SharedAccessSignature=sig=abc",
        )
        .expect("should parse");

        assert_eq!(endpoint.as_str(), "https://custom.example.com/");
    }

    #[test]
    fn sas_value_keeps_embedded_equals_signs() {
        let (_, credential) = parse_connection_string(
            "AccountName=myacct;SharedAccessSignature=sv=2019-02-02&se=2026-01-01&sig=a%3Db",
        )
        .expect("should parse");

        assert!(matches!(credential, StorageCredential::Sas(_)));
    }

    #[test]
    fn account_key_only_is_rejected() {
        let result =
            parse_connection_string("AccountName=myacct;AccountKey=c2VjcmV0a2V5dmFsdWU=");

        let err = result.expect_err("should reject");
        assert!(matches!(err, ServiceError::MissingConfig(_)));
        assert!(err.to_string().contains("shared-key"));
    }

    #[test]
    fn missing_account_and_endpoint_is_rejected() {
        let result = parse_connection_string("SharedAccessSignature=sig=abc");
        assert!(matches!(result, Err(ServiceError::MissingConfig(_))));
    }

    #[test]
    fn malformed_segment_is_rejected() {
        let result = parse_connection_string("AccountName");
        assert!(matches!(result, Err(ServiceError::MissingConfig(_))));
    }
}
