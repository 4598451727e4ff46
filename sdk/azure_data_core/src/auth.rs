use crate::error::{ServiceError, ServiceResult};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

/// Credential types supported by the Azure data-plane clients.
///
/// The pipeline only needs something that can authorize an outgoing
/// request: either a SAS token merged into the request query string, or a
/// bearer token attached as an `Authorization` header.
#[derive(Clone)]
pub enum StorageCredential {
    /// Shared Access Signature token, attached to the request query string.
    Sas(SecretString),

    /// OAuth bearer token, attached as an `Authorization` header.
    BearerToken(SecretString),
}

impl StorageCredential {
    /// Create a credential from the environment.
    ///
    /// Checks `AZURE_STORAGE_SAS_TOKEN` first, then
    /// `AZURE_STORAGE_BEARER_TOKEN`.
    pub fn from_env() -> ServiceResult<Self> {
        if let Ok(token) = std::env::var("AZURE_STORAGE_SAS_TOKEN") {
            if !token.is_empty() {
                return Ok(Self::Sas(SecretString::from(token)));
            }
        }
        match std::env::var("AZURE_STORAGE_BEARER_TOKEN") {
            Ok(token) if !token.is_empty() => Ok(Self::BearerToken(SecretString::from(token))),
            _ => Err(ServiceError::MissingConfig(
                "no credential found. Set AZURE_STORAGE_SAS_TOKEN or AZURE_STORAGE_BEARER_TOKEN."
                    .into(),
            )),
        }
    }

    /// Create a SAS token credential. A leading `?` is accepted and ignored.
    pub fn sas_token(token: impl Into<String>) -> Self {
        Self::Sas(SecretString::from(token.into()))
    }

    /// Create a bearer token credential.
    pub fn bearer_token(token: impl Into<String>) -> Self {
        Self::BearerToken(SecretString::from(token.into()))
    }

    /// Authorize an outgoing request.
    ///
    /// A SAS token is merged into the URL query string; a bearer token is
    /// returned as the `Authorization` header value to attach.
    pub async fn authorize(&self, url: &mut Url) -> ServiceResult<Option<String>> {
        match self {
            Self::Sas(token) => {
                let raw = token.expose_secret().trim_start_matches('?');
                match url.query() {
                    Some(existing) if !existing.is_empty() => {
                        let merged = format!("{existing}&{raw}");
                        url.set_query(Some(&merged));
                    }
                    _ => url.set_query(Some(raw)),
                }
                Ok(None)
            }
            Self::BearerToken(token) => Ok(Some(format!("Bearer {}", token.expose_secret()))),
        }
    }
}

impl std::fmt::Debug for StorageCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sas(_) => write!(f, "StorageCredential::Sas(****)"),
            Self::BearerToken(_) => write!(f, "StorageCredential::BearerToken(****)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[tokio::test]
    async fn sas_token_attaches_to_query() {
        let credential = StorageCredential::sas_token("sv=2019-02-02&sig=abc");
        let mut url = Url::parse("https://acct.table.core.windows.net/$batch").unwrap();

        let header = credential.authorize(&mut url).await.unwrap();

        assert!(header.is_none());
        assert_eq!(url.query(), Some("sv=2019-02-02&sig=abc"));
    }

    #[tokio::test]
    async fn sas_token_leading_question_mark_is_stripped() {
        let credential = StorageCredential::sas_token("?sv=2019-02-02&sig=abc");
        let mut url = Url::parse("https://acct.table.core.windows.net/$batch").unwrap();

        credential.authorize(&mut url).await.unwrap();

        assert_eq!(url.query(), Some("sv=2019-02-02&sig=abc"));
    }

    #[tokio::test]
    async fn sas_token_merges_with_existing_query() {
        let credential = StorageCredential::sas_token("sig=abc");
        let mut url = Url::parse("https://acct.table.core.windows.net/$batch?timeout=30").unwrap();

        credential.authorize(&mut url).await.unwrap();

        assert_eq!(url.query(), Some("timeout=30&sig=abc"));
    }

    #[tokio::test]
    async fn bearer_token_resolves_to_header() {
        let credential = StorageCredential::bearer_token("token123");
        let mut url = Url::parse("https://acct.table.core.windows.net/$batch").unwrap();

        let header = credential.authorize(&mut url).await.unwrap();

        assert_eq!(header.as_deref(), Some("Bearer token123"));
        assert!(url.query().is_none());
    }

    #[test]
    fn debug_does_not_expose_secrets() {
        let credential = StorageCredential::sas_token("sig=verysecret");
        let formatted = format!("{credential:?}");

        assert!(!formatted.contains("verysecret"));
        assert!(formatted.contains("****"));
    }

    #[test]
    #[serial]
    fn from_env_prefers_sas_token() {
        std::env::set_var("AZURE_STORAGE_SAS_TOKEN", "sig=envtoken");
        std::env::remove_var("AZURE_STORAGE_BEARER_TOKEN");

        let credential = StorageCredential::from_env().expect("should resolve");
        assert!(matches!(credential, StorageCredential::Sas(_)));

        std::env::remove_var("AZURE_STORAGE_SAS_TOKEN");
    }

    #[test]
    #[serial]
    fn from_env_without_credentials_fails() {
        std::env::remove_var("AZURE_STORAGE_SAS_TOKEN");
        std::env::remove_var("AZURE_STORAGE_BEARER_TOKEN");

        let result = StorageCredential::from_env();
        assert!(matches!(result, Err(ServiceError::MissingConfig(_))));
    }
}
