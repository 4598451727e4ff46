use thiserror::Error;

/// Errors shared by the Azure data-plane clients.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The HTTP request failed at the transport level.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The endpoint URL is invalid.
    #[error("Invalid endpoint URL: {0}")]
    InvalidEndpoint(String),

    /// A required configuration value is missing.
    #[error("Missing configuration: {0}")]
    MissingConfig(String),
}

/// Result type alias for core operations.
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Maximum length for server-supplied text carried into error messages.
const MAX_MESSAGE_LEN: usize = 1000;

/// Redact SAS signatures and truncate long server bodies before they are
/// carried into an error message.
///
/// A storage error body can echo the request URL back, including the
/// `sig=` query value of a SAS token.
pub fn sanitize(message: &str) -> String {
    let mut result = message.to_string();

    let mut search_start = 0;
    while search_start < result.len() {
        let Some(relative_pos) = result[search_start..].find("sig=") else {
            break;
        };
        let value_start = search_start + relative_pos + 4; // "sig=" is 4 chars

        // Skip if already redacted
        if result[value_start..].starts_with("[REDACTED]") {
            search_start = value_start + 10;
            continue;
        }

        // The signature value runs to the next delimiter or end of string
        let value_end = result[value_start..]
            .find(|c: char| c.is_whitespace() || c == '&' || c == '"' || c == '\'')
            .map(|pos| value_start + pos)
            .unwrap_or(result.len());

        if value_end > value_start {
            result.replace_range(value_start..value_end, "[REDACTED]");
            search_start = value_start + 10; // "[REDACTED]" is 10 chars
        } else {
            search_start = value_start;
        }
    }

    if result.len() > MAX_MESSAGE_LEN {
        format!("{}... (truncated)", &result[..MAX_MESSAGE_LEN])
    } else {
        result
    }
}
