//! HTTP client shared by the Azure data-plane service crates.
//!
//! This module provides [`ServiceClient`], the transport every service crate
//! sends its requests through. The client handles endpoint management,
//! credential application, the `x-ms-version` protocol header, and retry of
//! transient failures.
//!
//! # Examples
//!
//! ```rust,no_run
//! use azure_data_core::auth::StorageCredential;
//! use azure_data_core::client::ServiceClient;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ServiceClient::builder()
//!     .endpoint("https://myaccount.table.core.windows.net")
//!     .credential(StorageCredential::sas_token("sv=2019-02-02&sig=..."))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use crate::auth::StorageCredential;
use crate::error::{ServiceError, ServiceResult};
use reqwest::Client as HttpClient;
use url::Url;

use std::time::Duration;

/// Default `x-ms-version` protocol version sent with every request.
pub const DEFAULT_API_VERSION: &str = "2019-02-02";

/// Default connection timeout (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default read/response timeout (60 seconds).
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Determines if an HTTP status code represents a retriable error.
///
/// Retriable errors are transient server-side issues that may succeed on retry:
/// - 429 Too Many Requests (rate limiting)
/// - 500 Internal Server Error
/// - 502 Bad Gateway
/// - 503 Service Unavailable
/// - 504 Gateway Timeout
#[inline]
pub fn is_retriable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Configuration for automatic retry behavior on transient errors.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (not counting the initial request).
    pub max_retries: u32,
    /// Initial backoff duration before the first retry.
    /// Subsequent retries use exponential backoff (2^attempt * initial_backoff).
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

/// The transport client used by the data-plane service crates.
///
/// The client is cheaply cloneable and can be shared across threads;
/// concurrent calls share no mutable state.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    pub(crate) http: HttpClient,
    pub(crate) endpoint: Url,
    pub(crate) credential: StorageCredential,
    pub(crate) api_version: String,
    pub(crate) retry_policy: RetryPolicy,
}

/// Builder for constructing a [`ServiceClient`].
///
/// Use [`ServiceClient::builder()`] to create a new builder.
#[derive(Debug, Default)]
pub struct ServiceClientBuilder {
    endpoint: Option<String>,
    credential: Option<StorageCredential>,
    api_version: Option<String>,
    http_client: Option<HttpClient>,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    retry_policy: Option<RetryPolicy>,
}

impl ServiceClient {
    /// Create a new builder for configuring a `ServiceClient`.
    pub fn builder() -> ServiceClientBuilder {
        ServiceClientBuilder::default()
    }

    /// Get the base endpoint URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Get the `x-ms-version` value being sent.
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Get the retry policy configuration.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Build a full URL for a service path.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be joined to the endpoint URL.
    pub fn url(&self, path: &str) -> ServiceResult<Url> {
        self.endpoint.join(path).map_err(|e| {
            ServiceError::InvalidEndpoint(format!("failed to construct URL for {path}: {e}"))
        })
    }

    /// Send a POST request whose body is produced by `make_body`, with
    /// automatic retry on transient errors (429, 500, 502, 503, 504).
    ///
    /// `make_body` returns the `(content type, body)` pair for one attempt
    /// and is invoked again for every retry, so bodies that must not be
    /// replayed byte-for-byte (multipart envelopes with per-call boundary
    /// tokens) are re-generated on each attempt.
    ///
    /// The response is returned without any status interpretation: callers
    /// own the mapping of status codes to outcomes, including which codes
    /// count as success.
    ///
    /// # Errors
    ///
    /// Returns an error if authorization or the transport fails. Non-2xx
    /// responses are NOT errors at this layer.
    pub async fn post_raw<F>(
        &self,
        path: &str,
        headers: &[(&str, &str)],
        make_body: F,
    ) -> ServiceResult<reqwest::Response>
    where
        F: Fn() -> (String, String),
    {
        let mut url = self.url(path)?;
        let auth_header = self.credential.authorize(&mut url).await?;

        for attempt in 0..=self.retry_policy.max_retries {
            let (content_type, body) = make_body();
            let mut request = self
                .http
                .post(url.clone())
                .header("x-ms-version", &self.api_version)
                .header("Content-Type", content_type)
                .body(body);
            for (name, value) in headers {
                request = request.header(*name, *value);
            }
            if let Some(value) = &auth_header {
                request = request.header("Authorization", value);
            }

            let response = request.send().await?;
            let status = response.status().as_u16();

            if !is_retriable_status(status) || attempt == self.retry_policy.max_retries {
                return Ok(response);
            }

            tracing::debug!(status, attempt, "transient failure, retrying");

            // Calculate backoff with jitter: base_backoff * jitter_factor
            // jitter_factor is in range [0.75, 1.25] for ±25% variation
            let base_backoff = self.retry_policy.initial_backoff * 2_u32.pow(attempt);
            let jitter = 0.75 + fastrand::f64() * 0.5; // 0.75 to 1.25
            let backoff = base_backoff.mul_f64(jitter);
            tokio::time::sleep(backoff).await;
        }

        // This should never be reached due to the loop logic
        unreachable!("retry loop should return before reaching here")
    }
}

impl ServiceClientBuilder {
    /// Set the service endpoint URL.
    ///
    /// For table storage this is
    /// `https://<account-name>.table.core.windows.net`.
    ///
    /// If not set, the builder will check the `AZURE_TABLES_ENDPOINT`
    /// environment variable.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the credential to use for authorization.
    ///
    /// If not set, the builder will use [`StorageCredential::from_env()`].
    pub fn credential(mut self, credential: StorageCredential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Set the `x-ms-version` protocol version.
    ///
    /// Defaults to [`DEFAULT_API_VERSION`] (`2019-02-02`).
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Set a custom HTTP client.
    ///
    /// **Note:** If you provide a custom HTTP client, any timeout
    /// configuration via [`connect_timeout`](Self::connect_timeout) or
    /// [`read_timeout`](Self::read_timeout) will be ignored.
    pub fn http_client(mut self, client: HttpClient) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the read timeout.
    ///
    /// This covers the entire request/response cycle including reading the
    /// body.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Set the retry policy for transient errors.
    ///
    /// Defaults to 3 retries with 500ms initial backoff.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Build the `ServiceClient`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No endpoint is provided and `AZURE_TABLES_ENDPOINT` is not set
    /// - The endpoint URL is invalid
    /// - No credential is provided and none can be resolved from the
    ///   environment
    pub fn build(self) -> ServiceResult<ServiceClient> {
        let http = self.http_client.unwrap_or_else(|| {
            let connect_timeout = self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT);
            let read_timeout = self.read_timeout.unwrap_or(DEFAULT_READ_TIMEOUT);

            reqwest::Client::builder()
                .connect_timeout(connect_timeout)
                .timeout(read_timeout)
                .build()
                .expect("failed to build HTTP client")
        });

        let endpoint_str = self
            .endpoint
            .or_else(|| std::env::var("AZURE_TABLES_ENDPOINT").ok())
            .ok_or_else(|| {
                ServiceError::MissingConfig(
                    "endpoint is required. Set it via builder or AZURE_TABLES_ENDPOINT env var."
                        .into(),
                )
            })?;

        let endpoint = Url::parse(&endpoint_str)
            .map_err(|e| ServiceError::InvalidEndpoint(format!("{endpoint_str}: {e}")))?;

        let credential = self
            .credential
            .map(Ok)
            .unwrap_or_else(StorageCredential::from_env)?;

        Ok(ServiceClient {
            http,
            endpoint,
            credential,
            api_version: self
                .api_version
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            retry_policy: self.retry_policy.unwrap_or_default(),
        })
    }
}
