//! JSON fetch client with dependency tagging.

use crate::dependency::DependencyTag;
use crate::retry::RetryPolicy;
use crate::timeout::TimeoutConfig;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, warn};
use zenpii_commerce::ApiError;

/// Error type for fetch operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {status} for {url}")]
    Http { status: u16, url: String },

    /// Non-success status with an `{"error": ...}` body.
    #[error("Rejected with {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Request error: {0}")]
    Request(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout(e.to_string())
        } else if e.is_connect() {
            FetchError::Connection(e.to_string())
        } else if e.is_decode() {
            FetchError::Deserialization(e.to_string())
        } else {
            FetchError::Request(e.to_string())
        }
    }
}

impl From<FetchError> for ApiError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Http { status, url } => ApiError::Http { status, url },
            FetchError::Rejected { message, .. } => ApiError::Server(message),
            FetchError::Timeout(m) => ApiError::Timeout(m),
            FetchError::Connection(m) | FetchError::Request(m) => ApiError::Connection(m),
            FetchError::Deserialization(m) => ApiError::Decode(m),
        }
    }
}

/// Fetch policy combining timeout and retry configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPolicy {
    pub timeout: TimeoutConfig,
    pub retry: RetryPolicy,
}

impl FetchPolicy {
    pub fn new(timeout: TimeoutConfig, retry: RetryPolicy) -> Self {
        Self { timeout, retry }
    }

    /// Create from a dependency tag's defaults.
    pub fn from_tag(tag: DependencyTag) -> Self {
        Self {
            timeout: TimeoutConfig::from_total(tag.default_timeout()),
            retry: RetryPolicy::new(tag.default_max_retries()),
        }
    }
}

/// Outbound JSON client.
///
/// Applies the dependency's timeout and retry policy and logs timing for
/// every request.
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: reqwest::Client,
    overrides: HashMap<DependencyTag, FetchPolicy>,
}

impl FetchClient {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(TimeoutConfig::default())
    }

    /// Build with a connect timeout shared by every dependency.
    pub fn with_timeout(timeout: TimeoutConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .connect_timeout(timeout.connect)
            .user_agent(concat!("zenpii/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            overrides: HashMap::new(),
        })
    }

    /// Replace the policy for one dependency.
    pub fn with_policy(mut self, tag: DependencyTag, policy: FetchPolicy) -> Self {
        self.overrides.insert(tag, policy);
        self
    }

    pub fn policy_for(&self, tag: DependencyTag) -> FetchPolicy {
        self.overrides
            .get(&tag)
            .cloned()
            .unwrap_or_else(|| FetchPolicy::from_tag(tag))
    }

    /// GET and decode JSON.
    pub async fn get<T: DeserializeOwned>(&self, url: &str, tag: DependencyTag) -> Result<T, FetchError> {
        self.execute(url, tag, |http| http.get(url)).await
    }

    /// Send a request built by `build`, retrying per the dependency's policy.
    ///
    /// `build` is called once per attempt.
    pub async fn execute<T, F>(&self, url: &str, tag: DependencyTag, build: F) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let policy = self.policy_for(tag);
        let mut attempt = 0;
        loop {
            let started = Instant::now();
            let result = self.send_once(url, &policy, &build).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok(value) => {
                    debug!(dependency = %tag, url, elapsed_ms, attempt, "fetch ok");
                    return Ok(value);
                }
                Err(e) if policy.retry.should_retry(&e, attempt) => {
                    let delay = policy.retry.backoff.delay_for_attempt(attempt);
                    warn!(dependency = %tag, url, elapsed_ms, attempt, error = %e, ?delay, "fetch failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(dependency = %tag, url, elapsed_ms, attempt, error = %e, "fetch failed");
                    return Err(e);
                }
            }
        }
    }

    async fn send_once<T, F>(&self, url: &str, policy: &FetchPolicy, build: &F) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let resp = build(&self.http).timeout(policy.timeout.total).send().await?;
        let status = resp.status().as_u16();
        let bytes = resp.bytes().await?;

        if status >= 400 {
            return Err(match error_message(&bytes) {
                Some(message) => FetchError::Rejected { status, message },
                None => FetchError::Http {
                    status,
                    url: url.to_string(),
                },
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| FetchError::Deserialization(e.to_string()))
    }
}

fn error_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value.get("error")?.as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_extraction() {
        assert_eq!(
            error_message(br#"{"error":"Cart not found"}"#).as_deref(),
            Some("Cart not found")
        );
        assert_eq!(error_message(b"<html>"), None);
    }

    #[test]
    fn test_fetch_error_maps_to_api_error() {
        assert_eq!(
            ApiError::from(FetchError::Rejected {
                status: 400,
                message: "bad".into()
            }),
            ApiError::Server("bad".into())
        );
        assert!(ApiError::from(FetchError::Timeout("t".into())).outcome_unknown());
    }

    #[test]
    fn test_policy_override() {
        let client = FetchClient::new()
            .unwrap()
            .with_policy(DependencyTag::ExchangeRate, FetchPolicy::new(TimeoutConfig::default(), RetryPolicy::none()));
        assert_eq!(client.policy_for(DependencyTag::ExchangeRate).retry.max_attempts, 0);
        assert_eq!(client.policy_for(DependencyTag::Orders).retry.max_attempts, 0);
        assert_eq!(FetchPolicy::from_tag(DependencyTag::ExchangeRate).retry.max_attempts, 1);
    }
}
