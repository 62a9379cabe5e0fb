use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_CATALOG_ENDPOINT: &str = "https://healdata.org/mds/metadata?data=True&limit=1000000";
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 300_000;

pub trait CatalogSource {
    fn describe(&self) -> String;
    fn fetch(&self) -> Result<Value, FetchError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEndpoint {
    pub url: String,
    pub timeout_ms: u64,
}

impl CatalogEndpoint {
    pub fn new(url: impl Into<String>) -> Result<Self, FetchError> {
        let endpoint = Self {
            url: url.into(),
            timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
        };
        endpoint.validate()?;
        Ok(endpoint)
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Result<Self, FetchError> {
        self.timeout_ms = timeout_ms;
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), FetchError> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(FetchError::InvalidEndpoint(self.url.clone()));
        }
        if self.timeout_ms == 0 {
            return Err(FetchError::InvalidTimeout(self.timeout_ms));
        }
        Ok(())
    }
}

pub struct HttpCatalogSource {
    endpoint: CatalogEndpoint,
    client: reqwest::blocking::Client,
}

impl HttpCatalogSource {
    pub fn new(endpoint: CatalogEndpoint) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(endpoint.timeout_ms))
            .build()
            .map_err(|error| FetchError::Client(error.to_string()))?;
        Ok(Self { endpoint, client })
    }

    pub fn with_client(endpoint: CatalogEndpoint, client: reqwest::blocking::Client) -> Self {
        Self { endpoint, client }
    }

    pub fn endpoint(&self) -> &CatalogEndpoint {
        &self.endpoint
    }
}

impl CatalogSource for HttpCatalogSource {
    fn describe(&self) -> String {
        self.endpoint.url.clone()
    }

    fn fetch(&self) -> Result<Value, FetchError> {
        let url = self.endpoint.url.as_str();
        let response = self.client.get(url).send().map_err(|error| FetchError::Transport {
            url: url.to_string(),
            reason: error.to_string(),
        })?;
        let status = response.status();
        debug!(url, status = status.as_u16(), "catalog response received");
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.json::<Value>().map_err(|error| FetchError::Decode {
            url: url.to_string(),
            reason: error.to_string(),
        })
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("invalid catalog endpoint, expected http(s) url: {0}")]
    InvalidEndpoint(String),
    #[error("invalid fetch timeout_ms, expected > 0: {0}")]
    InvalidTimeout(u64),
    #[error("build http client failed: {0}")]
    Client(String),
    #[error("fetch `{url}` failed: {reason}")]
    Transport { url: String, reason: String },
    #[error("fetch `{url}` returned status {status}")]
    Status { url: String, status: u16 },
    #[error("decode catalog from `{url}` failed: {reason}")]
    Decode { url: String, reason: String },
}

#[cfg(test)]
#[path = "source_test.rs"]
mod tests;
