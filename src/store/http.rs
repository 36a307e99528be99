//! HTTP object store: GET/PUT `{endpoint}/{bucket}/{key}` against an S3-compatible gateway.

use super::{parse_uri, ObjectStore};
use crate::error::StoreError;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::time::Duration;

pub struct HttpObjectStore {
    client: Client,
    endpoint: String,
}

fn map_http_error(uri: &str, error: reqwest::Error) -> StoreError {
    if error.is_timeout() {
        StoreError::RequestFailed(format!("{}: request timeout: {}", uri, error))
    } else if error.is_connect() {
        StoreError::RequestFailed(format!("{}: connection error: {}", uri, error))
    } else {
        StoreError::RequestFailed(format!("{}: {}", uri, error))
    }
}

impl HttpObjectStore {
    /// Without `timeout_secs` requests are unbounded.
    pub fn new(endpoint: String, timeout_secs: Option<u64>) -> Result<Self, StoreError> {
        let mut builder = Client::builder();
        builder = match timeout_secs {
            Some(secs) => builder.timeout(Duration::from_secs(secs)),
            None => builder.timeout(None::<Duration>),
        };
        let client = builder
            .build()
            .map_err(|e| StoreError::RequestFailed(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// HTTP URL of an object URI.
    pub fn url(&self, uri: &str) -> Result<String, StoreError> {
        let location = parse_uri(uri)?;
        Ok(format!("{}/{}/{}", self.endpoint, location.bucket, location.key))
    }
}

impl ObjectStore for HttpObjectStore {
    fn read(&self, uri: &str) -> Result<String, StoreError> {
        let response = self
            .client
            .get(self.url(uri)?)
            .send()
            .map_err(|e| map_http_error(uri, e))?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(uri.to_string())),
            status if status.is_success() => response.text().map_err(|e| map_http_error(uri, e)),
            status => Err(StoreError::RequestFailed(format!(
                "{}: GET returned {}",
                uri, status
            ))),
        }
    }

    fn write(&self, uri: &str, body: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .put(self.url(uri)?)
            .body(body.to_string())
            .send()
            .map_err(|e| map_http_error(uri, e))?;
        if !response.status().is_success() {
            return Err(StoreError::RequestFailed(format!(
                "{}: PUT returned {}",
                uri,
                response.status()
            )));
        }
        Ok(())
    }
}
