//! Transport adapter: performs one HTTP attempt for a prepared request.

use async_trait::async_trait;
use portal_types::PortalConfig;
use reqwest::Client;
use std::time::Duration;

use crate::error::TransportError;
use crate::request::{CredentialsMode, Request, Response};

/// Sends a prepared request and returns the raw response.
///
/// Any HTTP status is an `Ok` response; `Err` is reserved for failures
/// where no response was obtained.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &Request) -> Result<Response, TransportError>;
}

/// `reqwest`-backed transport.
///
/// Credentialed requests go through a client with a cookie store so the
/// session cookie set at login is replayed; anonymous requests use a client
/// that never sends cookies.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    anonymous: Client,
    credentialed: Client,
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let anonymous = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        let credentialed = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(Self { anonymous, credentialed, timeout })
    }

    pub fn from_config(config: &PortalConfig) -> Result<Self, TransportError> {
        Self::new(Duration::from_millis(config.fetch_timeout_ms))
    }

    fn classify(&self, err: &reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout { timeout_ms: self.timeout.as_millis() as u64 }
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if err.is_body() || err.is_decode() {
            TransportError::Body(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &Request) -> Result<Response, TransportError> {
        let client = match request.credentials {
            CredentialsMode::Include => &self.credentialed,
            CredentialsMode::Omit => &self.anonymous,
        };

        let mut builder = client.post(&request.url).body(request.body.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let resp = builder.send().await.map_err(|e| self.classify(&e))?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await.map_err(|e| self.classify(&e))?;

        Ok(Response { status, body })
    }
}
