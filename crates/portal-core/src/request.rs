//! Request and response values passed between pipeline stages.

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::PipelineError;

/// Whether session credentials travel with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CredentialsMode {
    #[default]
    Omit,
    Include,
}

/// JSON body sent to the query endpoint.
#[derive(Debug, Serialize)]
pub struct QueryEnvelope<'a> {
    pub query: &'a str,
    pub variables: &'a Value,
}

/// A fully prepared outgoing request.
///
/// Each logical request owns its own instance; stages mutate it in place
/// before the first attempt and it is reused unchanged across retries.
#[derive(Debug, Clone)]
pub struct Request {
    pub url: String,
    pub body: Bytes,
    pub headers: HashMap<String, String>,
    pub credentials: CredentialsMode,
}

impl Request {
    /// Build a POST request carrying `query` and `variables` as a JSON envelope.
    pub fn for_query(
        endpoint: &str,
        query: &str,
        variables: &Value,
    ) -> Result<Self, PipelineError> {
        if query.trim().is_empty() {
            return Err(PipelineError::EmptyQuery);
        }
        let body = serde_json::to_vec(&QueryEnvelope { query, variables })?;

        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());

        Ok(Self {
            url: endpoint.to_string(),
            body: Bytes::from(body),
            headers,
            credentials: CredentialsMode::Omit,
        })
    }
}

/// Normalized transport response.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status, body: body.into() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON.
    pub fn json(&self) -> Result<Value, PipelineError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Body as lossy UTF-8, truncated for error reports.
    pub fn body_text(&self) -> String {
        const MAX_LEN: usize = 4096;
        let mut body = String::from_utf8_lossy(&self.body).to_string();
        if body.len() > MAX_LEN {
            let mut cut = MAX_LEN;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
            body.push('…');
        }
        body
    }
}
