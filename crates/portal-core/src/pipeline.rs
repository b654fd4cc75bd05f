//! Pipeline composer: the single entry point for issuing queries.
//!
//! Stage order for one logical request:
//!
//! ```text
//! build request -> fingerprint URL -> auth.prepare
//!   -> transport.send -> auth.on_success -> Ok(response)
//!                     -> auth.on_failure -> backoff.decide
//!                          -> wait (or retry_now) -> next attempt
//!                          -> Err(..)
//! ```
//!
//! Attempts of one request run strictly in sequence. Distinct `execute`
//! calls share nothing but the session store and the retry handle.

use portal_types::PortalConfig;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::auth::{interceptor_for, AuthInterceptor};
use crate::backoff::{BackoffPolicy, RetryDecision, RetryHandle, RetryState};
use crate::error::PipelineError;
use crate::fingerprint;
use crate::request::{Request, Response};
use crate::session::SessionStore;
use crate::telemetry;
use crate::transport::{ReqwestTransport, Transport};

/// Builder for [`Pipeline`].
pub struct PipelineBuilder {
    config: PortalConfig,
    transport: Option<Arc<dyn Transport>>,
    session: Option<Arc<SessionStore>>,
    retry: Option<RetryHandle>,
}

impl PipelineBuilder {
    pub fn new(config: PortalConfig) -> Self {
        Self { config, transport: None, session: None, retry: None }
    }

    /// Use a custom transport instead of the default `reqwest` one.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Share an existing session store.
    pub fn with_session(mut self, session: Arc<SessionStore>) -> Self {
        self.session = Some(session);
        self
    }

    /// Share an existing retry handle.
    pub fn with_retry_handle(mut self, retry: RetryHandle) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn build(self) -> Result<Pipeline, PipelineError> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::from_config(&self.config)?),
        };
        let session = self.session.unwrap_or_default();
        let auth = interceptor_for(self.config.mode, Arc::clone(&session), &self.config.auth);

        info!(
            "Pipeline ready: endpoint={} mode={} max_attempts={}",
            self.config.endpoint(),
            self.config.mode,
            self.config.retry.max_attempts
        );

        Ok(Pipeline {
            endpoint: self.config.endpoint(),
            transport,
            policy: BackoffPolicy::from_config(&self.config.retry),
            auth,
            session,
            retry: self.retry.unwrap_or_default(),
        })
    }
}

/// Request execution pipeline.
pub struct Pipeline {
    endpoint: String,
    transport: Arc<dyn Transport>,
    policy: BackoffPolicy,
    auth: Arc<dyn AuthInterceptor>,
    session: Arc<SessionStore>,
    retry: RetryHandle,
}

impl Pipeline {
    pub fn builder(config: PortalConfig) -> PipelineBuilder {
        PipelineBuilder::new(config)
    }

    /// Pipeline with the default transport and a fresh session store.
    pub fn from_config(config: PortalConfig) -> Result<Self, PipelineError> {
        PipelineBuilder::new(config).build()
    }

    /// Session store written by the auth interceptor.
    pub fn session(&self) -> Arc<SessionStore> {
        Arc::clone(&self.session)
    }

    /// Handle for resuming a scheduled retry without waiting out its delay.
    pub fn retry_handle(&self) -> RetryHandle {
        self.retry.clone()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Execute one logical request.
    pub async fn execute(
        &self,
        query: &str,
        variables: &Value,
    ) -> Result<Response, PipelineError> {
        self.run(query, variables, None).await
    }

    /// Execute with an explicit cache partition instead of the computed
    /// fingerprint. A blank `hash` falls back to the computed one.
    pub async fn execute_with_hash(
        &self,
        query: &str,
        variables: &Value,
        hash: &str,
    ) -> Result<Response, PipelineError> {
        self.run(query, variables, Some(hash).filter(|h| !h.trim().is_empty())).await
    }

    async fn run(
        &self,
        query: &str,
        variables: &Value,
        hash_override: Option<&str>,
    ) -> Result<Response, PipelineError> {
        let trace_id = new_trace_id();

        let mut request = match Request::for_query(&self.endpoint, query, variables) {
            Ok(request) => request,
            Err(e) => {
                telemetry::record_request(e.kind());
                return Err(e);
            },
        };
        let (url, hash) = match hash_override {
            Some(hash) => (fingerprint::with_hash(&request.url, hash), hash.to_string()),
            None => fingerprint::annotate_url(&request.url, query, variables),
        };
        request.url = url;
        if let Err(e) = self.auth.prepare(&mut request) {
            telemetry::record_request(e.kind());
            return Err(e);
        }

        let mut state = RetryState::default();
        loop {
            debug!(
                "[{}] Sending query hash={} attempt={}/{}",
                trace_id,
                hash,
                state.attempt + 1,
                self.policy.max_attempts()
            );

            let failure = match self.transport.send(&request).await {
                Ok(response) if response.is_success() => {
                    self.auth.on_success(&response);
                    telemetry::record_request("success");
                    if state.attempt > 0 {
                        info!("[{}] Query succeeded after {} retries", trace_id, state.attempt);
                    }
                    return Ok(response);
                },
                Ok(response) => {
                    PipelineError::Status { status: response.status, body: response.body_text() }
                },
                Err(e) => PipelineError::Transport(e),
            };
            let failure = self.auth.on_failure(failure);

            match self.policy.decide(&failure, state.attempt) {
                RetryDecision::RetryAfter(delay) => {
                    state.next_delay_ms = delay.as_millis() as u64;
                    warn!(
                        "[{}] Attempt {}/{} failed ({}), retrying in {}ms",
                        trace_id,
                        state.attempt + 1,
                        self.policy.max_attempts(),
                        failure,
                        state.next_delay_ms
                    );
                    telemetry::record_retry(failure.kind());
                    if self.retry.wait(delay).await {
                        info!("[{}] Retry resumed manually", trace_id);
                    }
                    state.attempt += 1;
                },
                RetryDecision::Exhausted => {
                    let attempts = state.attempt + 1;
                    error!("[{}] Giving up after {} attempts: {}", trace_id, attempts, failure);
                    telemetry::record_request("exhausted");
                    return Err(PipelineError::Exhausted { attempts, last: Box::new(failure) });
                },
                RetryDecision::DoNotRetry => {
                    debug!("[{}] Non-retryable failure: {}", trace_id, failure);
                    telemetry::record_request(failure.kind());
                    return Err(failure);
                },
            }
        }
    }

    /// Execute and decode the response body as JSON.
    pub async fn execute_json(
        &self,
        query: &str,
        variables: &Value,
    ) -> Result<Value, PipelineError> {
        self.execute(query, variables).await?.json()
    }
}

fn new_trace_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    id[..8].to_string()
}
