//! Auth interceptor variants, selected once from [`PortalMode`].
//!
//! - [`OpenInterceptor`]: public deployments, requests pass through untouched.
//! - [`SessionInterceptor`]: authenticated deployments. Sends credentials,
//!   records access claims from successful responses and turns a 403 for an
//!   established session into a forced logout.

use bytes::Bytes;
use portal_types::{AccessClaims, AuthConfig, PortalMode};
use serde_json::Value;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::request::{CredentialsMode, Request, Response};
use crate::session::SessionStore;
use crate::telemetry;

const FORBIDDEN: u16 = 403;

/// Hooks run around every logical request.
pub trait AuthInterceptor: Send + Sync + Debug {
    /// Adjust the request before the first attempt.
    fn prepare(&self, request: &mut Request) -> Result<(), PipelineError>;

    /// Observe a successful response.
    fn on_success(&self, response: &Response);

    /// Observe a failed attempt. The returned error continues to the
    /// backoff policy; it is the input unchanged unless this hook handled it.
    fn on_failure(&self, error: PipelineError) -> PipelineError;
}

/// Build the interceptor for a deployment mode.
pub fn interceptor_for(
    mode: PortalMode,
    session: Arc<SessionStore>,
    auth: &AuthConfig,
) -> Arc<dyn AuthInterceptor> {
    match mode {
        PortalMode::Open => Arc::new(OpenInterceptor),
        PortalMode::Authenticated => Arc::new(SessionInterceptor::new(session, auth.clone())),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OpenInterceptor;

impl AuthInterceptor for OpenInterceptor {
    fn prepare(&self, _request: &mut Request) -> Result<(), PipelineError> {
        Ok(())
    }

    fn on_success(&self, _response: &Response) {}

    fn on_failure(&self, error: PipelineError) -> PipelineError {
        error
    }
}

#[derive(Debug)]
pub struct SessionInterceptor {
    session: Arc<SessionStore>,
    auth: AuthConfig,
}

impl SessionInterceptor {
    pub fn new(session: Arc<SessionStore>, auth: AuthConfig) -> Self {
        Self { session, auth }
    }
}

impl AuthInterceptor for SessionInterceptor {
    fn prepare(&self, request: &mut Request) -> Result<(), PipelineError> {
        request.credentials = CredentialsMode::Include;

        let parsed: Value = serde_json::from_slice(&request.body)
            .map_err(|e| PipelineError::InvalidBody(e.to_string()))?;
        request.body = Bytes::from(serde_json::to_vec(&parsed)?);

        if let Some(token) = self.auth.token.as_deref().filter(|t| !t.is_empty()) {
            request.headers.insert(self.auth.token_header.clone(), token.to_string());
        }
        Ok(())
    }

    fn on_success(&self, response: &Response) {
        let payload = match response.json() {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Authenticated response is not JSON, access claims unchanged: {}", e);
                return;
            },
        };

        match AccessClaims::from_payload(&payload) {
            Some(claims) => {
                if self.session.set_claims(claims) {
                    debug!("Access claims updated");
                }
            },
            None => warn!("Authenticated response carries no access claims"),
        }
    }

    fn on_failure(&self, error: PipelineError) -> PipelineError {
        if error.status() != Some(FORBIDDEN) {
            return error;
        }
        // 403 before any user was established is an ordinary failure.
        if !self.session.has_user() {
            debug!("403 without an established session; passing through");
            return error;
        }

        warn!("Authorization revoked (403); forcing logout");
        self.session.force_logout();
        telemetry::record_forced_logout();
        PipelineError::SessionRevoked
    }
}
