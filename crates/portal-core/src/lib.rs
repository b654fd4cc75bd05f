//! # Portal Core
//!
//! Request execution pipeline for the portal search API.
//!
//! Every query issued by the application goes through [`Pipeline::execute`],
//! which runs a fixed chain of stages:
//!
//! - **`fingerprint`** - stable `hash=` URL parameter derived from query + variables
//! - **`auth`** - credential attachment, access-claim capture, forced logout on 403
//! - **`backoff`** - exponential retry over transient statuses, with a manual
//!   "retry now" handle
//! - **`transport`** - one HTTP attempt via `reqwest`
//!
//! The composer owns the [`SessionStore`] and [`RetryHandle`]; callers get
//! them through [`Pipeline::session`] and [`Pipeline::retry_handle`] instead
//! of process globals.

#![allow(
    clippy::significant_drop_tightening,
    reason = "lock guards are released explicitly before notifying watchers"
)]
#![cfg_attr(test, allow(clippy::panic, clippy::expect_used, clippy::unwrap_used))]

pub mod auth;
pub mod backoff;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod logger;
pub mod pipeline;
pub mod request;
pub mod session;
pub mod telemetry;
pub mod transport;

pub use auth::{interceptor_for, AuthInterceptor, OpenInterceptor, SessionInterceptor};
pub use backoff::{BackoffPolicy, RetryDecision, RetryHandle, RetryState};
pub use error::{PipelineError, TransportError};
pub use fingerprint::{annotate_url, fingerprint, with_hash};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use request::{CredentialsMode, QueryEnvelope, Request, Response};
pub use session::SessionStore;
pub use transport::{ReqwestTransport, Transport};
