//! Domain models shared by the pipeline and its callers.

mod config;
mod session;

pub use config::{AuthConfig, PortalConfig, PortalMode, RetryConfig};
pub use session::{
    AccessClaims, AccessVerdict, SessionPhase, SessionSnapshot, User, SESSION_TIMEOUT_MESSAGE,
};
