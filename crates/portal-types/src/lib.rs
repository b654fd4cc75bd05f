//! # Portal Types
//!
//! Foundation types for the portal query pipeline.
//!
//! - **`error`** - Typed configuration errors
//! - **`models`** - Configuration models and session/access-claim state
//!
//! ## Architecture Role
//!
//! ```text
//!        portal-types (this crate)
//!               │
//!               ▼
//!          portal-core
//!               │
//!               ▼
//!          portal-cli
//! ```
//!
//! The session models are plain values: the store in `portal-core` swaps
//! whole snapshots, so readers never observe a half-written session.

pub mod error;
pub mod models;

pub use error::ConfigError;
pub use models::{
    AccessClaims, AccessVerdict, AuthConfig, PortalConfig, PortalMode, RetryConfig, SessionPhase,
    SessionSnapshot, User,
};
