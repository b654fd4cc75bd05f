//! Pipeline configuration models.

mod auth;
mod enums;
mod portal;
mod retry;

pub use auth::AuthConfig;
pub use enums::PortalMode;
pub use portal::PortalConfig;
pub use retry::RetryConfig;
