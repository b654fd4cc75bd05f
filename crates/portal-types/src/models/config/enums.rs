//! Configuration enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Deployment mode, chosen once at startup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PortalMode {
    /// Public portal: requests pass through without session handling
    #[default]
    Open,
    /// Authenticated portal: credentials attached, access claims tracked
    Authenticated,
}

impl fmt::Display for PortalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Open => write!(f, "open"),
            Self::Authenticated => write!(f, "authenticated"),
        }
    }
}

impl PortalMode {
    /// Parse from string. Unknown values return `None`.
    pub fn from_string(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Some(Self::Open),
            "authenticated" | "auth" => Some(Self::Authenticated),
            _ => None,
        }
    }
}
