//! Credential settings for authenticated deployments.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// How credentials are attached in authenticated mode.
///
/// Session cookies are always sent for credentialed requests; `token`
/// additionally attaches a header for deployments that issue API tokens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct AuthConfig {
    /// Header carrying the token
    #[validate(length(min = 1_u64))]
    #[serde(default = "default_token_header")]
    pub token_header: String,
    /// Token value, if any
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { token_header: default_token_header(), token: None }
    }
}

pub fn default_token_header() -> String {
    "X-Auth-Token".to_string()
}
