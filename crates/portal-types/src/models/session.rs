//! Session and access-claim models.
//!
//! The backend reports a user's data-access entitlements alongside every
//! authenticated response. `intersection` and `fence_projects` arrive as
//! single-element lists and are collapsed to booleans here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Failure message the user service reports for an expired session.
pub const SESSION_TIMEOUT_MESSAGE: &str = "Session timed out or not authorized";

/// Opaque identity object passed through from the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct User(pub Value);

impl User {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

/// Data-access entitlements extracted from an authenticated response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AccessClaims {
    /// User has at least one project in common with the portal's data
    pub intersection: bool,
    /// Projects the user is authorized for through NIH
    pub nih_projects: Vec<String>,
    /// User has projects granted through fence
    pub fence_projects: bool,
}

impl AccessClaims {
    /// Extract claims from a response payload.
    ///
    /// Returns `None` when any of the three top-level fields is missing or
    /// has the wrong shape. An empty flag list reads as `false`.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let intersection = first_flag(payload.get("intersection")?)?;
        let fence_projects = first_flag(payload.get("fence_projects")?)?;
        let nih_projects = payload
            .get("nih_projects")?
            .as_array()?
            .iter()
            .map(|project| match project {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();

        Some(Self { intersection, nih_projects, fence_projects })
    }
}

fn first_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Array(items) => match items.first() {
            None => Some(false),
            Some(Value::Bool(flag)) => Some(*flag),
            Some(Value::Null) => Some(false),
            Some(_) => None,
        },
        Value::Bool(flag) => Some(*flag),
        _ => None,
    }
}

/// Lifecycle of the authenticated session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No access claims recorded yet
    #[default]
    Unauthenticated,
    /// Access claims recorded from a successful response
    Authenticated,
    /// Session revoked by the backend; only a fresh login leaves this state
    LoggedOut,
}

/// Immutable view of the process-wide session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SessionSnapshot {
    pub user: Option<User>,
    pub access_claims: Option<AccessClaims>,
    pub phase: SessionPhase,
    /// Time of the write that produced this snapshot
    pub updated_at: Option<DateTime<Utc>>,
}

impl SessionSnapshot {
    pub fn has_user(&self) -> bool {
        self.user.is_some()
    }

    /// Decide which view the application may render.
    ///
    /// `user_fetch_failure` is the error message from the external user
    /// lookup, when that lookup failed.
    pub fn verdict(&self, user_fetch_failure: Option<&str>) -> AccessVerdict {
        if let Some(message) = user_fetch_failure {
            return AccessVerdict::LoginRequired { timeout: message == SESSION_TIMEOUT_MESSAGE };
        }
        if self.phase == SessionPhase::LoggedOut {
            return AccessVerdict::LoginRequired { timeout: true };
        }
        if self.user.is_none() {
            return AccessVerdict::AwaitingUser;
        }

        match &self.access_claims {
            Some(claims) if !claims.intersection => AccessVerdict::NoIntersection,
            Some(claims) if !claims.fence_projects => AccessVerdict::NoFenceProjects,
            Some(claims) if claims.nih_projects.is_empty() => AccessVerdict::NoNihProjects,
            _ => AccessVerdict::Granted,
        }
    }
}

/// Outcome of gating the application on the current session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccessVerdict {
    Granted,
    /// User lookup still in flight
    AwaitingUser,
    LoginRequired {
        timeout: bool,
    },
    NoIntersection,
    NoFenceProjects,
    NoNihProjects,
}

impl AccessVerdict {
    /// Login route to redirect to, or `None` when rendering may proceed.
    pub fn login_redirect(&self) -> Option<&'static str> {
        match self {
            Self::Granted | Self::AwaitingUser => None,
            Self::LoginRequired { timeout: false } => Some("/login"),
            Self::LoginRequired { timeout: true } => Some("/login?error=timeout"),
            Self::NoIntersection => Some("/login?error=no_intersection"),
            Self::NoFenceProjects => Some("/login?error=no_fence_projects"),
            Self::NoNihProjects => Some("/login?error=no_nih_projects"),
        }
    }
}
