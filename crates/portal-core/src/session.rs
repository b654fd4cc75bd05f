//! Process-wide session store.
//!
//! Holds the current [`SessionSnapshot`] behind a lock and swaps it whole on
//! every write, so concurrent readers always see a consistent snapshot.
//! Phase changes are broadcast on a `watch` channel; a transition to
//! [`SessionPhase::LoggedOut`] is the forced-logout signal.

use chrono::Utc;
use parking_lot::RwLock;
use portal_types::{AccessClaims, SessionPhase, SessionSnapshot, User};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

#[derive(Debug)]
pub struct SessionStore {
    current: RwLock<Arc<SessionSnapshot>>,
    phase_tx: watch::Sender<SessionPhase>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        let (phase_tx, _) = watch::channel(SessionPhase::Unauthenticated);
        Self { current: RwLock::new(Arc::new(SessionSnapshot::default())), phase_tx }
    }

    /// Current snapshot. Cheap to clone and safe to hold across awaits.
    pub fn snapshot(&self) -> Arc<SessionSnapshot> {
        self.current.read().clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.current.read().phase
    }

    pub fn has_user(&self) -> bool {
        self.current.read().has_user()
    }

    /// Receiver notified on every phase change.
    pub fn subscribe(&self) -> watch::Receiver<SessionPhase> {
        self.phase_tx.subscribe()
    }

    /// Start a session for `user`, as done by the external login flow.
    ///
    /// This is the only way out of [`SessionPhase::LoggedOut`].
    pub fn begin(&self, user: User) {
        self.replace(|_| {
            Some(SessionSnapshot {
                user: Some(user),
                access_claims: None,
                phase: SessionPhase::Unauthenticated,
                updated_at: Some(Utc::now()),
            })
        });
        info!("Session started");
    }

    /// Record access claims and move to `Authenticated`.
    ///
    /// Ignored once logged out. Returns `true` if the claims were stored.
    pub fn set_claims(&self, claims: AccessClaims) -> bool {
        self.replace(|current| {
            if current.phase == SessionPhase::LoggedOut {
                debug!("Ignoring access claims for a logged-out session");
                return None;
            }
            Some(SessionSnapshot {
                user: current.user.clone(),
                access_claims: Some(claims),
                phase: SessionPhase::Authenticated,
                updated_at: Some(Utc::now()),
            })
        })
    }

    /// Clear identity and claims and enter `LoggedOut`.
    pub fn force_logout(&self) {
        self.replace(|_| {
            Some(SessionSnapshot {
                user: None,
                access_claims: None,
                phase: SessionPhase::LoggedOut,
                updated_at: Some(Utc::now()),
            })
        });
    }

    /// Reset to an empty, unauthenticated session.
    pub fn clear(&self) {
        self.replace(|_| {
            Some(SessionSnapshot { updated_at: Some(Utc::now()), ..Default::default() })
        });
    }

    fn replace<F>(&self, update: F) -> bool
    where
        F: FnOnce(&SessionSnapshot) -> Option<SessionSnapshot>,
    {
        let mut current = self.current.write();
        let Some(next) = update(&current) else {
            return false;
        };
        let phase = next.phase;
        *current = Arc::new(next);
        drop(current);

        self.phase_tx.send_if_modified(|old| {
            if *old == phase {
                return false;
            }
            *old = phase;
            true
        });
        true
    }
}
