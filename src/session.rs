//! Session guard and the auth collaborator.

use crate::event::InboundEvent;
use std::sync::{Arc, RwLock};

/// Marker the server puts in errors that end the session.
pub const ACCESS_DENIED: &str = "Access Denied";

/// What the engine should do after an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    Continue,
    /// Tear down the private channel and clear account state.
    Terminate { reason: String },
}

/// Decides whether a private-channel event ends the session.
#[derive(Debug, Clone, Default)]
pub struct SessionGuard;

impl SessionGuard {
    pub fn new() -> Self {
        Self
    }

    pub fn inspect(&self, event: &InboundEvent) -> SessionAction {
        match event {
            InboundEvent::AuthError(text) if text.contains(ACCESS_DENIED) => {
                tracing::warn!("Session denied by server: {}", text);
                SessionAction::Terminate {
                    reason: text.clone(),
                }
            }
            InboundEvent::AuthError(text) => {
                tracing::error!("Server error on private channel: {}", text);
                SessionAction::Continue
            }
            _ => SessionAction::Continue,
        }
    }
}

/// Source of the bearer token and the place to report a dead session.
pub trait AuthSession: Send + Sync {
    /// Current token, if logged in.
    fn token(&self) -> Option<String>;

    /// Called once the server has rejected the session.
    fn invalidate(&self, reason: &str);
}

/// In-memory [`AuthSession`].
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    token: Arc<RwLock<Option<String>>>,
}

impl StaticSession {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(Some(token.into()))),
        }
    }

    /// A session with no token; only the public channel opens.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn set_token(&self, token: impl Into<String>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = Some(token.into());
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.token().is_some()
    }
}

impl AuthSession for StaticSession {
    fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|guard| guard.clone())
    }

    fn invalidate(&self, reason: &str) {
        tracing::info!("Logging out: {}", reason);
        if let Ok(mut guard) = self.token.write() {
            *guard = None;
        }
    }
}
