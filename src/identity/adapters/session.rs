//! In-process wallet session.

use crate::identity::{Identity, IdentityProvider};
use std::sync::{Arc, PoisonError, RwLock};

/// Identity provider backed by a connect/disconnect session.
///
/// Clones share the same session, so a handle kept by the caller can switch
/// identities under a running lifecycle service.
#[derive(Debug, Clone, Default)]
pub struct SessionIdentityProvider {
    current: Arc<RwLock<Option<Identity>>>,
}

impl SessionIdentityProvider {
    /// Creates a disconnected session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session already connected as `identity`.
    #[must_use]
    pub fn connected(identity: Identity) -> Self {
        Self {
            current: Arc::new(RwLock::new(Some(identity))),
        }
    }

    /// Connects the session as `identity`, replacing any previous identity.
    pub fn connect(&self, identity: Identity) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(identity);
    }

    /// Disconnects the session.
    pub fn disconnect(&self) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl IdentityProvider for SessionIdentityProvider {
    fn current_identity(&self) -> Option<Identity> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
