//! Port contract for identity lookup.

use super::Identity;

/// Supplies the identity of the current caller.
#[cfg_attr(test, mockall::automock)]
pub trait IdentityProvider: Send + Sync {
    /// Returns the authenticated identity, or `None` when no wallet is
    /// connected.
    fn current_identity(&self) -> Option<Identity>;
}
