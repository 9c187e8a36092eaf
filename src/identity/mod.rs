//! Caller identity.
//!
//! Every mutating lifecycle operation is attributed to a wallet identity. The
//! identity is supplied by an [`ports::IdentityProvider`] and read afresh for
//! each operation so a disconnected session cannot act on stale credentials.

pub mod adapters;
pub mod domain;
pub mod ports;

pub use domain::{Identity, IdentityError, WalletAddress};
pub use ports::IdentityProvider;
