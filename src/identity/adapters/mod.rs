//! Identity provider adapters.

mod session;

pub use session::SessionIdentityProvider;
