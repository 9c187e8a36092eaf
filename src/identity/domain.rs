//! Identity value types.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors returned while constructing identity values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// The wallet address is empty after trimming.
    #[error("wallet address must not be empty")]
    EmptyAddress,

    /// The wallet address contains whitespace.
    #[error("wallet address '{0}' must not contain whitespace")]
    InvalidAddress(String),
}

/// Canonical wallet address identifying a marketplace participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Number of leading and trailing characters kept by [`Self::short_label`].
    const SHORT_LABEL_EDGE: usize = 4;

    /// Creates a validated wallet address.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::EmptyAddress`] for blank input and
    /// [`IdentityError::InvalidAddress`] when inner whitespace is present.
    pub fn new(value: impl Into<String>) -> Result<Self, IdentityError> {
        let raw = value.into();
        let normalized = raw.trim();
        if normalized.is_empty() {
            return Err(IdentityError::EmptyAddress);
        }
        if normalized.chars().any(char::is_whitespace) {
            return Err(IdentityError::InvalidAddress(raw));
        }
        Ok(Self(normalized.to_owned()))
    }

    /// Returns the address as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the abbreviated `abcd...wxyz` form used as a display label.
    ///
    /// Addresses too short to abbreviate are returned unchanged.
    ///
    /// ```
    /// use taskboard::identity::WalletAddress;
    ///
    /// let address = WalletAddress::new("7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU").unwrap();
    /// assert_eq!(address.short_label(), "7xKX...gAsU");
    /// ```
    #[must_use]
    pub fn short_label(&self) -> String {
        let edge = Self::SHORT_LABEL_EDGE;
        let length = self.0.chars().count();
        if length <= edge.saturating_mul(2) {
            return self.0.clone();
        }
        let head: String = self.0.chars().take(edge).collect();
        let tail: String = self.0.chars().skip(length.saturating_sub(edge)).collect();
        format!("{head}...{tail}")
    }
}

impl AsRef<str> for WalletAddress {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Authenticated caller: canonical address plus display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    address: WalletAddress,
    display_label: String,
}

impl Identity {
    /// Creates an identity labelled with the address's short form.
    #[must_use]
    pub fn new(address: WalletAddress) -> Self {
        let display_label = address.short_label();
        Self {
            address,
            display_label,
        }
    }

    /// Replaces the display label.
    #[must_use]
    pub fn with_display_label(mut self, label: impl Into<String>) -> Self {
        self.display_label = label.into();
        self
    }

    /// Returns the canonical address.
    #[must_use]
    pub const fn address(&self) -> &WalletAddress {
        &self.address
    }

    /// Returns the display label.
    #[must_use]
    pub fn display_label(&self) -> &str {
        &self.display_label
    }
}
