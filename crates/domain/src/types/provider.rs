//! Third-party identity providers
//!
//! The backend mediates the OAuth2 exchange for a fixed set of providers.
//! The lowercase tag is what travels in URLs, callback parameters and the
//! persisted provider entry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
#[cfg(feature = "ts-gen")]
use ts_rs::TS;

use crate::errors::GameToutError;

/// Supported third-party identity provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
pub enum Provider {
    Discord,
    Steam,
    LinkedIn,
}

impl Provider {
    /// Every supported provider, in display order.
    pub const ALL: [Self; 3] = [Self::Discord, Self::Steam, Self::LinkedIn];

    /// Wire tag used in endpoint paths and callback parameters.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Discord => "discord",
            Self::Steam => "steam",
            Self::LinkedIn => "linkedin",
        }
    }

    /// Human-readable name for prompts and log lines.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Discord => "Discord",
            Self::Steam => "Steam",
            Self::LinkedIn => "LinkedIn",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = GameToutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        Self::ALL
            .into_iter()
            .find(|provider| provider.as_str().eq_ignore_ascii_case(tag))
            .ok_or_else(|| GameToutError::InvalidInput(format!("unsupported provider: {s}")))
    }
}
