//! Third-party bearer credential

use std::fmt;

use serde::{Deserialize, Serialize};

use super::provider::Provider;

/// Bearer token obtained through the popup handshake, tagged with the
/// provider that issued it.
///
/// There is never a token without a provider: both halves are persisted and
/// cleared together.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThirdPartyCredential {
    pub token: String,
    pub provider: Provider,
}

impl ThirdPartyCredential {
    #[must_use]
    pub fn new(token: impl Into<String>, provider: Provider) -> Self {
        Self { token: token.into(), provider }
    }
}

// Tokens never reach log output.
impl fmt::Debug for ThirdPartyCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThirdPartyCredential")
            .field("token", &"<redacted>")
            .field("provider", &self.provider)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_token() {
        let credential = ThirdPartyCredential::new("abc123", Provider::Discord);
        let rendered = format!("{credential:?}");

        assert!(!rendered.contains("abc123"));
        assert!(rendered.contains("Discord"));
    }
}
