//! Linked third-party accounts

use serde::{Deserialize, Serialize};
#[cfg(feature = "ts-gen")]
use ts_rs::TS;

use super::provider::Provider;

/// A provider identity linked to the signed-in GameTout account, as listed
/// by `GET /oauth2/linked-accounts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
pub struct LinkedAccount {
    #[cfg_attr(feature = "ts-gen", ts(type = "number"))]
    pub id: i64,
    pub provider: Provider,
    #[serde(default)]
    pub provider_username: Option<String>,
    #[serde(default)]
    pub provider_email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Timestamp as sent by the backend; not reinterpreted client-side.
    pub linked_at: String,
}
