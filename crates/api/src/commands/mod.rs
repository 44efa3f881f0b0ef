//! Commands - CLI to service bridge

mod accounts;
mod auth;

pub use accounts::*;
pub use auth::*;
