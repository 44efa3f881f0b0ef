//! # GameTout App
//!
//! Command layer and entry point for the `gametout` CLI.
//!
//! This crate contains:
//! - Commands (login, logout, status, account linking)
//! - Application context (dependency injection)
//! - Logging setup
//!
//! ## Architecture
//! - Depends on `domain`, `common`, and `infra`
//! - Wires the handshake, credential store and API client together

pub mod commands;
pub mod context;
pub mod utils;

// Re-export for convenience
pub use commands::*;
pub use context::*;
