//! # GameTout Domain
//!
//! Identity domain types shared by the GameTout client crates.
//!
//! This crate contains:
//! - Third-party provider and credential types
//! - Linked-account records returned by the API
//! - Domain error types and Result definitions
//! - Configuration structures and constants
//!
//! ## Architecture
//! - No dependencies on other GameTout crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
