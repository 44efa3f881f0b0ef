//! Shared helpers for commands and the binary

pub mod logging;
