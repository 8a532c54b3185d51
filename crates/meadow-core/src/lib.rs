//! Meadow-core: Shared types, errors, and configuration
//!
//! This crate provides the foundational types used across the Meadow workspace.

pub mod config;
pub mod errors;
pub mod guard;
pub mod types;

pub use config::*;
pub use errors::*;
pub use guard::{GuardScope, ReentrancyGuard};
pub use types::*;
