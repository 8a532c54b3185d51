//! Meadow-api: HTTP API layer for Meadow
//!
//! Exposes the swap router, the yield farm and the token ledger as JSON
//! endpoints.

pub mod auth;
pub mod dto;
pub mod routes;
pub mod server;
pub mod state;

pub use auth::Principal;
pub use server::*;
pub use state::{AppState, Exchange, SetupError};
