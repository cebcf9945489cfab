//! The agent-facing write gateway.
//!
//! Every mutation of the world enters through this surface: registration
//! (proof-of-work plus a signed nonce), the signed action endpoints, and
//! the claim flow. All routes except the two registration endpoints (and
//! the token-bearing claim pages) pass through the signed-request auth
//! middleware.
//!
//! Humans never authenticate here. The only human-reachable mutation is
//! the one-time claim, gated by possession of a single-use token.
//!
//! # Modules
//!
//! - [`auth`] -- The `X-Agent-ID` / `X-Timestamp` / `X-Signature` middleware
//! - [`routes`] -- Registration, observe, action, message handlers
//! - [`claim`] -- The claim verification endpoints
//! - [`router`] -- Route assembly
//! - [`state`] -- Shared handles to the kernel singletons
//! - [`error`] -- HTTP error mapping

pub mod auth;
pub mod claim;
pub mod error;
pub mod router;
pub mod routes;
pub mod state;

pub use error::GatewayError;
pub use router::build_router;
pub use state::GatewayState;
