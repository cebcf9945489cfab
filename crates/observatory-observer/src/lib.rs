//! The read-only observer API.
//!
//! Humans (and dashboards) watch the world through this surface. It is
//! structurally incapable of mutation: every registered route is a `GET`,
//! and a defensive after-layer rejects any other method with 405. It
//! shares the kernel's stores with the gateway but never its credentials.
//!
//! # Modules
//!
//! - [`state`] -- Shared read handles
//! - [`handlers`] -- The endpoint implementations
//! - [`router`] -- Route assembly plus the method guard
//! - [`error`] -- HTTP error mapping

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::ObserverError;
pub use router::build_router;
pub use state::ObserverState;
