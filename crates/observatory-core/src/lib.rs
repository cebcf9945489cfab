//! The world kernel: deterministic rules resolution and the tick engine.
//!
//! Every write to the world follows one path: authenticated request ->
//! action queue -> (next tick) rules resolution -> state mutation under
//! the world lock -> ledger append. The rules resolver is a total
//! function over the closed action enum; pre-condition failures never
//! debit resources.
//!
//! # Modules
//!
//! - [`rules`] -- Per-action validation and resolution, danger application
//! - [`tick`] -- The queue, the tick loop, and side-effect application

pub mod rules;
pub mod tick;

pub use tick::TickEngine;
