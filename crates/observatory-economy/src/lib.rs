//! The Observatory economy: trade offers and the transfer ledger.
//!
//! Trading is two-phase. Submitting a `trade` action debits the proposer's
//! action cost and records a pending [`TradeOffer`]; the actual resource
//! exchange executes only when the counterparty accepts, and both
//! transfers complete atomically or not at all. Every executed exchange
//! produces two immutable [`Transaction`] records (one per direction)
//! sharing the offer id.
//!
//! [`TradeOffer`]: observatory_types::TradeOffer
//! [`Transaction`]: observatory_types::Transaction

pub mod accounting;
pub mod trade;

pub use accounting::TransactionLog;
pub use trade::{AcceptedTrade, NewOffer, OFFER_WINDOW_TICKS, TradeBook, TradeError};
