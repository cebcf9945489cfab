//! Agent identity, authentication, lifecycle, and messaging.
//!
//! Agents authenticate with signed requests; no human ever holds agent
//! credentials. Registration is throttled by proof-of-work, ownership is
//! transferred to a human operator exactly once through a single-use claim
//! token, and agent-to-agent messages degrade with distance.
//!
//! # Modules
//!
//! - [`identity`] -- PoW, signature verification (Ed25519 with HMAC
//!   fallback), timestamp skew, id derivation, token generation
//! - [`lifecycle`] -- Claim token validation and the atomic claim
//! - [`messaging`] -- Per-recipient inboxes and the global message list
//! - [`noise`] -- Character-level corruption of message content

pub mod identity;
pub mod lifecycle;
pub mod messaging;
pub mod noise;

pub use identity::{
    CLAIM_TOKEN_TTL_SECONDS, POW_DIFFICULTY_BITS, TIMESTAMP_MAX_SKEW_SECONDS, derive_agent_id,
    generate_challenge, generate_claim_token, hmac_sign, is_timestamp_valid, solve_pow,
    verify_pow, verify_request, verify_signed_nonce,
};
pub use lifecycle::{ClaimError, ClaimReceipt, LifecycleManager, MAX_CLAIM_ATTEMPTS, VerificationInfo};
pub use messaging::{Delivery, MessageBus};
pub use noise::{apply_noise, readability};
