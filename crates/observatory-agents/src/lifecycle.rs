//! Claim tokens and the unclaimed -> claimed transition.
//!
//! Every registration issues a single-use claim token with a 24 h expiry.
//! A human operator proves ownership out-of-band (the kernel records what
//! the verifier asserts, it does not authenticate the channel) and the
//! claim consumes the token atomically: status flips to claimed, the
//! owner identity is recorded, and the token can never be presented
//! again. Validation is rate-limited per token.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use observatory_types::{AgentStatus, unix_now};
use observatory_world::WorldState;

/// Maximum validation attempts per claim token.
pub const MAX_CLAIM_ATTEMPTS: u32 = 5;

/// Reasons a claim token cannot be validated or consumed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClaimError {
    /// The per-token attempt budget is exhausted.
    #[error("Too many claim attempts for this token")]
    TooManyAttempts,

    /// No unclaimed agent holds this token (unknown, consumed, or bogus).
    #[error("Invalid or expired claim token")]
    InvalidToken,

    /// The agent holding this token is no longer unclaimed.
    #[error("Agent already claimed or dead")]
    AlreadyClaimed,

    /// The token's 24 h window elapsed.
    #[error("Claim token expired")]
    TokenExpired,

    /// The submitted owner identity was empty.
    #[error("Missing owner identity")]
    MissingOwnerIdentity,
}

/// Data for the human-facing verification step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationInfo {
    /// The agent being claimed.
    pub agent_id: String,
    /// Its display name.
    pub display_name: String,
    /// The exact phrase to post on the out-of-band channel.
    pub verification_phrase: String,
    /// The 8-char uppercase code embedded in the phrase.
    pub short_code: String,
    /// Operator instructions.
    pub instructions: String,
}

/// Receipt for a successful claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimReceipt {
    /// The claimed agent.
    pub agent_id: String,
    /// Its display name.
    pub display_name: String,
    /// The recorded owner identity.
    pub owner_identity: String,
    /// How ownership was verified (recorded verbatim).
    pub verification_method: String,
    /// The agent's status after the claim.
    pub status: AgentStatus,
}

/// Manages claim-token validation and the one-time ownership transfer.
pub struct LifecycleManager {
    world: Arc<WorldState>,
    claim_attempts: Mutex<BTreeMap<String, u32>>,
}

impl LifecycleManager {
    /// Create a lifecycle manager over the given world.
    pub fn new(world: Arc<WorldState>) -> Self {
        Self {
            world,
            claim_attempts: Mutex::new(BTreeMap::new()),
        }
    }

    fn attempts(&self) -> MutexGuard<'_, BTreeMap<String, u32>> {
        self.claim_attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Validate a claim token and return `(agent_id, display_name)`.
    ///
    /// Counts an attempt against the token's budget even on failure.
    pub fn validate_claim_token(&self, claim_token: &str) -> Result<(String, String), ClaimError> {
        {
            let mut attempts = self.attempts();
            let count = attempts.entry(claim_token.to_owned()).or_insert(0);
            if *count >= MAX_CLAIM_ATTEMPTS {
                return Err(ClaimError::TooManyAttempts);
            }
            *count = count.saturating_add(1);
        }

        let world = self.world.lock();
        let Some(agent) = world
            .agents
            .values()
            .find(|a| a.claim_token.as_deref() == Some(claim_token))
        else {
            return Err(ClaimError::InvalidToken);
        };

        if agent.status != AgentStatus::Unclaimed {
            return Err(ClaimError::AlreadyClaimed);
        }

        if agent
            .claim_token_expires
            .is_some_and(|expires| unix_now() > expires)
        {
            return Err(ClaimError::TokenExpired);
        }

        Ok((agent.agent_id.clone(), agent.display_name.clone()))
    }

    /// Consume a claim token: set the owner identity, flip the status to
    /// claimed, and clear the token atomically. The world is persisted on
    /// success.
    pub fn claim_agent(
        &self,
        claim_token: &str,
        owner_identity: &str,
        verification_method: &str,
    ) -> Result<ClaimReceipt, ClaimError> {
        if owner_identity.trim().is_empty() {
            return Err(ClaimError::MissingOwnerIdentity);
        }

        let (agent_id, display_name) = self.validate_claim_token(claim_token)?;

        {
            let mut world = self.world.lock();
            let Some(agent) = world.agents.get_mut(&agent_id) else {
                return Err(ClaimError::InvalidToken);
            };
            // Re-check under the write lock: the token must still be live.
            if agent.status != AgentStatus::Unclaimed
                || agent.claim_token.as_deref() != Some(claim_token)
            {
                return Err(ClaimError::AlreadyClaimed);
            }
            agent.status = AgentStatus::Claimed;
            agent.owner_identity = Some(owner_identity.to_owned());
            agent.claim_token = None;
            agent.claim_token_expires = None;
        }

        if let Err(err) = self.world.save() {
            warn!(%err, "World snapshot save failed after claim");
        }

        info!(agent_id = %agent_id, owner = %owner_identity, method = %verification_method, "Agent claimed");

        Ok(ClaimReceipt {
            agent_id,
            display_name,
            owner_identity: owner_identity.to_owned(),
            verification_method: verification_method.to_owned(),
            status: AgentStatus::Claimed,
        })
    }

    /// The out-of-band verification phrase for a claim token.
    pub fn verification_phrase(&self, claim_token: &str) -> Result<VerificationInfo, ClaimError> {
        let (agent_id, display_name) = self.validate_claim_token(claim_token)?;

        let short_code: String = claim_token
            .chars()
            .take(8)
            .collect::<String>()
            .to_uppercase();
        let verification_phrase = format!(
            "I am verifying ownership of my agent on The Observatory. Code: {short_code}"
        );

        Ok(VerificationInfo {
            agent_id,
            display_name,
            verification_phrase,
            short_code,
            instructions: String::from(
                "Post this exact text from the account you want to associate with this agent.",
            ),
        })
    }
}
