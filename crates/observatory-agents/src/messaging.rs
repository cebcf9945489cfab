//! Agent-to-agent messaging.
//!
//! Communication is costly (the `send_message` action debits resources)
//! and noisy (content degrades with the distance between sender and
//! receiver regions). Delivered messages land in the recipient's ordered
//! inbox and in a global list for observer queries.
//!
//! The corruption PRNG is a dedicated seedable generator: production buses
//! seed from the OS, tests seed explicitly for deterministic replay.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rand::SeedableRng;
use rand::rngs::StdRng;

use observatory_types::{Message, unix_now};

use crate::noise::apply_noise;

/// Parameters for one message delivery.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// The tick of delivery.
    pub tick: u64,
    /// Sending agent.
    pub from_agent: String,
    /// Receiving agent.
    pub to_agent: String,
    /// Content as submitted (pre-noise).
    pub content: String,
    /// Per-character corruption probability.
    pub noise_factor: f64,
    /// Sender's region at send time.
    pub sender_region: String,
    /// Receiver's region at send time.
    pub receiver_region: String,
}

struct BusInner {
    messages: Vec<Message>,
    inboxes: BTreeMap<String, Vec<Message>>,
    next_id: u64,
    rng: StdRng,
}

/// The message bus: per-recipient inboxes plus the global list.
pub struct MessageBus {
    inner: Mutex<BusInner>,
}

impl MessageBus {
    /// A bus with an OS-seeded corruption PRNG.
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_os_rng())
    }

    /// A bus with a deterministic corruption PRNG (tests, replays).
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            inner: Mutex::new(BusInner {
                messages: Vec::new(),
                inboxes: BTreeMap::new(),
                next_id: 0,
                rng,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BusInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver a message: apply noise, append to the recipient's inbox,
    /// and record it in the global list.
    pub fn send_message(&self, delivery: Delivery) -> Message {
        let mut inner = self.lock();
        let noisy_content = apply_noise(&delivery.content, delivery.noise_factor, &mut inner.rng);

        let message = Message {
            message_id: format!("msg_{:08}", inner.next_id),
            tick: delivery.tick,
            from_agent: delivery.from_agent,
            to_agent: delivery.to_agent,
            content: noisy_content,
            noise_factor: delivery.noise_factor,
            delivered: true,
            sender_region: delivery.sender_region,
            receiver_region: delivery.receiver_region,
            timestamp: unix_now(),
        };

        inner.next_id = inner.next_id.saturating_add(1);
        inner.messages.push(message.clone());
        inner
            .inboxes
            .entry(message.to_agent.clone())
            .or_default()
            .push(message.clone());

        message
    }

    /// Messages in an agent's inbox with `tick >= since_tick`, in
    /// delivery order.
    pub fn get_inbox(&self, agent_id: &str, since_tick: u64) -> Vec<Message> {
        let inner = self.lock();
        inner.inboxes.get(agent_id).map_or_else(Vec::new, |inbox| {
            inbox
                .iter()
                .filter(|m| m.tick >= since_tick)
                .cloned()
                .collect()
        })
    }

    /// All messages in a tick window (observer queries).
    pub fn all_messages(&self, from_tick: u64, to_tick: Option<u64>) -> Vec<Message> {
        let inner = self.lock();
        inner
            .messages
            .iter()
            .filter(|m| m.tick >= from_tick)
            .filter(|m| to_tick.is_none_or(|to| m.tick <= to))
            .cloned()
            .collect()
    }

    /// Total number of delivered messages.
    pub fn message_count(&self) -> usize {
        self.lock().messages.len()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}
