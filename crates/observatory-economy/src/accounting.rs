//! The immutable transfer ledger.
//!
//! Records every directed resource transfer between agents. Emergent
//! currencies are allowed; this log only tracks resource flows and never
//! interprets them.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use observatory_types::{ResourceKind, Transaction, unix_now};

struct LogInner {
    transactions: Vec<Transaction>,
    next_id: u64,
}

/// Append-only log of resource transfers between agents.
#[derive(Default)]
pub struct TransactionLog {
    inner: Mutex<LogInner>,
}

impl Default for LogInner {
    fn default() -> Self {
        Self {
            transactions: Vec::new(),
            next_id: 0,
        }
    }
}

impl TransactionLog {
    /// An empty transaction log.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LogInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record one directed transfer.
    pub fn record_transfer(
        &self,
        tick: u64,
        from_agent: &str,
        to_agent: &str,
        resource: ResourceKind,
        amount: f64,
        trade_id: Option<&str>,
    ) -> Transaction {
        let mut inner = self.lock();
        let tx = Transaction {
            transaction_id: format!("tx_{:08}", inner.next_id),
            tick,
            from_agent: from_agent.to_owned(),
            to_agent: to_agent.to_owned(),
            resource,
            amount,
            timestamp: unix_now(),
            trade_id: trade_id.map(str::to_owned),
        };
        inner.next_id = inner.next_id.saturating_add(1);
        inner.transactions.push(tx.clone());
        tx
    }

    /// Query transfers by tick window and (optionally) participant.
    pub fn get_transactions(
        &self,
        from_tick: u64,
        to_tick: Option<u64>,
        agent_id: Option<&str>,
    ) -> Vec<Transaction> {
        let inner = self.lock();
        inner
            .transactions
            .iter()
            .filter(|tx| tx.tick >= from_tick)
            .filter(|tx| to_tick.is_none_or(|to| tx.tick <= to))
            .filter(|tx| {
                agent_id.is_none_or(|agent| tx.from_agent == agent || tx.to_agent == agent)
            })
            .cloned()
            .collect()
    }

    /// Net resource flows for an agent (credits minus debits).
    pub fn balance_sheet(&self, agent_id: &str) -> BTreeMap<ResourceKind, f64> {
        let inner = self.lock();
        let mut balances: BTreeMap<ResourceKind, f64> = BTreeMap::new();
        for tx in &inner.transactions {
            if tx.from_agent == agent_id {
                let entry = balances.entry(tx.resource).or_insert(0.0);
                *entry -= tx.amount;
            }
            if tx.to_agent == agent_id {
                let entry = balances.entry(tx.resource).or_insert(0.0);
                *entry += tx.amount;
            }
        }
        balances
    }

    /// Total transferred volume per resource kind.
    pub fn total_volume(&self) -> BTreeMap<ResourceKind, f64> {
        let inner = self.lock();
        let mut volumes: BTreeMap<ResourceKind, f64> = BTreeMap::new();
        for tx in &inner.transactions {
            let entry = volumes.entry(tx.resource).or_insert(0.0);
            *entry += tx.amount;
        }
        volumes
    }

    /// Number of recorded transfers.
    pub fn count(&self) -> usize {
        self.lock().transactions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sequential() {
        let log = TransactionLog::new();
        let a = log.record_transfer(1, "agent_a", "agent_b", ResourceKind::Energy, 5.0, None);
        let b = log.record_transfer(1, "agent_b", "agent_a", ResourceKind::Compute, 2.0, None);
        assert_eq!(a.transaction_id, "tx_00000000");
        assert_eq!(b.transaction_id, "tx_00000001");
        assert_eq!(log.count(), 2);
    }

    #[test]
    fn balance_sheet_nets_flows() {
        let log = TransactionLog::new();
        log.record_transfer(1, "agent_a", "agent_b", ResourceKind::Energy, 10.0, None);
        log.record_transfer(2, "agent_b", "agent_a", ResourceKind::Energy, 4.0, None);
        let a = log.balance_sheet("agent_a");
        assert!((a.get(&ResourceKind::Energy).copied().unwrap_or(0.0) + 6.0).abs() < 1e-9);
        let b = log.balance_sheet("agent_b");
        assert!((b.get(&ResourceKind::Energy).copied().unwrap_or(0.0) - 6.0).abs() < 1e-9);
    }

    #[test]
    fn volume_sums_per_kind() {
        let log = TransactionLog::new();
        log.record_transfer(1, "agent_a", "agent_b", ResourceKind::Energy, 10.0, None);
        log.record_transfer(2, "agent_b", "agent_c", ResourceKind::Energy, 5.0, None);
        log.record_transfer(2, "agent_c", "agent_a", ResourceKind::Memory, 7.0, None);
        let volume = log.total_volume();
        assert!((volume.get(&ResourceKind::Energy).copied().unwrap_or(0.0) - 15.0).abs() < 1e-9);
        assert!((volume.get(&ResourceKind::Memory).copied().unwrap_or(0.0) - 7.0).abs() < 1e-9);
    }

    #[test]
    fn query_filters_by_window_and_participant() {
        let log = TransactionLog::new();
        log.record_transfer(1, "agent_a", "agent_b", ResourceKind::Energy, 1.0, None);
        log.record_transfer(5, "agent_c", "agent_a", ResourceKind::Energy, 1.0, None);
        log.record_transfer(9, "agent_b", "agent_c", ResourceKind::Energy, 1.0, None);

        assert_eq!(log.get_transactions(0, None, Some("agent_a")).len(), 2);
        assert_eq!(log.get_transactions(2, Some(8), None).len(), 1);
    }
}
