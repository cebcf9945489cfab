//! The append-only event ledger.
//!
//! Events live both in memory and in a JSONL file (one JSON object per
//! line). A process-wide mutex serializes appends, so event ids are
//! monotonically increasing and gap-free. Startup loads existing records
//! and advances the id counter past the highest id seen; corrupt lines
//! are skipped without breaking monotonicity.
//!
//! Persistence failures are deliberately swallowed: the in-memory copy
//! remains authoritative and the next successful write resynchronizes the
//! file (per the error-handling design).

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use observatory_types::{Event, EventDraft, unix_now};

/// Default (and maximum) number of events returned by a filtered query.
pub const DEFAULT_QUERY_LIMIT: usize = 1000;

/// Filter parameters for [`EventLedger::get_events`].
#[derive(Debug, Clone)]
pub struct EventFilter {
    /// Only events with `tick >= from_tick`.
    pub from_tick: u64,
    /// Only events with `tick <= to_tick`, when set.
    pub to_tick: Option<u64>,
    /// Only events with this exact action type, when set.
    pub action_type: Option<String>,
    /// Only events by this agent, when set.
    pub agent_id: Option<String>,
    /// Maximum number of events returned.
    pub limit: usize,
}

impl Default for EventFilter {
    fn default() -> Self {
        Self {
            from_tick: 0,
            to_tick: None,
            action_type: None,
            agent_id: None,
            limit: DEFAULT_QUERY_LIMIT,
        }
    }
}

struct LedgerInner {
    events: Vec<Event>,
    next_id: u64,
}

/// The append-only event ledger.
pub struct EventLedger {
    path: PathBuf,
    inner: Mutex<LedgerInner>,
}

impl EventLedger {
    /// Open a ledger backed by `path`, loading any existing records.
    ///
    /// Lines that fail to parse are skipped; the id counter continues
    /// from `max(existing ids) + 1`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut events = Vec::new();
        let mut next_id: u64 = 0;

        if path.exists() {
            match fs::read_to_string(&path) {
                Ok(contents) => {
                    for line in contents.lines() {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<Event>(line) {
                            Ok(event) => {
                                next_id = next_id.max(event.event_id.saturating_add(1));
                                events.push(event);
                            }
                            Err(err) => {
                                warn!(path = %path.display(), %err, "Skipping corrupt ledger line");
                            }
                        }
                    }
                    debug!(path = %path.display(), count = events.len(), next_id, "Event ledger loaded");
                }
                Err(err) => {
                    warn!(path = %path.display(), %err, "Ledger file unreadable, starting fresh");
                }
            }
        }

        Self {
            path,
            inner: Mutex::new(LedgerInner { events, next_id }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LedgerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The configured ledger file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a new event. This is the only write operation.
    ///
    /// The ledger assigns the id and timestamp, retains the record in
    /// memory, and appends one JSON line to the file. File write failures
    /// are logged and swallowed.
    pub fn append(&self, draft: EventDraft) -> Event {
        let mut inner = self.lock();
        let event = Event {
            event_id: inner.next_id,
            tick: draft.tick,
            action_type: draft.action_type,
            agent_id: draft.agent_id,
            success: draft.success,
            details: draft.details,
            error: draft.error,
            timestamp: unix_now(),
        };
        inner.next_id = inner.next_id.saturating_add(1);
        inner.events.push(event.clone());

        if let Err(err) = append_line(&self.path, &event) {
            warn!(path = %self.path.display(), %err, "Ledger append not persisted; memory copy remains authoritative");
        }

        event
    }

    /// Query events in append order with the given filters.
    pub fn get_events(&self, filter: &EventFilter) -> Vec<Event> {
        let inner = self.lock();
        let mut results = Vec::new();
        for event in &inner.events {
            if event.tick < filter.from_tick {
                continue;
            }
            if filter.to_tick.is_some_and(|to| event.tick > to) {
                continue;
            }
            if filter
                .action_type
                .as_deref()
                .is_some_and(|a| event.action_type != a)
            {
                continue;
            }
            if filter
                .agent_id
                .as_deref()
                .is_some_and(|a| event.agent_id != a)
            {
                continue;
            }
            results.push(event.clone());
            if results.len() >= filter.limit {
                break;
            }
        }
        results
    }

    /// Look up a single event by id.
    pub fn get_by_id(&self, event_id: u64) -> Option<Event> {
        let inner = self.lock();
        inner
            .events
            .iter()
            .find(|e| e.event_id == event_id)
            .cloned()
    }

    /// Total number of events.
    pub fn count(&self) -> usize {
        self.lock().events.len()
    }

    /// Tick of the most recently appended event (0 when empty).
    pub fn latest_tick(&self) -> u64 {
        self.lock().events.last().map_or(0, |e| e.tick)
    }

    /// All events belonging to one tick.
    pub fn events_at_tick(&self, tick: u64) -> Vec<Event> {
        let inner = self.lock();
        inner
            .events
            .iter()
            .filter(|e| e.tick == tick)
            .cloned()
            .collect()
    }
}

fn append_line(path: &Path, event: &Event) -> std::io::Result<()> {
    let line = serde_json::to_string(event).map_err(std::io::Error::other)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())?;
    file.write_all(b"\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("observatory-ledger-{}-{name}.jsonl", std::process::id()));
        path
    }

    fn draft(tick: u64, action: &str, agent: &str) -> EventDraft {
        EventDraft {
            tick,
            action_type: action.to_owned(),
            agent_id: agent.to_owned(),
            success: true,
            details: serde_json::json!({}),
            error: None,
        }
    }

    #[test]
    fn ids_are_monotone_and_gap_free() {
        let path = temp_path("monotone");
        let _ = fs::remove_file(&path);
        let ledger = EventLedger::open(&path);
        for tick in 1..=5 {
            ledger.append(draft(tick, "move", "agent_a"));
        }
        let events = ledger.get_events(&EventFilter::default());
        let ids: Vec<u64> = events.iter().map(|e| e.event_id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn reopen_continues_past_highest_id() {
        let path = temp_path("reopen");
        let _ = fs::remove_file(&path);
        {
            let ledger = EventLedger::open(&path);
            ledger.append(draft(1, "register", "agent_a"));
            ledger.append(draft(2, "move", "agent_a"));
        }
        let ledger = EventLedger::open(&path);
        assert_eq!(ledger.count(), 2);
        let event = ledger.append(draft(3, "move", "agent_a"));
        assert_eq!(event.event_id, 2);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn corrupt_lines_are_skipped_on_load() {
        let path = temp_path("corrupt");
        let ledger = EventLedger::open(&path);
        ledger.append(draft(1, "register", "agent_a"));
        ledger.append(draft(2, "move", "agent_a"));
        drop(ledger);

        let mut contents = fs::read_to_string(&path).unwrap_or_default();
        contents.push_str("this is not json\n");
        let _ = fs::write(&path, contents);

        let reopened = EventLedger::open(&path);
        assert_eq!(reopened.count(), 2);
        // Counter still advances monotonically past the survivors.
        let event = reopened.append(draft(3, "move", "agent_a"));
        assert_eq!(event.event_id, 2);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn filters_apply_in_combination() {
        let path = temp_path("filters");
        let _ = fs::remove_file(&path);
        let ledger = EventLedger::open(&path);
        ledger.append(draft(1, "register", "agent_a"));
        ledger.append(draft(2, "move", "agent_a"));
        ledger.append(draft(2, "move", "agent_b"));
        ledger.append(draft(3, "attack", "agent_a"));

        let moves = ledger.get_events(&EventFilter {
            action_type: Some(String::from("move")),
            ..EventFilter::default()
        });
        assert_eq!(moves.len(), 2);

        let agent_a_from_2 = ledger.get_events(&EventFilter {
            from_tick: 2,
            agent_id: Some(String::from("agent_a")),
            ..EventFilter::default()
        });
        assert_eq!(agent_a_from_2.len(), 2);

        let window = ledger.get_events(&EventFilter {
            from_tick: 2,
            to_tick: Some(2),
            ..EventFilter::default()
        });
        assert_eq!(window.len(), 2);

        let limited = ledger.get_events(&EventFilter {
            limit: 1,
            ..EventFilter::default()
        });
        assert_eq!(limited.len(), 1);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn latest_tick_and_events_at_tick() {
        let path = temp_path("latest");
        let _ = fs::remove_file(&path);
        let ledger = EventLedger::open(&path);
        assert_eq!(ledger.latest_tick(), 0);
        ledger.append(draft(4, "move", "agent_a"));
        ledger.append(draft(7, "tick", "__world__"));
        assert_eq!(ledger.latest_tick(), 7);
        assert_eq!(ledger.events_at_tick(7).len(), 1);
        assert!(ledger.events_at_tick(5).is_empty());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn get_by_id_finds_exact_event() {
        let path = temp_path("byid");
        let _ = fs::remove_file(&path);
        let ledger = EventLedger::open(&path);
        ledger.append(draft(1, "register", "agent_a"));
        let second = ledger.append(draft(2, "move", "agent_a"));
        assert_eq!(ledger.get_by_id(second.event_id), Some(second));
        assert!(ledger.get_by_id(99).is_none());
        let _ = fs::remove_file(&path);
    }
}
