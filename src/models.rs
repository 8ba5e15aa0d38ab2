// src/models.rs
use chrono::{DateTime, Utc};

/// A single outgoing native transfer pulled out of one transaction.
/// Derived during extraction, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferEvent {
    pub destination: String,
    pub lamports: u64,
    pub signature: String,
}

/// Pre/post balance of one account within a single transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceDelta {
    pub pre: u64,
    pub post: u64,
}

/// One classified outflow transaction held in the sliding window.
///
/// `lamports` is the classification amount chosen at extraction time
/// (raw transfer amount, or destination post-balance under the
/// fresh-destination gate), so re-evaluation never refetches the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutflowRecord {
    pub signature: String,
    pub destination: String,
    pub lamports: u64,
    pub observed_at: DateTime<Utc>,
}

/// The single durable record the monitor owns: cursor, window, dedup key.
/// Loaded at startup, mutated by each cycle, written back once per cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistentState {
    /// Newest fully-processed signature; `None` triggers warm-up.
    pub anchor: Option<String>,
    /// Bounded window of outflow records, newest first.
    pub window: Vec<OutflowRecord>,
    /// Alert key of the last dispatched alert, kept for deduplication.
    pub last_alert_key: Option<String>,
}
