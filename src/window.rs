// src/window.rs
//! Bounded newest-first window of outflow records and its per-cycle
//! evaluation against the pattern threshold.

use crate::classifier::{Classification, Classifier};
use crate::models::{OutflowRecord, PersistentState};

/// Prepend a record (newest first) and evict everything beyond `capacity`.
pub fn push_outflow(state: &mut PersistentState, record: OutflowRecord, capacity: usize) {
    state.window.insert(0, record);
    state.window.truncate(capacity);
}

/// Deterministic fingerprint of the window contents: ordered signature
/// concatenation. Identical contents always produce the identical key.
pub fn alert_key(window: &[OutflowRecord]) -> String {
    window
        .iter()
        .map(|record| record.signature.as_str())
        .collect::<Vec<_>>()
        .join("|")
}

/// Everything one evaluation pass learned about a full window.
#[derive(Debug, Clone)]
pub struct WindowVerdict {
    pub key: String,
    pub match_count: usize,
    pub in_range_count: usize,
    pub digit_match_count: usize,
    pub distinct_destinations: usize,
    /// Parallel to the window, newest first.
    pub classifications: Vec<Classification>,
}

/// Classify every window member. Only a full window is evaluated; below
/// capacity the window is still filling and the verdict is `None`.
pub fn evaluate(
    window: &[OutflowRecord],
    classifier: &Classifier,
    capacity: usize,
) -> Option<WindowVerdict> {
    if window.len() < capacity {
        return None;
    }

    let classifications: Vec<Classification> = window
        .iter()
        .map(|record| classifier.classify(record.lamports))
        .collect();

    let mut destinations: Vec<&str> = window
        .iter()
        .map(|record| record.destination.as_str())
        .collect();
    destinations.sort_unstable();
    destinations.dedup();

    Some(WindowVerdict {
        key: alert_key(window),
        match_count: classifications.iter().filter(|c| c.is_match()).count(),
        in_range_count: classifications.iter().filter(|c| c.in_range).count(),
        digit_match_count: classifications.iter().filter(|c| c.digit_match).count(),
        distinct_destinations: destinations.len(),
        classifications,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{ScalePolicy, LAMPORTS_PER_SOL};
    use chrono::{TimeZone, Utc};

    fn record(signature: &str, lamports: u64) -> OutflowRecord {
        OutflowRecord {
            signature: signature.to_string(),
            destination: format!("dest-{signature}"),
            lamports,
            observed_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn length_never_exceeds_capacity() {
        let mut state = PersistentState::default();
        for i in 0..10 {
            push_outflow(&mut state, record(&format!("sig{i}"), 1), 3);
            assert!(state.window.len() <= 3);
        }
        // The three most recent inserts survive, newest first.
        let kept: Vec<_> = state.window.iter().map(|r| r.signature.as_str()).collect();
        assert_eq!(kept, vec!["sig9", "sig8", "sig7"]);
    }

    #[test]
    fn alert_key_is_order_sensitive() {
        let a = vec![record("s1", 1), record("s2", 1)];
        let b = vec![record("s2", 1), record("s1", 1)];

        assert_eq!(alert_key(&a), "s1|s2");
        assert_ne!(alert_key(&a), alert_key(&b));
        assert_eq!(alert_key(&a), alert_key(&a.clone()));
    }

    #[test]
    fn no_verdict_while_filling() {
        let classifier = Classifier::new(0, u64::MAX, ScalePolicy::Truncate);
        let window = vec![record("s1", 1), record("s2", 1)];
        assert!(evaluate(&window, &classifier, 3).is_none());
    }

    #[test]
    fn verdict_counts_each_axis_separately() {
        let classifier = Classifier::new(
            LAMPORTS_PER_SOL / 10, // 0.1 SOL
            20 * LAMPORTS_PER_SOL,
            ScalePolicy::Truncate,
        );
        let window = vec![
            record("s1", 1_234_500_000),  // in range + five digits
            record("s2", 50_000_000),     // five digits, below MIN
            record("s3", 10_000_000_000), // in range, six digits
        ];

        let verdict = evaluate(&window, &classifier, 3).expect("full window");
        assert_eq!(verdict.match_count, 1);
        assert_eq!(verdict.in_range_count, 2);
        assert_eq!(verdict.digit_match_count, 2);
        assert_eq!(verdict.distinct_destinations, 3);
        assert_eq!(verdict.key, "s1|s2|s3");
    }
}
