// src/classifier.rs
//! Numeric pattern classification for outflow amounts.
//!
//! An amount matches when it falls inside the configured SOL range and its
//! 4-decimal fixed-point representation has at most five significant digits
//! (counting an implicit leading zero for sub-1 SOL amounts): scaled to
//! 1e-4 SOL ticks, the value must not exceed 99_999.

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Lamports per 1e-4 SOL, the resolution of the digit-pattern rule.
pub const LAMPORTS_PER_TICK: u64 = 100_000;

const MAX_FIVE_DIGIT_TICKS: u64 = 99_999;

/// How the 4-decimal scaling treats lamports finer than 1e-4 SOL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalePolicy {
    /// Floor to 4 decimals; sub-tick remainder is discarded.
    Truncate,
    /// Reject unless the amount is an exact multiple of 1e-4 SOL.
    Exact,
}

/// Outcome of classifying a single amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub in_range: bool,
    pub digit_match: bool,
    /// Canonical 4-decimal SOL string, used verbatim in alert text.
    pub formatted: String,
}

impl Classification {
    pub fn is_match(&self) -> bool {
        self.in_range && self.digit_match
    }
}

#[derive(Debug, Clone)]
pub struct Classifier {
    min_lamports: u64,
    max_lamports: u64,
    policy: ScalePolicy,
}

impl Classifier {
    pub fn new(min_lamports: u64, max_lamports: u64, policy: ScalePolicy) -> Self {
        Self {
            min_lamports,
            max_lamports,
            policy,
        }
    }

    pub fn classify(&self, lamports: u64) -> Classification {
        let ticks = lamports / LAMPORTS_PER_TICK;
        let remainder = lamports % LAMPORTS_PER_TICK;

        let in_range = lamports >= self.min_lamports && lamports <= self.max_lamports;
        let digit_match = ticks <= MAX_FIVE_DIGIT_TICKS
            && (self.policy == ScalePolicy::Truncate || remainder == 0);

        Classification {
            in_range,
            digit_match,
            formatted: format_ticks(ticks),
        }
    }
}

/// Render a tick count (1e-4 SOL units) as a `D.DDDD` SOL string.
fn format_ticks(ticks: u64) -> String {
    format!("{}.{:04}", ticks / 10_000, ticks % 10_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn truncating(min_sol: u64, max_sol: u64) -> Classifier {
        Classifier::new(
            min_sol * LAMPORTS_PER_SOL,
            max_sol * LAMPORTS_PER_SOL,
            ScalePolicy::Truncate,
        )
    }

    #[test]
    fn five_digit_upper_boundary() {
        let classifier = truncating(0, 100);

        // 9.9999 SOL scales to 99999 ticks: last matching value.
        let hit = classifier.classify(9_999_900_000);
        assert!(hit.digit_match);
        assert_eq!(hit.formatted, "9.9999");

        // 10.0000 SOL scales to 100000 ticks: one past the boundary.
        let miss = classifier.classify(10_000_000_000);
        assert!(!miss.digit_match);
        assert_eq!(miss.formatted, "10.0000");
    }

    #[test]
    fn truncate_discards_sub_tick_remainder() {
        let classifier = truncating(0, 100);
        // 1.23455 SOL floors to 1.2345 and still matches.
        let c = classifier.classify(1_234_550_000);
        assert!(c.digit_match);
        assert_eq!(c.formatted, "1.2345");
    }

    #[test]
    fn exact_policy_rejects_sub_tick_remainder() {
        let classifier = Classifier::new(0, 100 * LAMPORTS_PER_SOL, ScalePolicy::Exact);

        assert!(!classifier.classify(1_234_550_000).digit_match);

        let exact = classifier.classify(1_234_500_000);
        assert!(exact.digit_match);
        assert_eq!(exact.formatted, "1.2345");
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let classifier = Classifier::new(100_000_000, 20 * LAMPORTS_PER_SOL, ScalePolicy::Truncate);

        assert!(classifier.classify(100_000_000).in_range); // exactly MIN
        assert!(classifier.classify(20 * LAMPORTS_PER_SOL).in_range); // exactly MAX
        assert!(!classifier.classify(99_999_999).in_range);
        assert!(!classifier.classify(20 * LAMPORTS_PER_SOL + 1).in_range);
    }

    #[test]
    fn sub_one_sol_amounts_format_with_leading_zero() {
        let classifier = truncating(0, 100);
        let c = classifier.classify(50_000_000); // 0.05 SOL
        assert_eq!(c.formatted, "0.0500");
        assert!(c.digit_match);
    }

    #[test]
    fn match_requires_both_axes() {
        let classifier = Classifier::new(100_000_000, 20 * LAMPORTS_PER_SOL, ScalePolicy::Truncate);

        // In range but six significant digits.
        assert!(!classifier.classify(10_000_000_000).is_match());
        // Five digits but below MIN.
        assert!(!classifier.classify(50_000_000).is_match());
        // Both.
        assert!(classifier.classify(1_234_500_000).is_match());
    }
}
