//! In-memory state carried between ticks. Transient by design — spec.md's
//! Non-goals rule out persistence across restarts.

use std::collections::HashMap;

/// What a confirmed prevote bound, kept so the paired reveal can read its
/// price and salt from memory rather than from the (possibly different)
/// current sample — this is invariant 2 in spec.md §3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrevoteRecord {
    pub committed_price: String,
    pub salt: String,
    pub prevote_period: u64,
}

/// `{ prevote_memory, last_prevote_period }` from spec.md §4.E.
#[derive(Debug, Clone, Default)]
pub struct VoteLoopState {
    pub prevote_memory: HashMap<String, PrevoteRecord>,
    pub last_prevote_period: Option<u64>,
}

impl VoteLoopState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A reveal for `currency` is eligible only if memory holds a prevote
    /// exactly one period behind `current_period` (spec.md §3 invariant 1).
    pub fn reveal_eligible(&self, currency: &str, current_period: u64) -> Option<&PrevoteRecord> {
        let record = self.prevote_memory.get(currency)?;
        (current_period.checked_sub(record.prevote_period) == Some(1)).then_some(record)
    }

    /// Overwrites memory for every currency just prevoted, keyed by the
    /// *included* period, never the sampled one (spec.md §4.E step 10 and
    /// §9's resolved open question).
    pub fn record_confirmed_prevotes(
        &mut self,
        prevotes: impl IntoIterator<Item = (String, PrevoteRecord)>,
        period_of_inclusion: u64,
    ) {
        for (currency, record) in prevotes {
            self.prevote_memory.insert(currency, record);
        }
        self.last_prevote_period = Some(period_of_inclusion);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reveal_eligible_only_exactly_one_period_behind() {
        let mut state = VoteLoopState::new();
        state.prevote_memory.insert(
            "krw".to_string(),
            PrevoteRecord {
                committed_price: "123.45".into(),
                salt: "abcd".into(),
                prevote_period: 19,
            },
        );
        assert!(state.reveal_eligible("krw", 20).is_some());
        assert!(state.reveal_eligible("krw", 21).is_none());
        assert!(state.reveal_eligible("krw", 19).is_none());
        assert!(state.reveal_eligible("usd", 20).is_none());
    }

    #[test]
    fn record_confirmed_prevotes_uses_inclusion_period_not_sampled() {
        let mut state = VoteLoopState::new();
        state.record_confirmed_prevotes(
            [(
                "krw".to_string(),
                PrevoteRecord {
                    committed_price: "1".into(),
                    salt: "aaaa".into(),
                    prevote_period: 31,
                },
            )],
            31,
        );
        assert_eq!(state.last_prevote_period, Some(31));
        assert!(state.reveal_eligible("krw", 32).is_some());
        assert!(state.reveal_eligible("krw", 31).is_none());
    }
}
