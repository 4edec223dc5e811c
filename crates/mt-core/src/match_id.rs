//! Per-rule match identifiers.
//!
//! A match id correlates a scan-time recipe with the rows the external tool
//! reports for it. Ids have the form `<rule_id>-NNN`, counting from `001`.

use parking_lot::Mutex;

use crate::error::CoreError;
use crate::hash::{FxHashMap, fx_hash_map};

/// Highest sequence number a rule may use.
pub const MAX_SEQUENCE: u32 = 999;

/// Thread-safe generator of `<rule_id>-NNN` identifiers.
///
/// One generator is constructed per run and shared by reference between the
/// scan and transform phases.
///
/// # Examples
///
/// ```
/// use mt_core::MatchIdGenerator;
///
/// let ids = MatchIdGenerator::new();
/// assert_eq!(ids.generate("spring-boot-1").unwrap(), "spring-boot-1-001");
/// assert_eq!(ids.generate("spring-boot-1").unwrap(), "spring-boot-1-002");
/// assert_eq!(ids.generate("quarkus-1").unwrap(), "quarkus-1-001");
/// ```
#[derive(Debug, Default)]
pub struct MatchIdGenerator {
    counters: Mutex<FxHashMap<String, u32>>,
}

impl MatchIdGenerator {
    /// Creates a generator with every counter at zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(fx_hash_map()),
        }
    }

    /// Returns the next id for `rule_id`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SequenceExhausted`] once [`MAX_SEQUENCE`] ids have
    /// been handed out for the rule. The counter is left at its ceiling.
    pub fn generate(&self, rule_id: &str) -> Result<String, CoreError> {
        let mut counters = self.counters.lock();
        let counter = counters.entry(rule_id.to_owned()).or_insert(0);
        if *counter >= MAX_SEQUENCE {
            return Err(CoreError::SequenceExhausted {
                rule_id: rule_id.to_owned(),
                max: MAX_SEQUENCE,
            });
        }
        *counter += 1;
        Ok(format!("{rule_id}-{:03}", *counter))
    }

    /// Returns the last sequence number handed out for `rule_id`, or 0.
    #[must_use]
    pub fn current(&self, rule_id: &str) -> u32 {
        self.counters.lock().get(rule_id).copied().unwrap_or(0)
    }

    /// Resets the counter of a single rule.
    pub fn reset(&self, rule_id: &str) {
        self.counters.lock().remove(rule_id);
    }

    /// Resets every counter.
    pub fn reset_all(&self) {
        self.counters.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::hash::fx_hash_set;

    #[test]
    fn test_sequence_runs_to_ceiling() {
        let ids = MatchIdGenerator::new();
        let mut last = String::new();
        for n in 1..=MAX_SEQUENCE {
            let id = ids.generate("r").unwrap();
            assert_eq!(id, format!("r-{n:03}"));
            assert!(id > last);
            last = id;
        }
        assert_eq!(last, "r-999");

        let err = ids.generate("r").unwrap_err();
        assert_eq!(
            err,
            CoreError::SequenceExhausted {
                rule_id: "r".to_owned(),
                max: MAX_SEQUENCE
            }
        );
        assert_eq!(ids.current("r"), MAX_SEQUENCE);
    }

    #[test]
    fn test_counters_are_per_rule() {
        let ids = MatchIdGenerator::new();
        ids.generate("a").unwrap();
        ids.generate("a").unwrap();
        assert_eq!(ids.generate("b").unwrap(), "b-001");
        assert_eq!(ids.current("a"), 2);
    }

    #[test]
    fn test_reset() {
        let ids = MatchIdGenerator::new();
        ids.generate("a").unwrap();
        ids.generate("b").unwrap();

        ids.reset("a");
        assert_eq!(ids.generate("a").unwrap(), "a-001");
        assert_eq!(ids.generate("b").unwrap(), "b-002");

        ids.reset_all();
        assert_eq!(ids.current("a"), 0);
        assert_eq!(ids.generate("b").unwrap(), "b-001");
    }

    #[test]
    fn test_concurrent_generation_is_unique() {
        let ids = Arc::new(MatchIdGenerator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ids = Arc::clone(&ids);
                thread::spawn(move || {
                    (0..100)
                        .map(|_| ids.generate("shared").unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = fx_hash_set();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id));
            }
        }
        assert_eq!(seen.len(), 800);
        assert_eq!(ids.current("shared"), 800);
    }
}
