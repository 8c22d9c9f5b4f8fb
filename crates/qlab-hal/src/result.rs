//! Execution results.
//!
//! Bitstrings follow the usual quantum-SDK convention: the highest classical
//! bit is the leftmost character, so clbit 0 is the last character of the
//! string.

use num_complex::Complex64;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Measurement counts keyed by bitstring.
///
/// Counts keep the order in which outcomes were first observed. Iteration,
/// [`Counts::nth`] and tie-breaking in [`Counts::least_frequent`] all follow
/// that order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<(String, u64)>", into = "Vec<(String, u64)>")]
pub struct Counts {
    entries: Vec<(String, u64)>,
    index: FxHashMap<String, usize>,
}

impl Counts {
    /// Create empty counts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build counts from `(bitstring, count)` pairs, keeping their order.
    pub fn from_pairs<K: Into<String>>(pairs: impl IntoIterator<Item = (K, u64)>) -> Self {
        let mut counts = Self::new();
        for (bitstring, count) in pairs {
            counts.insert(bitstring, count);
        }
        counts
    }

    /// Add `count` occurrences of `bitstring`.
    pub fn insert(&mut self, bitstring: impl Into<String>, count: u64) {
        let bitstring = bitstring.into();
        if let Some(&i) = self.index.get(&bitstring) {
            self.entries[i].1 += count;
        } else {
            self.index.insert(bitstring.clone(), self.entries.len());
            self.entries.push((bitstring, count));
        }
    }

    /// Record a single observation.
    pub fn record(&mut self, bitstring: impl Into<String>) {
        self.insert(bitstring, 1);
    }

    /// Occurrences of `bitstring` (zero if never observed).
    pub fn get(&self, bitstring: &str) -> u64 {
        self.index
            .get(bitstring)
            .map_or(0, |&i| self.entries[i].1)
    }

    /// Iterate in first-observation order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Observed bitstrings in first-observation order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// The `index`-th observed outcome (0-based).
    pub fn nth(&self, index: usize) -> Option<(&str, u64)> {
        self.entries.get(index).map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of distinct outcomes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was observed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all counts.
    pub fn total_shots(&self) -> u64 {
        self.entries.iter().map(|(_, v)| v).sum()
    }

    /// Entries sorted by count, descending. Equal counts keep observation order.
    pub fn sorted(&self) -> Vec<(&str, u64)> {
        let mut sorted: Vec<_> = self.iter().collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1));
        sorted
    }

    /// Outcome with the highest count; the first observed wins ties.
    pub fn most_frequent(&self) -> Option<(&str, u64)> {
        self.iter()
            .fold(None, |best: Option<(&str, u64)>, cur| match best {
                Some(b) if b.1 >= cur.1 => Some(b),
                _ => Some(cur),
            })
    }

    /// Outcome with the lowest count; the first observed wins ties.
    pub fn least_frequent(&self) -> Option<(&str, u64)> {
        self.iter()
            .fold(None, |best: Option<(&str, u64)>, cur| match best {
                Some(b) if b.1 <= cur.1 => Some(b),
                _ => Some(cur),
            })
    }

    /// Counts restricted to the given classical bits.
    ///
    /// The marginal bitstring lists the selected bits highest-first, using the
    /// same right-to-left bit numbering as the full bitstrings. Indices beyond
    /// a bitstring's width read as `0`.
    pub fn marginal(&self, clbits: &[usize]) -> Counts {
        let mut selected: Vec<usize> = clbits.to_vec();
        selected.sort_unstable();
        selected.dedup();

        let mut out = Counts::new();
        for (bitstring, count) in self.iter() {
            let bits = bitstring.as_bytes();
            let key: String = selected
                .iter()
                .rev()
                .map(|&clbit| {
                    if clbit < bits.len() {
                        bits[bits.len() - 1 - clbit] as char
                    } else {
                        '0'
                    }
                })
                .collect();
            out.insert(key, count);
        }
        out
    }

    /// Fraction of shots that produced `bitstring`.
    pub fn probability(&self, bitstring: &str) -> f64 {
        let total = self.total_shots();
        if total == 0 {
            0.0
        } else {
            self.get(bitstring) as f64 / total as f64
        }
    }
}

impl From<Vec<(String, u64)>> for Counts {
    fn from(pairs: Vec<(String, u64)>) -> Self {
        Self::from_pairs(pairs)
    }
}

impl From<Counts> for Vec<(String, u64)> {
    fn from(counts: Counts) -> Self {
        counts.entries
    }
}

/// Result of a finished job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Measurement counts.
    pub counts: Counts,
    /// Number of shots executed.
    pub shots: u32,
    /// Wall-clock execution time reported by the backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
    /// Final statevector, for backends that expose it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statevector: Option<Vec<Complex64>>,
    /// Backend specific metadata.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
}

impl ExecutionResult {
    /// Create a result from counts.
    pub fn new(counts: Counts, shots: u32) -> Self {
        Self {
            counts,
            shots,
            execution_time_ms: None,
            statevector: None,
            metadata: serde_json::Value::Null,
        }
    }

    /// Attach the execution time.
    #[must_use]
    pub fn with_execution_time(mut self, ms: u64) -> Self {
        self.execution_time_ms = Some(ms);
        self
    }

    /// Attach the final statevector.
    #[must_use]
    pub fn with_statevector(mut self, amplitudes: Vec<Complex64>) -> Self {
        self.statevector = Some(amplitudes);
        self
    }

    /// Attach metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_keep_observation_order() {
        let mut counts = Counts::new();
        counts.record("10");
        counts.record("01");
        counts.record("10");
        counts.insert("11", 4);

        let keys: Vec<_> = counts.keys().collect();
        assert_eq!(keys, ["10", "01", "11"]);
        assert_eq!(counts.get("10"), 2);
        assert_eq!(counts.get("00"), 0);
        assert_eq!(counts.nth(1), Some(("01", 1)));
        assert_eq!(counts.total_shots(), 7);
    }

    #[test]
    fn test_frequency_ties_prefer_first_observed() {
        let counts = Counts::from_pairs([("a", 2), ("b", 5), ("c", 2), ("d", 5)]);
        assert_eq!(counts.least_frequent(), Some(("a", 2)));
        assert_eq!(counts.most_frequent(), Some(("b", 5)));
        assert_eq!(counts.sorted(), vec![("b", 5), ("d", 5), ("a", 2), ("c", 2)]);
        assert!(Counts::new().least_frequent().is_none());
    }

    #[test]
    fn test_marginal_on_highest_bit() {
        // Bit 2 is the leftmost character.
        let counts = Counts::from_pairs([("101", 3), ("001", 2), ("110", 5)]);
        let marginal = counts.marginal(&[2]);
        assert_eq!(marginal.get("1"), 8);
        assert_eq!(marginal.get("0"), 2);
        assert_eq!(marginal.keys().collect::<Vec<_>>(), ["1", "0"]);

        let two = counts.marginal(&[0, 2]);
        assert_eq!(two.get("11"), 3);
        assert_eq!(two.get("01"), 2);
        assert_eq!(two.get("10"), 5);
    }

    #[test]
    fn test_probability() {
        let counts = Counts::from_pairs([("0", 1), ("1", 3)]);
        assert!((counts.probability("1") - 0.75).abs() < 1e-12);
        assert_eq!(Counts::new().probability("1"), 0.0);
    }

    #[test]
    fn test_counts_serde_preserves_order() {
        let counts = Counts::from_pairs([("11", 1), ("00", 2)]);
        let json = serde_json::to_string(&counts).unwrap();
        assert_eq!(json, r#"[["11",1],["00",2]]"#);
        let back: Counts = serde_json::from_str(&json).unwrap();
        assert_eq!(back, counts);
    }

    #[test]
    fn test_execution_result_builders() {
        let result = ExecutionResult::new(Counts::from_pairs([("0", 4)]), 4)
            .with_execution_time(12)
            .with_statevector(vec![Complex64::new(1.0, 0.0)])
            .with_metadata(serde_json::json!({"method": "statevector"}));
        assert_eq!(result.execution_time_ms, Some(12));
        assert_eq!(result.statevector.as_ref().map(Vec::len), Some(1));
        assert_eq!(result.metadata["method"], "statevector");
    }
}
