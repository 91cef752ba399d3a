//! Named counter accumulators tracking mean and variance.
//!
//! Search engines, the abstraction builder and the path smoother all
//! report into a [`StatsCollection`]; drivers merge per-call collections
//! into long-running ones and print a summary at the end.

use std::collections::BTreeMap;
use std::fmt;

/// Mean / variance tracker for one variable.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Statistics {
    count: f64,
    sum: f64,
    sum_sq: f64,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observation.
    pub fn add(&mut self, value: f64) {
        self.count += 1.0;
        self.sum += value;
        self.sum_sq += value * value;
    }

    /// Fold another tracker's observations into this one.
    pub fn merge(&mut self, other: &Statistics) {
        self.count += other.count;
        self.sum += other.sum;
        self.sum_sq += other.sum_sq;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn count(&self) -> f64 {
        self.count
    }

    /// Mean of the observations (0 if none were recorded).
    pub fn mean(&self) -> f64 {
        if self.count == 0.0 {
            return 0.0;
        }
        self.sum / self.count
    }

    pub fn variance(&self) -> f64 {
        if self.count == 0.0 {
            return 0.0;
        }
        let mean = self.mean();
        (self.sum_sq / self.count - mean * mean).max(0.0)
    }

    pub fn deviation(&self) -> f64 {
        self.variance().sqrt()
    }
}

/// A set of named [`Statistics`] variables.
///
/// The variable set is fixed at creation time; looking up or merging an
/// unknown name is a caller bug and panics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsCollection {
    entries: BTreeMap<&'static str, Statistics>,
}

impl StatsCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection with the given variable names.
    pub fn with_names(names: &[&'static str]) -> Self {
        let mut collection = Self::new();
        for name in names {
            collection.create(name);
        }
        collection
    }

    /// Register a variable.
    pub fn create(&mut self, name: &'static str) {
        self.entries.insert(name, Statistics::new());
    }

    /// Access a variable by name. Panics on unknown names.
    pub fn get(&self, name: &str) -> &Statistics {
        self.entries
            .get(name)
            .unwrap_or_else(|| panic!("unknown statistics entry {name:?}"))
    }

    /// Mutable access to a variable by name. Panics on unknown names.
    pub fn get_mut(&mut self, name: &str) -> &mut Statistics {
        self.entries
            .get_mut(name)
            .unwrap_or_else(|| panic!("unknown statistics entry {name:?}"))
    }

    /// Merge another collection with the same variable set.
    ///
    /// Panics if the variable sets differ — merging unrelated
    /// collections is a bug, not a recoverable condition.
    pub fn merge(&mut self, other: &StatsCollection) {
        assert!(
            self.entries.len() == other.entries.len()
                && self.entries.keys().eq(other.entries.keys()),
            "merging incompatible statistics collections"
        );
        for (name, stats) in &mut self.entries {
            stats.merge(&other.entries[name]);
        }
    }

    /// Reset every variable, keeping the variable set.
    pub fn clear(&mut self) {
        for stats in self.entries.values_mut() {
            stats.clear();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Statistics)> {
        self.entries.iter().map(|(name, stats)| (*name, stats))
    }
}

impl fmt::Display for StatsCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, stats) in &self.entries {
            writeln!(
                f,
                "{name}: mean {:.3} dev {:.3} count {}",
                stats.mean(),
                stats.deviation(),
                stats.count()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_variance() {
        let mut s = Statistics::new();
        for v in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            s.add(v);
        }
        assert_eq!(s.count(), 8.0);
        assert!((s.mean() - 5.0).abs() < 1e-9);
        assert!((s.variance() - 4.0).abs() < 1e-9);
        assert!((s.deviation() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn empty_statistics_are_zero() {
        let s = Statistics::new();
        assert_eq!(s.mean(), 0.0);
        assert_eq!(s.variance(), 0.0);
    }

    #[test]
    fn merge_equals_combined_stream() {
        let mut a = Statistics::new();
        let mut b = Statistics::new();
        let mut all = Statistics::new();
        for v in [1.0, 2.0, 3.0] {
            a.add(v);
            all.add(v);
        }
        for v in [10.0, 20.0] {
            b.add(v);
            all.add(v);
        }
        a.merge(&b);
        assert_eq!(a, all);
    }

    #[test]
    fn collection_merge() {
        let mut a = StatsCollection::with_names(&["nodes", "edges"]);
        let mut b = StatsCollection::with_names(&["nodes", "edges"]);
        a.get_mut("nodes").add(1.0);
        b.get_mut("nodes").add(3.0);
        a.merge(&b);
        assert_eq!(a.get("nodes").count(), 2.0);
        assert!((a.get("nodes").mean() - 2.0).abs() < 1e-9);
    }

    #[test]
    #[should_panic(expected = "incompatible statistics")]
    fn merge_mismatched_names_panics() {
        let mut a = StatsCollection::with_names(&["nodes"]);
        let b = StatsCollection::with_names(&["edges"]);
        a.merge(&b);
    }

    #[test]
    #[should_panic(expected = "unknown statistics entry")]
    fn unknown_entry_panics() {
        let c = StatsCollection::with_names(&["nodes"]);
        c.get("edges");
    }
}
