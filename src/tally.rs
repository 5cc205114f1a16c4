//! In-memory tally: (product, year) -> company -> complaint count.

use ahash::AHashMap;
use std::fmt;

/// One aggregation bucket. Ordered by product, then year.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    pub product: String,
    pub year: i32,
}

impl GroupKey {
    pub fn new(product: impl Into<String>, year: i32) -> Self {
        Self { product: product.into(), year }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.product, self.year)
    }
}

/// Complaint counts per normalized company within one group. Every stored count is >= 1.
#[derive(Clone, Debug, Default)]
pub struct CompanyTally {
    counts: AHashMap<String, u64>,
}

impl CompanyTally {
    fn increment(&mut self, company: String) {
        *self.counts.entry(company).or_insert(0) += 1;
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Number of companies with at least one complaint.
    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    /// Largest single-company count (0 for an empty tally).
    pub fn max_count(&self) -> u64 {
        self.counts.values().copied().max().unwrap_or(0)
    }

    pub fn get(&self, company: &str) -> Option<u64> {
        self.counts.get(company).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(c, n)| (c.as_str(), *n))
    }
}

/// All groups seen in one run, kept in first-seen order.
///
/// Groups live in a vector and a hash index points into it, so traversal order is the
/// order in which keys were first observed. Nothing is ever removed.
#[derive(Clone, Debug, Default)]
pub struct TallyStore {
    index: AHashMap<GroupKey, usize>,
    groups: Vec<(GroupKey, CompanyTally)>,
}

impl TallyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one complaint against `company` in group `key`. Call exactly once per accepted record.
    pub fn update(&mut self, key: GroupKey, company: String) {
        let slot = match self.index.get(&key) {
            Some(&i) => i,
            None => {
                let i = self.groups.len();
                self.index.insert(key.clone(), i);
                self.groups.push((key, CompanyTally::default()));
                i
            }
        };
        self.groups[slot].1.increment(company);
    }

    pub fn get(&self, key: &GroupKey) -> Option<&CompanyTally> {
        self.index.get(key).map(|&i| &self.groups[i].1)
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Groups in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&GroupKey, &CompanyTally)> {
        self.groups.iter().map(|(k, t)| (k, t))
    }

    pub fn keys(&self) -> impl Iterator<Item = &GroupKey> {
        self.groups.iter().map(|(k, _)| k)
    }

    /// Complaints counted across every group.
    pub fn total_records(&self) -> u64 {
        self.groups.iter().map(|(_, t)| t.total()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(store: &mut TallyStore, product: &str, year: i32, company: &str, times: usize) {
        for _ in 0..times {
            store.update(GroupKey::new(product, year), company.to_string());
        }
    }

    #[test]
    fn update_creates_and_accumulates() {
        let mut store = TallyStore::new();
        assert!(store.is_empty());
        add(&mut store, "mortgage", 2019, "a", 3);
        add(&mut store, "mortgage", 2019, "b", 7);
        add(&mut store, "mortgage", 2020, "a", 1);

        assert_eq!(store.len(), 2);
        let t = store.get(&GroupKey::new("mortgage", 2019)).unwrap();
        assert_eq!(t.total(), 10);
        assert_eq!(t.distinct(), 2);
        assert_eq!(t.max_count(), 7);
        assert_eq!(t.get("a"), Some(3));
        assert_eq!(t.get("c"), None);
        assert_eq!(store.total_records(), 11);
        assert!(store.get(&GroupKey::new("mortgage", 2021)).is_none());
    }

    #[test]
    fn counts_are_never_zero() {
        let mut store = TallyStore::new();
        add(&mut store, "loans", 2018, "x", 1);
        add(&mut store, "loans", 2018, "y", 2);
        for (_, tally) in store.iter() {
            assert!(tally.iter().all(|(_, n)| n >= 1));
        }
    }

    #[test]
    fn traversal_follows_first_sighting() {
        let mut store = TallyStore::new();
        add(&mut store, "loans", 2020, "x", 1);
        add(&mut store, "credit card", 2019, "x", 1);
        add(&mut store, "loans", 2020, "y", 1);
        add(&mut store, "credit card", 2020, "x", 1);
        let keys: Vec<&GroupKey> = store.keys().collect();
        assert_eq!(
            keys,
            vec![
                &GroupKey::new("loans", 2020),
                &GroupKey::new("credit card", 2019),
                &GroupKey::new("credit card", 2020),
            ]
        );
    }

    #[test]
    fn group_key_orders_by_product_then_year() {
        let mut keys = vec![GroupKey::new("loans", 2020), GroupKey::new("credit card", 2020), GroupKey::new("credit card", 2019)];
        keys.sort();
        assert_eq!(keys[0], GroupKey::new("credit card", 2019));
        assert_eq!(keys[2], GroupKey::new("loans", 2020));
        assert_eq!(keys[0].to_string(), "(credit card, 2019)");
    }
}
