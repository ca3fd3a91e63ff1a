//! Latest-value KPI cache with dirty tracking

use std::collections::HashMap;

use crate::kpi::{Kpi, Snapshot};

/// Latest value per KPI name plus the names changed since the last send.
///
/// Values keep first-insertion order, which is the order of an ALL packet.
/// The dirty list keeps first-changed order and never holds duplicates.
#[derive(Debug, Default, Clone)]
pub struct KpiStore {
    values: Vec<Kpi>,
    index: HashMap<String, usize>,
    dirty: Vec<String>,
}

impl KpiStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge every KPI of a snapshot, in snapshot order
    pub fn merge(&mut self, snapshot: &Snapshot) {
        self.merge_kpis(snapshot.kpis.iter().cloned());
    }

    pub fn merge_kpis<I>(&mut self, kpis: I)
    where
        I: IntoIterator<Item = Kpi>,
    {
        for kpi in kpis {
            self.upsert(kpi);
        }
    }

    fn upsert(&mut self, kpi: Kpi) {
        if !self.dirty.iter().any(|name| *name == kpi.name) {
            self.dirty.push(kpi.name.clone());
        }

        match self.index.get(&kpi.name) {
            Some(&slot) => self.values[slot] = kpi,
            None => {
                self.index.insert(kpi.name.clone(), self.values.len());
                self.values.push(kpi);
            }
        }
    }

    /// Forget which names changed; values are untouched
    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
    }

    pub fn all(&self) -> impl Iterator<Item = &Kpi> {
        self.values.iter()
    }

    /// Dirty KPIs in dirty-list order
    pub fn dirty(&self) -> impl Iterator<Item = &Kpi> {
        self.dirty
            .iter()
            .filter_map(|name| self.index.get(name).map(|&slot| &self.values[slot]))
    }

    pub fn dirty_names(&self) -> &[String] {
        &self.dirty
    }

    pub fn has_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Kpi> {
        self.index.get(name).map(|&slot| &self.values[slot])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kpi::KpiValue;

    fn names<'a>(kpis: impl Iterator<Item = &'a Kpi>) -> Vec<&'a str> {
        kpis.map(|k| k.name.as_str()).collect()
    }

    #[test]
    fn test_repeated_name_is_not_duplicated() {
        let mut store = KpiStore::new();
        store.merge(&Snapshot::update(0.0, vec![Kpi::new("Gear", 3)]));
        store.merge(&Snapshot::update(0.1, vec![Kpi::new("Gear", 4)]));

        assert_eq!(store.get("Gear").unwrap().value, KpiValue::Int(4));
        assert_eq!(store.dirty_names(), ["Gear".to_string()]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_dirty_keeps_first_changed_order() {
        let mut store = KpiStore::new();
        store.merge(&Snapshot::update(0.0, vec![Kpi::new("A", 1), Kpi::new("B", 1)]));
        store.clear_dirty();

        store.merge(&Snapshot::update(0.1, vec![Kpi::new("C", 1), Kpi::new("A", 2)]));
        store.merge(&Snapshot::update(0.2, vec![Kpi::new("C", 2), Kpi::new("B", 2)]));

        assert_eq!(store.dirty_names(), ["C", "A", "B"].map(String::from));
        assert_eq!(names(store.dirty()), vec!["C", "A", "B"]);
        // Mapping order stays first-insertion order
        assert_eq!(names(store.all()), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_batching_does_not_change_values() {
        let kpis = vec![
            Kpi::new("A", 1),
            Kpi::new("B", 1),
            Kpi::new("A", 2),
            Kpi::with_unit("C", "km/h", 3.5),
            Kpi::new("B", 7),
        ];

        let mut one_batch = KpiStore::new();
        one_batch.merge(&Snapshot::update(0.0, kpis.clone()));

        let mut many_batches = KpiStore::new();
        for kpi in &kpis {
            many_batches.merge(&Snapshot::update(0.0, vec![kpi.clone()]));
        }

        let a: Vec<&Kpi> = one_batch.all().collect();
        let b: Vec<&Kpi> = many_batches.all().collect();
        assert_eq!(a, b);
        assert_eq!(one_batch.dirty_names(), many_batches.dirty_names());
        assert_eq!(one_batch.get("B").unwrap().value, KpiValue::Int(7));
    }

    #[test]
    fn test_clear_dirty_is_idempotent() {
        let mut store = KpiStore::new();
        store.merge_kpis(vec![Kpi::new("RPM", 3000), Kpi::new("Speed", 60)]);

        store.clear_dirty();
        assert!(!store.has_dirty());
        store.clear_dirty();
        assert!(!store.has_dirty());
        assert_eq!(store.dirty().count(), 0);

        assert_eq!(names(store.all()), vec!["RPM", "Speed"]);
    }

    #[test]
    fn test_every_dirty_name_has_a_value() {
        let mut store = KpiStore::new();
        store.merge_kpis(vec![Kpi::new("X", 1), Kpi::new("Y", 2), Kpi::new("X", 3)]);

        for name in store.dirty_names() {
            assert!(store.get(name).is_some());
        }
        assert_eq!(store.dirty().count(), store.dirty_names().len());
    }
}
