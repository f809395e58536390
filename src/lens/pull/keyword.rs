use std::collections::HashMap;
use std::hash::Hash;

use eframe::egui::Vec2;

use super::{
    FocusLens, NodeClass, PullGraph, PullLimits, PullRecord, PullState, compute_pull_state,
};
use crate::lens::zones::ViewportZones;

/// Keyword ids resolved to dense slots once, so per-frame pulls do not hash.
#[derive(Clone, Debug, Default)]
pub struct KeywordIndex<K> {
    ids: Vec<K>,
    slots: HashMap<K, usize>,
    adjacency: Vec<Vec<usize>>,
}

impl<K: Clone + Eq + Hash> KeywordIndex<K> {
    /// Builds the index from ordered ids and an id-keyed neighbour map.
    /// Unknown neighbours and self loops are ignored; ids without an entry
    /// have no neighbours. Duplicate ids keep their first slot.
    pub fn new(ids: impl IntoIterator<Item = K>, neighbours: &HashMap<K, Vec<K>>) -> Self {
        let mut index = Self {
            ids: Vec::new(),
            slots: HashMap::new(),
            adjacency: Vec::new(),
        };
        for id in ids {
            if index.slots.contains_key(&id) {
                continue;
            }
            index.slots.insert(id.clone(), index.ids.len());
            index.ids.push(id);
        }

        index.adjacency = index
            .ids
            .iter()
            .enumerate()
            .map(|(slot, id)| {
                let mut resolved = Vec::new();
                for neighbour in neighbours.get(id).map(Vec::as_slice).unwrap_or_default() {
                    if let Some(&other) = index.slots.get(neighbour)
                        && other != slot
                        && !resolved.contains(&other)
                    {
                        resolved.push(other);
                    }
                }
                resolved
            })
            .collect();
        index
    }

    /// Index over ids whose adjacency is already expressed in slots.
    pub fn from_slots(ids: Vec<K>, adjacency: Vec<Vec<usize>>) -> Self {
        let count = ids.len();
        let slots = ids
            .iter()
            .enumerate()
            .map(|(slot, id)| (id.clone(), slot))
            .collect();
        let adjacency = (0..count)
            .map(|slot| {
                adjacency
                    .get(slot)
                    .map(|neighbours| {
                        neighbours
                            .iter()
                            .copied()
                            .filter(|&other| other < count && other != slot)
                            .collect()
                    })
                    .unwrap_or_default()
            })
            .collect();
        Self {
            ids,
            slots,
            adjacency,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn slot(&self, id: &K) -> Option<usize> {
        self.slots.get(id).copied()
    }

    pub fn id(&self, slot: usize) -> Option<&K> {
        self.ids.get(slot)
    }

    pub fn ids(&self) -> &[K] {
        &self.ids
    }

    pub fn neighbours(&self, slot: usize) -> &[usize] {
        self.adjacency
            .get(slot)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Pull pass with positions looked up by id.
    pub fn pull<P>(
        &self,
        position: P,
        zones: &ViewportZones,
        lens: Option<FocusLens<'_>>,
        limits: PullLimits,
    ) -> KeyedPullState<'_, K>
    where
        P: Fn(&K) -> Option<Vec2>,
    {
        let frame = KeywordFrame {
            index: self,
            position: |slot: usize| self.ids.get(slot).and_then(&position),
        };
        KeyedPullState {
            index: self,
            state: compute_pull_state(&frame, zones, lens, limits),
        }
    }

    /// Pull pass with positions stored in slot order.
    pub fn pull_slots(
        &self,
        positions: &[Vec2],
        zones: &ViewportZones,
        lens: Option<FocusLens<'_>>,
        limits: PullLimits,
    ) -> KeyedPullState<'_, K> {
        let frame = KeywordFrame {
            index: self,
            position: |slot: usize| positions.get(slot).copied(),
        };
        KeyedPullState {
            index: self,
            state: compute_pull_state(&frame, zones, lens, limits),
        }
    }
}

struct KeywordFrame<'a, K, F> {
    index: &'a KeywordIndex<K>,
    position: F,
}

impl<K, F> PullGraph for KeywordFrame<'_, K, F>
where
    F: Fn(usize) -> Option<Vec2>,
{
    fn node_count(&self) -> usize {
        self.index.ids.len()
    }

    fn position(&self, slot: usize) -> Option<Vec2> {
        (self.position)(slot)
    }

    fn adjacency(&self, slot: usize) -> &[usize] {
        self.index
            .adjacency
            .get(slot)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Pull result addressed by keyword id.
#[derive(Debug)]
pub struct KeyedPullState<'a, K> {
    index: &'a KeywordIndex<K>,
    state: PullState,
}

impl<'a, K: Clone + Eq + Hash> KeyedPullState<'a, K> {
    pub fn dense(&self) -> &PullState {
        &self.state
    }

    pub fn into_dense(self) -> PullState {
        self.state
    }

    pub fn class(&self, id: &K) -> NodeClass {
        self.index
            .slot(id)
            .map(|slot| self.state.class(slot))
            .unwrap_or_default()
    }

    pub fn record(&self, id: &K) -> Option<&PullRecord> {
        self.index.slot(id).and_then(|slot| self.state.record(slot))
    }

    pub fn is_primary(&self, id: &K) -> bool {
        self.index
            .slot(id)
            .is_some_and(|slot| self.state.is_primary(slot))
    }

    pub fn is_pulled(&self, id: &K) -> bool {
        self.index
            .slot(id)
            .is_some_and(|slot| self.state.is_pulled(slot))
    }

    /// Ids of the primary nodes a pulled node stands in for.
    pub fn anchors(&self, id: &K) -> Vec<&'a K> {
        let index = self.index;
        self.record(id)
            .map(|record| {
                record
                    .anchors
                    .iter()
                    .filter_map(|&slot| index.id(slot))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn primary_ids(&self) -> impl Iterator<Item = &'a K> + '_ {
        let index = self.index;
        self.state
            .primary_slots()
            .iter()
            .filter_map(move |&slot| index.id(slot))
    }

    pub fn pulled(&self) -> impl Iterator<Item = (&'a K, &PullRecord)> + '_ {
        let index = self.index;
        self.state
            .pulled_slots()
            .filter_map(move |(slot, record)| index.id(slot).map(|id| (id, record)))
    }

    pub fn suppresses_edge(&self, from: &K, to: &K) -> bool {
        match (self.index.slot(from), self.index.slot(to)) {
            (Some(from), Some(to)) => self.state.suppresses_edge(from, to),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::lens::pull::tests::{limits, square_zones};

    fn index() -> KeywordIndex<String> {
        let mut neighbours = HashMap::new();
        neighbours.insert(
            "rust".to_owned(),
            vec!["cargo".to_owned(), "rust".to_owned(), "missing".to_owned()],
        );
        neighbours.insert("cargo".to_owned(), vec!["rust".to_owned(), "crates".to_owned()]);
        neighbours.insert("crates".to_owned(), vec!["cargo".to_owned()]);
        KeywordIndex::new(
            ["rust", "cargo", "crates", "rust", "lonely"].map(str::to_owned),
            &neighbours,
        )
    }

    #[test]
    fn index_resolves_ids_once() {
        let index = index();
        assert_eq!(index.len(), 4);
        assert_eq!(index.slot(&"crates".to_owned()), Some(2));
        assert_eq!(index.neighbours(0), &[1]);
        assert_eq!(index.neighbours(1), &[0, 2]);
        assert!(index.neighbours(3).is_empty());
    }

    #[test]
    fn keyed_pull_reports_by_id() {
        let index = index();
        let mut positions = HashMap::new();
        positions.insert("rust".to_owned(), vec2(0.0, 0.0));
        positions.insert("cargo".to_owned(), vec2(480.0, 10.0));
        positions.insert("crates".to_owned(), vec2(9_000.0, 0.0));

        let zones = square_zones();
        let pulled = index.pull(|id| positions.get(id).copied(), &zones, None, limits(8));

        let rust = "rust".to_owned();
        let cargo = "cargo".to_owned();
        let crates = "crates".to_owned();
        assert!(pulled.is_primary(&rust));
        assert_eq!(pulled.class(&cargo), NodeClass::CliffPulled);
        assert_eq!(pulled.anchors(&cargo), vec![&rust]);
        assert_eq!(pulled.class(&crates), NodeClass::Hidden);
        assert_eq!(pulled.class(&"lonely".to_owned()), NodeClass::Hidden);
        assert_eq!(pulled.primary_ids().collect::<Vec<_>>(), vec![&rust]);
        assert_eq!(pulled.pulled().count(), 1);
    }

    #[test]
    fn slot_positions_match_keyed_positions() {
        let index = KeywordIndex::from_slots(vec![10u32, 20, 30], vec![vec![1, 2, 7], vec![0], vec![0, 2]]);
        assert_eq!(index.neighbours(0), &[1, 2]);
        assert!(index.neighbours(2).contains(&0));
        assert!(!index.neighbours(2).contains(&2));

        let zones = square_zones();
        let positions = [vec2(0.0, 0.0), vec2(0.0, 9_000.0), vec2(-9_000.0, 0.0)];
        let by_slot = index.pull_slots(&positions, &zones, None, limits(1));
        let by_id = index.pull(
            |id| index.slot(id).map(|slot| positions[slot]),
            &zones,
            None,
            limits(1),
        );
        for id in [10, 20, 30] {
            assert_eq!(by_slot.class(&id), by_id.class(&id));
        }
        assert_eq!(by_slot.class(&20), NodeClass::OffscreenPulled);
        assert_eq!(by_slot.class(&30), NodeClass::Hidden);
    }
}
