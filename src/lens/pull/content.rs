use std::collections::HashMap;
use std::hash::Hash;

use eframe::egui::Vec2;

use super::{
    Anchoring, FocusLens, KeywordIndex, NodeClass, PullGraph, PullLimits, PullRecord, PullState,
    compute_pull_state,
};
use crate::lens::zones::ViewportZones;

/// Content nodes hang off keywords and can only be anchored by a primary
/// keyword parent.
#[derive(Clone, Debug, Default)]
pub struct ContentIndex<K> {
    ids: Vec<K>,
    slots: HashMap<K, usize>,
    parents: Vec<Vec<usize>>,
}

impl<K: Clone + Eq + Hash> ContentIndex<K> {
    /// Parents that the keyword index does not know are dropped.
    pub fn new<P>(
        contents: impl IntoIterator<Item = (K, Vec<P>)>,
        keywords: &KeywordIndex<P>,
    ) -> Self
    where
        P: Clone + Eq + Hash,
    {
        let mut index = Self {
            ids: Vec::new(),
            slots: HashMap::new(),
            parents: Vec::new(),
        };
        for (id, parent_ids) in contents {
            if index.slots.contains_key(&id) {
                continue;
            }
            let mut parents = Vec::new();
            for parent in &parent_ids {
                if let Some(slot) = keywords.slot(parent)
                    && !parents.contains(&slot)
                {
                    parents.push(slot);
                }
            }
            index.slots.insert(id.clone(), index.ids.len());
            index.ids.push(id);
            index.parents.push(parents);
        }
        index
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

    pub fn parents(&self, slot: usize) -> &[usize] {
        self.parents
            .get(slot)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Pull pass for content. `keyword_state` must come from the same frame's
    /// keyword pull over the index the parents were resolved against.
    pub fn pull<'a, P>(
        &'a self,
        position: impl Fn(usize) -> Option<Vec2>,
        keywords: &'a KeywordIndex<P>,
        keyword_state: &PullState,
        zones: &ViewportZones,
        lens: Option<FocusLens<'_>>,
        limits: PullLimits,
    ) -> ContentPullState<'a, K, P> {
        let frame = ContentFrame {
            count: self.ids.len(),
            parents: &self.parents,
            primary: keyword_state.primary_mask(),
            position,
        };
        ContentPullState {
            index: self,
            keywords,
            state: compute_pull_state(&frame, zones, lens, limits),
        }
    }
}

struct ContentFrame<'a, F> {
    count: usize,
    parents: &'a [Vec<usize>],
    primary: &'a [bool],
    position: F,
}

impl<F> PullGraph for ContentFrame<'_, F>
where
    F: Fn(usize) -> Option<Vec2>,
{
    fn node_count(&self) -> usize {
        self.count
    }

    fn position(&self, slot: usize) -> Option<Vec2> {
        (self.position)(slot)
    }

    fn adjacency(&self, _slot: usize) -> &[usize] {
        &[]
    }

    fn anchoring(&self) -> Anchoring<'_> {
        Anchoring::Parents {
            parents: self.parents,
            primary: self.primary,
        }
    }
}

#[derive(Debug)]
pub struct ContentPullState<'a, K, P> {
    index: &'a ContentIndex<K>,
    keywords: &'a KeywordIndex<P>,
    state: PullState,
}

impl<'a, K, P> ContentPullState<'a, K, P>
where
    K: Clone + Eq + Hash,
    P: Clone + Eq + Hash,
{
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

    /// Keyword ids anchoring a pulled content node.
    pub fn anchors(&self, id: &K) -> Vec<&'a P> {
        let keywords = self.keywords;
        self.record(id)
            .map(|record| {
                record
                    .anchors
                    .iter()
                    .filter_map(|&slot| keywords.id(slot))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn pulled(&self) -> impl Iterator<Item = (&'a K, &PullRecord)> + '_ {
        let index = self.index;
        self.state
            .pulled_slots()
            .filter_map(move |(slot, record)| index.id(slot).map(|id| (id, record)))
    }
}
