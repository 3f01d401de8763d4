// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Pledge Shortfall Simulation Suite - Deferred Event Table

use std::collections::BTreeMap;

use crate::consts::ChainEpoch;

/// Obligations scheduled for future epochs.
///
/// Entries are merged per epoch through [`entry`](Self::entry) and removed
/// when taken, so each scheduled event is applied at most once. Draining
/// yields entries in ascending epoch order.
#[derive(Debug, Clone)]
pub struct DeferredTable<T> {
    entries: BTreeMap<ChainEpoch, T>,
}

impl<T> Default for DeferredTable<T> {
    fn default() -> Self {
        Self { entries: BTreeMap::new() }
    }
}

impl<T: Default> DeferredTable<T> {
    /// Mutable slot for `epoch`, created empty if absent.
    pub fn entry(&mut self, epoch: ChainEpoch) -> &mut T {
        self.entries.entry(epoch).or_default()
    }
}

impl<T> DeferredTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns every entry keyed at or before `epoch`, oldest first.
    pub fn drain_through(&mut self, epoch: ChainEpoch) -> Vec<(ChainEpoch, T)> {
        let later = match epoch.checked_add(1) {
            Some(next) => self.entries.split_off(&next),
            None => BTreeMap::new(),
        };
        let due = std::mem::replace(&mut self.entries, later);
        due.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
