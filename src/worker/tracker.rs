//! Incrementally maintained set of deliveries the worker may advance.

use super::sampler::Sampler;
use crate::delivery_actor::{StoreEvent, StoreObserver};
use crate::model::DeliveryState;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Inner {
    /// Every delivery currently in the collection.
    watched: HashSet<Uuid>,
    /// Dense list of eligible deliveries with their last seen state.
    worklist: Vec<(Uuid, DeliveryState)>,
    /// Index of each worklist entry.
    positions: HashMap<Uuid, usize>,
}

impl Inner {
    fn upsert(&mut self, code: Uuid, state: DeliveryState) {
        match self.positions.get(&code) {
            Some(&i) => self.worklist[i].1 = state,
            None => {
                self.positions.insert(code, self.worklist.len());
                self.worklist.push((code, state));
            }
        }
    }

    fn evict(&mut self, code: Uuid) {
        let Some(i) = self.positions.remove(&code) else {
            return;
        };
        self.worklist.swap_remove(i);
        if let Some(&(moved, _)) = self.worklist.get(i) {
            self.positions.insert(moved, i);
        }
    }
}

/// Keeps the worklist equal to `{d in collection | d.state is auto-advanceable}`.
///
/// The tracker is a [`StoreObserver`]: the delivery actor feeds it every
/// add, remove and state change while processing the request that caused
/// it, so membership never lags behind the collection. All state sits behind
/// one mutex shared with the worker, which only ever reads through
/// [`EligibilityTracker::pick`].
#[derive(Debug, Default)]
pub struct EligibilityTracker {
    inner: Mutex<Inner>,
}

impl EligibilityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chooses one eligible delivery uniformly at random and returns it with
    /// the state it had when chosen.
    pub fn pick(&self, sampler: &mut dyn Sampler) -> Option<(Uuid, DeliveryState)> {
        let inner = self.inner.lock();
        if inner.worklist.is_empty() {
            return None;
        }
        let i = sampler.index(inner.worklist.len());
        inner.worklist.get(i).copied()
    }

    /// Number of eligible deliveries.
    pub fn len(&self) -> usize {
        self.inner.lock().worklist.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().worklist.is_empty()
    }

    pub fn contains(&self, code: Uuid) -> bool {
        self.inner.lock().positions.contains_key(&code)
    }

    /// Number of deliveries being observed; equals the collection size while attached.
    pub fn watched_count(&self) -> usize {
        self.inner.lock().watched.len()
    }

    /// Copy of the worklist, in no particular order.
    pub fn snapshot(&self) -> Vec<(Uuid, DeliveryState)> {
        self.inner.lock().worklist.clone()
    }

    /// Forgets everything.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.watched.clear();
        inner.worklist.clear();
        inner.positions.clear();
    }
}

impl StoreObserver for EligibilityTracker {
    fn on_event(&self, event: &StoreEvent) {
        let mut inner = self.inner.lock();
        match event {
            StoreEvent::Added(delivery) => {
                inner.watched.insert(delivery.code());
                if delivery.state().is_auto_advanceable() {
                    inner.upsert(delivery.code(), delivery.state());
                }
            }
            StoreEvent::Removed(delivery) => {
                inner.watched.remove(&delivery.code());
                inner.evict(delivery.code());
            }
            StoreEvent::StateChanged { code, old, new } => {
                if !inner.watched.contains(code) {
                    return;
                }
                match (old.is_auto_advanceable(), new.is_auto_advanceable()) {
                    (true, false) => inner.evict(*code),
                    // true -> true refreshes the recorded state
                    (_, true) => inner.upsert(*code, *new),
                    (false, false) => {}
                }
            }
            StoreEvent::BecameTerminal { .. } => {}
        }
    }
}
