//! The indexed delivery collection owned by the delivery actor.

use super::error::DeliveryError;
use super::events::{ObserverId, StoreEvent, StoreObserver};
use crate::model::{Delivery, DeliveryCreate, DeliveryState, StateChange};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

const EVENT_BUFFER: usize = 256;

/// Outcome of an optimistic commit.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// The precondition held and the new state was applied.
    Committed(StateChange),
    /// The delivery moved on since it was read; nothing was applied.
    Stale {
        expected: DeliveryState,
        actual: DeliveryState,
    },
    /// The delivery is no longer in the collection.
    Missing,
    /// The precondition held but the state machine refused the assignment.
    Rejected(DeliveryError),
}

/// Deliveries indexed by code and by sender, in insertion order.
///
/// # Invariant
/// Every code in `order` has exactly one entry in `by_code` and appears exactly
/// once in the `by_sender` list of its sender, and nothing else is indexed.
///
/// Every mutation notifies the registered [`StoreObserver`]s synchronously and
/// then publishes the same [`StoreEvent`] on a broadcast channel.
pub struct DeliveryStore {
    by_code: HashMap<Uuid, Delivery>,
    order: Vec<Uuid>,
    by_sender: HashMap<Uuid, Vec<Uuid>>,
    observers: Vec<(ObserverId, Arc<dyn StoreObserver>)>,
    next_observer: u64,
    events: broadcast::Sender<StoreEvent>,
}

impl Default for DeliveryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DeliveryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            by_code: HashMap::new(),
            order: Vec::new(),
            by_sender: HashMap::new(),
            observers: Vec::new(),
            next_observer: 1,
            events,
        }
    }

    /// Validates and inserts a brand new delivery.
    pub fn create(&mut self, params: DeliveryCreate) -> Result<Delivery, DeliveryError> {
        let delivery = Delivery::create(params)?;
        self.add(delivery.clone())?;
        Ok(delivery)
    }

    /// Inserts `delivery` into every index.
    pub fn add(&mut self, delivery: Delivery) -> Result<Uuid, DeliveryError> {
        let code = delivery.code();
        if self.by_code.contains_key(&code) {
            warn!(%code, "Duplicate delivery rejected");
            return Err(DeliveryError::DuplicateIdentity(code));
        }
        self.order.push(code);
        self.by_sender
            .entry(delivery.sender())
            .or_default()
            .push(code);
        self.by_code.insert(code, delivery.clone());
        info!(%code, size = self.by_code.len(), "Added");
        self.emit(StoreEvent::Added(delivery));
        Ok(code)
    }

    /// Removes a terminal delivery.
    ///
    /// Returns `Ok(None)` when the code is not present.
    pub fn remove(&mut self, code: Uuid) -> Result<Option<Delivery>, DeliveryError> {
        let Some(delivery) = self.by_code.get(&code) else {
            debug!(%code, "Remove of absent delivery ignored");
            return Ok(None);
        };
        if !delivery.is_terminal() {
            return Err(DeliveryError::NotTerminal {
                code,
                state: delivery.state(),
            });
        }
        let Some(delivery) = self.by_code.remove(&code) else {
            return Ok(None);
        };
        self.order.retain(|c| *c != code);
        if let Some(codes) = self.by_sender.get_mut(&delivery.sender()) {
            codes.retain(|c| *c != code);
            if codes.is_empty() {
                self.by_sender.remove(&delivery.sender());
            }
        }
        info!(%code, size = self.by_code.len(), "Removed");
        self.emit(StoreEvent::Removed(delivery.clone()));
        Ok(Some(delivery))
    }

    pub fn get(&self, code: Uuid) -> Option<&Delivery> {
        self.by_code.get(&code)
    }

    /// Deliveries of one sender, in insertion order.
    pub fn by_sender(&self, sender: Uuid) -> impl Iterator<Item = &Delivery> + '_ {
        self.by_sender
            .get(&sender)
            .into_iter()
            .flatten()
            .filter_map(|code| self.by_code.get(code))
    }

    /// All deliveries, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Delivery> + '_ {
        self.order.iter().filter_map(|code| self.by_code.get(code))
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    /// Unconditional assignment, subject to the delivery's own rules.
    pub fn set_state(
        &mut self,
        code: Uuid,
        state: DeliveryState,
    ) -> Result<StateChange, DeliveryError> {
        let delivery = self
            .by_code
            .get_mut(&code)
            .ok_or(DeliveryError::NotFound(code))?;
        let change = delivery.set_state(state)?;
        self.publish_change(change);
        Ok(change)
    }

    /// Moves a failed insured delivery to `RefundRequired`.
    pub fn request_refund(&mut self, code: Uuid) -> Result<StateChange, DeliveryError> {
        let delivery = self
            .by_code
            .get_mut(&code)
            .ok_or(DeliveryError::NotFound(code))?;
        if !delivery.is_insured() {
            return Err(DeliveryError::RefundNotAllowed {
                code,
                reason: "delivery is not insured",
            });
        }
        if delivery.state() != DeliveryState::Failed {
            return Err(DeliveryError::RefundNotAllowed {
                code,
                reason: "delivery has not failed",
            });
        }
        let change = delivery.set_state(DeliveryState::RefundRequired)?;
        self.publish_change(change);
        Ok(change)
    }

    /// Applies `next` only if the delivery is still in `expected`.
    pub fn commit_if_unchanged(
        &mut self,
        code: Uuid,
        expected: DeliveryState,
        next: DeliveryState,
    ) -> CommitOutcome {
        let Some(delivery) = self.by_code.get_mut(&code) else {
            return CommitOutcome::Missing;
        };
        let actual = delivery.state();
        if actual != expected {
            return CommitOutcome::Stale { expected, actual };
        }
        match delivery.set_state(next) {
            Ok(change) => {
                self.publish_change(change);
                CommitOutcome::Committed(change)
            }
            Err(e) => CommitOutcome::Rejected(e),
        }
    }

    /// Registers `observer` and replays an `Added` event for every current
    /// delivery before any later mutation can reach it.
    pub fn subscribe(&mut self, observer: Arc<dyn StoreObserver>) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        for delivery in self.iter() {
            observer.on_event(&StoreEvent::Added(delivery.clone()));
        }
        self.observers.push((id, observer));
        debug!(observer = id.0, observers = self.observers.len(), "Subscribed");
        id
    }

    /// Returns false when `id` was not registered.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(registered, _)| *registered != id);
        let removed = self.observers.len() != before;
        debug!(observer = id.0, removed, "Unsubscribed");
        removed
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// A fresh receiver for the broadcast stream of store events.
    pub fn events(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn publish_change(&self, change: StateChange) {
        self.emit(StoreEvent::StateChanged {
            code: change.code,
            old: change.old,
            new: change.new,
        });
        if change.became_terminal {
            self.emit(StoreEvent::BecameTerminal {
                code: change.code,
                state: change.new,
            });
        }
    }

    fn emit(&self, event: StoreEvent) {
        for (_, observer) in &self.observers {
            observer.on_event(&event);
        }
        // No receivers is fine.
        let _ = self.events.send(event);
    }
}
