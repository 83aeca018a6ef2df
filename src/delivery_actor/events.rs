//! Change notifications emitted by the delivery store.

use crate::model::{Delivery, DeliveryState};
use uuid::Uuid;

/// A change to the delivery collection.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// A delivery joined the collection (or is being replayed to a new observer).
    Added(Delivery),
    /// A terminal delivery left the collection.
    Removed(Delivery),
    StateChanged {
        code: Uuid,
        old: DeliveryState,
        new: DeliveryState,
    },
    /// Fired right after the `StateChanged` that made a delivery terminal.
    BecameTerminal { code: Uuid, state: DeliveryState },
}

/// A synchronous listener invoked by the delivery actor, inside its loop.
///
/// Implementations must not block or call back into the actor.
pub trait StoreObserver: Send + Sync {
    fn on_event(&self, event: &StoreEvent);
}

/// Handle returned when registering a [`StoreObserver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub(crate) u64);
