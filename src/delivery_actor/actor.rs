//! The actor task that owns the [`DeliveryStore`].

use super::error::DeliveryError;
use super::events::{ObserverId, StoreEvent, StoreObserver};
use super::store::{CommitOutcome, DeliveryStore};
use crate::framework::Response;
use crate::model::{Delivery, DeliveryCreate, DeliveryState, StateChange};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Messages understood by the delivery actor.
///
/// Every variant carries its own reply channel; the actor answers each one
/// exactly once.
pub enum DeliveryRequest {
    Create {
        params: DeliveryCreate,
        respond_to: Response<Result<Delivery, DeliveryError>>,
    },
    Add {
        delivery: Delivery,
        respond_to: Response<Result<Uuid, DeliveryError>>,
    },
    Remove {
        code: Uuid,
        respond_to: Response<Result<Option<Delivery>, DeliveryError>>,
    },
    Get {
        code: Uuid,
        respond_to: Response<Option<Delivery>>,
    },
    BySender {
        sender: Uuid,
        respond_to: Response<Vec<Delivery>>,
    },
    List {
        respond_to: Response<Vec<Delivery>>,
    },
    SetState {
        code: Uuid,
        state: DeliveryState,
        respond_to: Response<Result<StateChange, DeliveryError>>,
    },
    RequestRefund {
        code: Uuid,
        respond_to: Response<Result<StateChange, DeliveryError>>,
    },
    CommitIfUnchanged {
        code: Uuid,
        expected: DeliveryState,
        next: DeliveryState,
        respond_to: Response<CommitOutcome>,
    },
    Subscribe {
        observer: Arc<dyn StoreObserver>,
        respond_to: Response<ObserverId>,
    },
    Unsubscribe {
        id: ObserverId,
        respond_to: Response<bool>,
    },
    Events {
        respond_to: Response<broadcast::Receiver<StoreEvent>>,
    },
}

/// Server half of the delivery actor.
///
/// # Concurrency Model
/// The actor processes one request at a time, so the foreground's mutations
/// and the worker's commits can never interleave. Observers registered through
/// [`DeliveryRequest::Subscribe`] run inside this loop, under the same
/// serialization.
pub struct DeliveryActor {
    receiver: mpsc::Receiver<DeliveryRequest>,
    store: DeliveryStore,
}

impl DeliveryActor {
    pub fn new(receiver: mpsc::Receiver<DeliveryRequest>, store: DeliveryStore) -> Self {
        Self { receiver, store }
    }

    /// Runs until every client has been dropped, then hands the store back.
    pub async fn run(mut self) -> DeliveryStore {
        info!(size = self.store.len(), "Delivery actor started");

        while let Some(msg) = self.receiver.recv().await {
            self.handle(msg);
        }

        info!(size = self.store.len(), "Delivery actor shutdown");
        self.store
    }

    fn handle(&mut self, msg: DeliveryRequest) {
        match msg {
            DeliveryRequest::Create { params, respond_to } => {
                debug!(?params, "Create");
                let result = self.store.create(params);
                if let Err(e) = &result {
                    warn!(error = %e, "Create failed");
                }
                let _ = respond_to.send(result);
            }
            DeliveryRequest::Add {
                delivery,
                respond_to,
            } => {
                let _ = respond_to.send(self.store.add(delivery));
            }
            DeliveryRequest::Remove { code, respond_to } => {
                let result = self.store.remove(code);
                if let Err(e) = &result {
                    warn!(%code, error = %e, "Remove failed");
                }
                let _ = respond_to.send(result);
            }
            DeliveryRequest::Get { code, respond_to } => {
                let item = self.store.get(code).cloned();
                debug!(%code, found = item.is_some(), "Get");
                let _ = respond_to.send(item);
            }
            DeliveryRequest::BySender { sender, respond_to } => {
                let _ = respond_to.send(self.store.by_sender(sender).cloned().collect());
            }
            DeliveryRequest::List { respond_to } => {
                let _ = respond_to.send(self.store.iter().cloned().collect());
            }
            DeliveryRequest::SetState {
                code,
                state,
                respond_to,
            } => {
                let result = self.store.set_state(code, state);
                match &result {
                    Ok(change) => info!(%code, from = %change.old, to = %change.new, "State set"),
                    Err(e) => warn!(%code, error = %e, "Set state failed"),
                }
                let _ = respond_to.send(result);
            }
            DeliveryRequest::RequestRefund { code, respond_to } => {
                let result = self.store.request_refund(code);
                match &result {
                    Ok(_) => info!(%code, "Refund requested"),
                    Err(e) => warn!(%code, error = %e, "Refund refused"),
                }
                let _ = respond_to.send(result);
            }
            DeliveryRequest::CommitIfUnchanged {
                code,
                expected,
                next,
                respond_to,
            } => {
                let outcome = self.store.commit_if_unchanged(code, expected, next);
                debug!(%code, %expected, %next, ?outcome, "Commit");
                let _ = respond_to.send(outcome);
            }
            DeliveryRequest::Subscribe {
                observer,
                respond_to,
            } => {
                let _ = respond_to.send(self.store.subscribe(observer));
            }
            DeliveryRequest::Unsubscribe { id, respond_to } => {
                let _ = respond_to.send(self.store.unsubscribe(id));
            }
            DeliveryRequest::Events { respond_to } => {
                let _ = respond_to.send(self.store.events());
            }
        }
    }
}
