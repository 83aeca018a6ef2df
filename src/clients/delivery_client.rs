use crate::delivery_actor::{
    CommitOutcome, DeliveryError, DeliveryRequest, ObserverId, StoreEvent, StoreObserver,
};
use crate::framework::request;
use crate::model::{Delivery, DeliveryCreate, DeliveryState, StateChange};
use crate::worker::WorkerPort;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, instrument};
use uuid::Uuid;

/// Client for interacting with the delivery actor.
///
/// Cheap to clone; every clone talks to the same actor.
#[derive(Clone)]
pub struct DeliveryClient {
    sender: mpsc::Sender<DeliveryRequest>,
}

impl DeliveryClient {
    pub fn new(sender: mpsc::Sender<DeliveryRequest>) -> Self {
        Self { sender }
    }

    #[instrument(skip(self))]
    pub async fn create(&self, params: DeliveryCreate) -> Result<Delivery, DeliveryError> {
        debug!("Sending request");
        request(&self.sender, |respond_to| DeliveryRequest::Create { params, respond_to }).await?
    }

    /// Inserts an already built delivery (e.g. one loaded from disk).
    pub async fn add(&self, delivery: Delivery) -> Result<Uuid, DeliveryError> {
        request(&self.sender, |respond_to| DeliveryRequest::Add {
            delivery,
            respond_to,
        })
        .await?
    }

    /// Removes a terminal delivery. `Ok(None)` means the code was not present.
    #[instrument(skip(self))]
    pub async fn remove(&self, code: Uuid) -> Result<Option<Delivery>, DeliveryError> {
        debug!("Sending request");
        request(&self.sender, |respond_to| DeliveryRequest::Remove { code, respond_to }).await?
    }

    pub async fn get(&self, code: Uuid) -> Result<Option<Delivery>, DeliveryError> {
        Ok(request(&self.sender, |respond_to| DeliveryRequest::Get { code, respond_to }).await?)
    }

    pub async fn by_sender(&self, sender: Uuid) -> Result<Vec<Delivery>, DeliveryError> {
        Ok(request(&self.sender, |respond_to| DeliveryRequest::BySender {
            sender,
            respond_to,
        })
        .await?)
    }

    /// A live view over one sender's deliveries.
    pub fn sender_view(&self, sender: Uuid) -> SenderView {
        SenderView {
            client: self.clone(),
            sender,
        }
    }

    /// Every delivery, in insertion order.
    pub async fn list(&self) -> Result<Vec<Delivery>, DeliveryError> {
        Ok(request(&self.sender, |respond_to| DeliveryRequest::List { respond_to }).await?)
    }

    /// Manual override, still subject to the delivery's terminal and insurance rules.
    #[instrument(skip(self))]
    pub async fn set_state(
        &self,
        code: Uuid,
        state: DeliveryState,
    ) -> Result<StateChange, DeliveryError> {
        debug!("Sending request");
        request(&self.sender, |respond_to| DeliveryRequest::SetState {
            code,
            state,
            respond_to,
        })
        .await?
    }

    #[instrument(skip(self))]
    pub async fn request_refund(&self, code: Uuid) -> Result<StateChange, DeliveryError> {
        debug!("Sending request");
        request(&self.sender, |respond_to| DeliveryRequest::RequestRefund {
            code,
            respond_to,
        })
        .await?
    }

    /// Subscribes to the broadcast stream of store events.
    pub async fn events(&self) -> Result<broadcast::Receiver<StoreEvent>, DeliveryError> {
        Ok(request(&self.sender, |respond_to| DeliveryRequest::Events { respond_to }).await?)
    }
}

#[async_trait]
impl WorkerPort for DeliveryClient {
    async fn attach(&self, observer: Arc<dyn StoreObserver>) -> Result<ObserverId, DeliveryError> {
        Ok(request(&self.sender, |respond_to| DeliveryRequest::Subscribe {
            observer,
            respond_to,
        })
        .await?)
    }

    async fn detach(&self, id: ObserverId) -> Result<(), DeliveryError> {
        request(&self.sender, |respond_to| DeliveryRequest::Unsubscribe { id, respond_to })
            .await?;
        Ok(())
    }

    async fn commit_if_unchanged(
        &self,
        code: Uuid,
        expected: DeliveryState,
        next: DeliveryState,
    ) -> Result<CommitOutcome, DeliveryError> {
        Ok(request(&self.sender, |respond_to| DeliveryRequest::CommitIfUnchanged {
            code,
            expected,
            next,
            respond_to,
        })
        .await?)
    }
}

/// The deliveries of one sender, re-read on every access.
#[derive(Clone)]
pub struct SenderView {
    client: DeliveryClient,
    sender: Uuid,
}

impl SenderView {
    pub fn sender(&self) -> Uuid {
        self.sender
    }

    /// Current deliveries of this sender, in insertion order.
    pub async fn current(&self) -> Result<Vec<Delivery>, DeliveryError> {
        self.client.by_sender(self.sender).await
    }
}
