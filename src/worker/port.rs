use crate::delivery_actor::{CommitOutcome, DeliveryError, ObserverId, StoreObserver};
use crate::model::DeliveryState;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Everything the worker needs from the delivery collection.
///
/// [`DeliveryClient`](crate::clients::DeliveryClient) is the production
/// implementation; [`MockPort`](crate::framework::mock::MockPort) stands in for
/// it in tests.
#[async_trait]
pub trait WorkerPort: Send + Sync + 'static {
    /// Registers `observer`, replaying every current delivery to it first.
    async fn attach(&self, observer: Arc<dyn StoreObserver>) -> Result<ObserverId, DeliveryError>;

    async fn detach(&self, id: ObserverId) -> Result<(), DeliveryError>;

    /// Applies `next` only if the delivery is still in `expected`.
    async fn commit_if_unchanged(
        &self,
        code: Uuid,
        expected: DeliveryState,
        next: DeliveryState,
    ) -> Result<CommitOutcome, DeliveryError>;
}
