//! Delivery collection, its owning actor and its error types.

pub mod actor;
pub mod error;
pub mod events;
pub mod store;

pub use actor::*;
pub use error::*;
pub use events::*;
pub use store::*;

use crate::clients::DeliveryClient;
use tokio::sync::mpsc;

/// Creates a delivery actor around `store` and its client.
///
/// The actor does nothing until its [`run`](DeliveryActor::run) future is spawned.
pub fn new(buffer_size: usize, store: DeliveryStore) -> (DeliveryActor, DeliveryClient) {
    let (sender, receiver) = mpsc::channel(buffer_size.max(1));
    (DeliveryActor::new(receiver, store), DeliveryClient::new(sender))
}
