//! # Core Actor Plumbing
//!
//! The request/response primitives every actor in the crate is built from.
//!
//! ## Key Types
//!
//! - [`Response`]: the one-shot reply channel carried inside each request message.
//! - [`request`]: sends a request and awaits its reply.
//! - [`FrameworkError`]: failures of the channel plumbing itself.
//!
//! # Architecture Note
//! An actor is a task that exclusively owns its state and a `mpsc::Receiver`
//! of request messages. Every message embeds a [`Response`] sender, so each
//! request is answered exactly once. Because the task handles one message at
//! a time, the state needs no `Mutex` and every request observes a consistent
//! snapshot of it.

use tokio::sync::{mpsc, oneshot};

/// Errors raised by the message plumbing, independent of any domain.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum FrameworkError {
    /// The actor's receiver is gone; the request was never delivered.
    #[error("Actor closed")]
    ActorClosed,
    /// The actor dropped the reply channel without answering.
    #[error("Actor dropped response channel")]
    ActorDropped,
}

/// Type alias for the one-shot response channel used by actors.
pub type Response<T> = oneshot::Sender<T>;

/// Sends one request to an actor and waits for its reply.
///
/// `make` receives the reply sender and builds the message variant, e.g.
/// `request(&tx, |respond_to| Msg::Get { id, respond_to })`.
pub async fn request<M, T>(
    sender: &mpsc::Sender<M>,
    make: impl FnOnce(Response<T>) -> M,
) -> Result<T, FrameworkError> {
    let (respond_to, response) = oneshot::channel();
    sender
        .send(make(respond_to))
        .await
        .map_err(|_| FrameworkError::ActorClosed)?;
    response.await.map_err(|_| FrameworkError::ActorDropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    enum EchoRequest {
        Echo { value: u32, respond_to: Response<u32> },
        Ignore { respond_to: Response<u32> },
    }

    async fn echo_actor(mut receiver: mpsc::Receiver<EchoRequest>) {
        while let Some(msg) = receiver.recv().await {
            match msg {
                EchoRequest::Echo { value, respond_to } => {
                    let _ = respond_to.send(value * 2);
                }
                EchoRequest::Ignore { respond_to } => drop(respond_to),
            }
        }
    }

    #[tokio::test]
    async fn request_round_trip() {
        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(echo_actor(rx));

        let reply = request(&tx, |respond_to| EchoRequest::Echo { value: 21, respond_to }).await;
        assert_eq!(reply, Ok(42));
    }

    #[tokio::test]
    async fn dropped_reply_is_reported() {
        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(echo_actor(rx));

        let reply: Result<u32, _> =
            request(&tx, |respond_to| EchoRequest::Ignore { respond_to }).await;
        assert_eq!(reply, Err(FrameworkError::ActorDropped));
    }

    #[tokio::test]
    async fn closed_actor_is_reported() {
        let (tx, rx) = mpsc::channel::<EchoRequest>(4);
        drop(rx);

        let reply = request(&tx, |respond_to| EchoRequest::Echo { value: 1, respond_to }).await;
        assert_eq!(reply, Err(FrameworkError::ActorClosed));
    }
}
