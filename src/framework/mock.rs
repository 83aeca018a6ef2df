//! # Mock Framework
//!
//! Utilities for testing the worker without a running delivery actor.
//!
//! [`MockPort`] implements [`WorkerPort`]: it replays a fixed set of
//! deliveries to whoever attaches, answers commits from a queue of
//! expectations, and forwards the resulting state changes to the attached
//! observer the way the real actor would.
//!
//! # Example
//! ```ignore
//! let port = Arc::new(MockPort::with_deliveries([delivery.clone()]));
//! port.expect_commit(delivery.code(), DeliveryState::InTransit, DeliveryState::Failed)
//!     .committed();
//!
//! // ... run a DeliveryWorker against `port` ...
//! port.verify(); // Ensures all expectations were met
//! ```

use crate::delivery_actor::{
    CommitOutcome, DeliveryError, ObserverId, StoreEvent, StoreObserver,
};
use crate::model::{Delivery, DeliveryKind, DeliveryState, StateChange};
use crate::worker::WorkerPort;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use uuid::Uuid;

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

/// How the mock answers one expected commit.
#[derive(Debug)]
enum Reply {
    Committed,
    Stale(DeliveryState),
    Missing,
    Rejected(DeliveryError),
    Fail(DeliveryError),
}

#[derive(Debug)]
struct Expectation {
    code: Uuid,
    expected: DeliveryState,
    next: DeliveryState,
    reply: Reply,
}

/// A scripted [`WorkerPort`] with expectation tracking.
#[derive(Default)]
pub struct MockPort {
    seed: Vec<Delivery>,
    observer: Mutex<Option<(ObserverId, Arc<dyn StoreObserver>)>>,
    attaches: Mutex<usize>,
    expectations: Mutex<VecDeque<Expectation>>,
    calls: Mutex<Vec<(Uuid, DeliveryState, DeliveryState)>>,
    mismatches: Mutex<Vec<String>>,
}

impl MockPort {
    /// A port over an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// A port whose collection holds `deliveries`, replayed on every attach.
    pub fn with_deliveries(deliveries: impl IntoIterator<Item = Delivery>) -> Self {
        Self {
            seed: deliveries.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Expects a `commit_if_unchanged` call with exactly these arguments.
    pub fn expect_commit(
        &self,
        code: Uuid,
        expected: DeliveryState,
        next: DeliveryState,
    ) -> CommitExpectationBuilder<'_> {
        CommitExpectationBuilder {
            port: self,
            code,
            expected,
            next,
        }
    }

    /// Every commit received so far, as `(code, expected, next)`.
    pub fn calls(&self) -> Vec<(Uuid, DeliveryState, DeliveryState)> {
        self.calls.lock().clone()
    }

    pub fn is_attached(&self) -> bool {
        self.observer.lock().is_some()
    }

    pub fn attach_count(&self) -> usize {
        *self.attaches.lock()
    }

    /// Verifies that all expectations were met and no call was unexpected.
    pub fn verify(&self) {
        let mismatches = self.mismatches.lock();
        if !mismatches.is_empty() {
            panic!("Unexpected commits: {:?}", *mismatches);
        }
        let remaining = self.expectations.lock();
        if !remaining.is_empty() {
            panic!(
                "Not all expectations were met. {} remaining",
                remaining.len()
            );
        }
    }

    fn kind_of(&self, code: Uuid) -> DeliveryKind {
        self.seed
            .iter()
            .find(|d| d.code() == code)
            .map(Delivery::kind)
            .unwrap_or(DeliveryKind::Standard)
    }

    fn notify(&self, event: StoreEvent) {
        let observer = self.observer.lock().as_ref().map(|(_, o)| o.clone());
        if let Some(observer) = observer {
            observer.on_event(&event);
        }
    }
}

/// Builder for `commit_if_unchanged` expectations.
pub struct CommitExpectationBuilder<'a> {
    port: &'a MockPort,
    code: Uuid,
    expected: DeliveryState,
    next: DeliveryState,
}

impl CommitExpectationBuilder<'_> {
    /// Answers `Committed` and notifies the attached observer.
    pub fn committed(self) {
        self.push(Reply::Committed);
    }

    /// Answers `Stale` with `actual` as the current state.
    pub fn stale(self, actual: DeliveryState) {
        self.push(Reply::Stale(actual));
    }

    pub fn missing(self) {
        self.push(Reply::Missing);
    }

    pub fn rejected(self, error: DeliveryError) {
        self.push(Reply::Rejected(error));
    }

    /// Fails the request itself, as a closed actor would.
    pub fn fails(self, error: DeliveryError) {
        self.push(Reply::Fail(error));
    }

    fn push(self, reply: Reply) {
        self.port.expectations.lock().push_back(Expectation {
            code: self.code,
            expected: self.expected,
            next: self.next,
            reply,
        });
    }
}

// =============================================================================
// PORT IMPLEMENTATION
// =============================================================================

#[async_trait]
impl WorkerPort for MockPort {
    async fn attach(&self, observer: Arc<dyn StoreObserver>) -> Result<ObserverId, DeliveryError> {
        let id = {
            let mut attaches = self.attaches.lock();
            *attaches += 1;
            ObserverId(*attaches as u64)
        };
        for delivery in &self.seed {
            observer.on_event(&StoreEvent::Added(delivery.clone()));
        }
        *self.observer.lock() = Some((id, observer));
        Ok(id)
    }

    async fn detach(&self, id: ObserverId) -> Result<(), DeliveryError> {
        let mut observer = self.observer.lock();
        if observer.as_ref().map(|(current, _)| *current) == Some(id) {
            *observer = None;
        }
        Ok(())
    }

    async fn commit_if_unchanged(
        &self,
        code: Uuid,
        expected: DeliveryState,
        next: DeliveryState,
    ) -> Result<CommitOutcome, DeliveryError> {
        self.calls.lock().push((code, expected, next));
        let expectation = self.expectations.lock().pop_front();
        let Some(expectation) = expectation else {
            self.mismatches
                .lock()
                .push(format!("{code}: {expected} -> {next} (no expectation left)"));
            return Ok(CommitOutcome::Missing);
        };
        if (expectation.code, expectation.expected, expectation.next) != (code, expected, next) {
            self.mismatches.lock().push(format!(
                "{code}: {expected} -> {next}, expected {}: {} -> {}",
                expectation.code, expectation.expected, expectation.next
            ));
        }

        match expectation.reply {
            Reply::Committed => {
                let change = StateChange {
                    code,
                    old: expected,
                    new: next,
                    became_terminal: self.kind_of(code).policy().is_terminal(next),
                };
                self.notify(StoreEvent::StateChanged {
                    code,
                    old: expected,
                    new: next,
                });
                if change.became_terminal {
                    self.notify(StoreEvent::BecameTerminal { code, state: next });
                }
                Ok(CommitOutcome::Committed(change))
            }
            Reply::Stale(actual) => Ok(CommitOutcome::Stale { expected, actual }),
            Reply::Missing => Ok(CommitOutcome::Missing),
            Reply::Rejected(e) => Ok(CommitOutcome::Rejected(e)),
            Reply::Fail(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::EligibilityTracker;

    #[tokio::test]
    async fn attach_replays_seed() {
        let d = Delivery::standard(Uuid::new_v4(), "Via Garibaldi 4", 2.0).unwrap();
        let port = MockPort::with_deliveries([d.clone()]);
        let tracker = Arc::new(EligibilityTracker::new());

        let id = port.attach(tracker.clone()).await.unwrap();
        assert_eq!(tracker.snapshot(), vec![(d.code(), DeliveryState::InPreparation)]);
        assert!(port.is_attached());

        port.detach(id).await.unwrap();
        assert!(!port.is_attached());
        port.verify();
    }

    #[tokio::test]
    async fn committed_reply_reaches_observer() {
        let d = Delivery::standard(Uuid::new_v4(), "Via Garibaldi 4", 2.0).unwrap();
        let port = MockPort::with_deliveries([d.clone()]);
        port.expect_commit(d.code(), DeliveryState::InPreparation, DeliveryState::InTransit)
            .committed();
        let tracker = Arc::new(EligibilityTracker::new());
        port.attach(tracker.clone()).await.unwrap();

        let outcome = port
            .commit_if_unchanged(d.code(), DeliveryState::InPreparation, DeliveryState::InTransit)
            .await
            .unwrap();
        assert!(matches!(outcome, CommitOutcome::Committed(c) if !c.became_terminal));
        assert_eq!(tracker.snapshot(), vec![(d.code(), DeliveryState::InTransit)]);
        port.verify();
    }

    #[tokio::test]
    #[should_panic(expected = "Unexpected commits")]
    async fn verify_reports_unexpected_calls() {
        let port = MockPort::new();
        let outcome = port
            .commit_if_unchanged(Uuid::new_v4(), DeliveryState::InTransit, DeliveryState::Failed)
            .await
            .unwrap();
        assert_eq!(outcome, CommitOutcome::Missing);
        port.verify();
    }

    #[tokio::test]
    #[should_panic(expected = "Not all expectations were met")]
    async fn verify_reports_unmet_expectations() {
        let port = MockPort::new();
        port.expect_commit(Uuid::new_v4(), DeliveryState::InTransit, DeliveryState::Failed)
            .missing();
        port.verify();
    }
}
