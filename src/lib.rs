//! # Courier Sim
//!
//! > **Delivery state machines advanced by a background Poisson process.**
//!
//! Parcels move through a small state machine. A foreground session creates
//! them, overrides their state or requests refunds, while a background worker
//! advances random eligible parcels at an exponentially distributed pace.
//!
//! ## 🏗️ Design
//!
//! ### One owner for the collection
//! The [`DeliveryStore`](delivery_actor::DeliveryStore) lives inside a single
//! actor task. Foreground requests and worker commits are both messages to
//! that actor, so they are applied one at a time and never overlap.
//!
//! ### Read, compute, commit if unchanged
//! The worker picks a delivery and its state from the
//! [`EligibilityTracker`](worker::EligibilityTracker), computes the successor
//! without holding anything, then asks the actor to commit only if the state
//! is still the one it read. A foreground change landing in between turns the
//! commit into a [`Stale`](delivery_actor::CommitOutcome::Stale) outcome.
//!
//! ### Reactive eligibility
//! The tracker is a [`StoreObserver`](delivery_actor::StoreObserver) fed by
//! the actor itself, so its worklist always equals the set of deliveries in
//! an auto-advanceable state.
//!
//! ### Terminal rules per kind
//! Standard and insured deliveries differ only in their
//! [`StatePolicy`](model::StatePolicy), picked from a tagged
//! [`DeliveryKind`](model::DeliveryKind).
//!
//! ## 🗺️ Module Tour
//!
//! - [`model`]: deliveries, states and users.
//! - [`delivery_actor`]: the indexed collection, its actor, events and errors.
//! - [`clients`]: [`DeliveryClient`](clients::DeliveryClient) and the live per-sender view.
//! - [`worker`]: tracker, sampler, transition rules and the scheduler.
//! - [`framework`]: request/response plumbing and the [`MockPort`](framework::mock::MockPort) test double.
//! - [`auth`], [`persistence`], [`settings`], [`config`]: the foreground collaborators.
//! - [`lifecycle`]: [`DeliverySystem`](lifecycle::DeliverySystem) wiring and tracing setup.
//!
//! ### Running the Demo
//!
//! ```bash
//! RUST_LOG=info cargo run
//! ```
//!
//! ### Running Tests
//!
//! ```bash
//! cargo test
//! ```

pub mod auth;
pub mod clients;
pub mod config;
pub mod delivery_actor;
pub mod framework;
pub mod lifecycle;
pub mod model;
pub mod persistence;
pub mod settings;
pub mod worker;
