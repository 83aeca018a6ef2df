//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a compact `tracing-subscriber` formatter filtered
//! by `RUST_LOG`.
//!
//! ## What Gets Traced
//!
//! - **Actor lifecycle**: start and shutdown of the delivery actor, with the collection size
//! - **Collection changes**: adds, removals, manual overrides and refund requests
//! - **Worker**: start/stop, sampled waits (debug), committed transitions (info),
//!   stale preconditions (debug), unexpected states (warn)
//! - **Persistence**: load/save counts, skipped records (error)
//!
//! ## Usage Examples
//!
//! ```bash
//! # Lifecycle and transitions only
//! RUST_LOG=info cargo run
//!
//! # Include sleep durations, payloads and stale commits
//! RUST_LOG=debug cargo run
//!
//! # Worker only
//! RUST_LOG=courier_sim::worker=debug cargo run
//! ```
//!
//! With `RUST_LOG=info` a short run looks like:
//!
//! ```text
//! INFO Delivery actor started size=0
//! INFO Added code=6f0c... size=1
//! INFO Delivery worker started eligible=1
//! INFO Delivery advanced code=6f0c... from=In preparation to=In transit
//! INFO Delivery advanced code=6f0c... from=In transit to=Received
//! ```
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
