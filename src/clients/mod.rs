//! Type-safe clients for the crate's actors.

pub mod delivery_client;

pub use delivery_client::*;
