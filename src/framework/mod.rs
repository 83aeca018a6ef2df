//! Generic actor plumbing and test doubles.

pub mod core;
pub mod mock;

pub use self::core::*;
