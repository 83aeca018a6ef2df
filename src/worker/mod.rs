//! The background worker and the pieces it is assembled from.

pub mod delivery_worker;
pub mod port;
pub mod sampler;
pub mod settings;
pub mod tracker;
pub mod transition;

pub use delivery_worker::*;
pub use port::*;
pub use sampler::*;
pub use settings::*;
pub use tracker::*;
pub use transition::*;
