//! Pure data structures: deliveries, their states and users.

pub mod delivery;
pub mod state;
pub mod user;

pub use delivery::*;
pub use state::*;
pub use user::*;
