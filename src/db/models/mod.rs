//! Database models split into domain-specific modules.

pub mod car;
pub mod lead;
pub mod pending_car;
pub mod stats;
pub mod user;

pub use car::*;
pub use lead::*;
pub use pending_car::*;
pub use stats::*;
pub use user::*;
