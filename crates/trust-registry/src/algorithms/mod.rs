//! # Algorithms Module
//!
//! Routing logic of the registry. Every function here is pure: it reads the
//! state it is handed and returns a [`crate::domain::Transaction`] describing
//! what should happen, or the error that aborts the transaction.

pub mod allocation;
pub mod bounce;
pub mod convey;
pub mod derivation;
pub mod dispatcher;

pub use allocation::allocate;
pub use bounce::handle_bounce;
pub use convey::{convey_down, convey_up};
pub use derivation::{child_data, child_state_init, derive_child_address};
pub use dispatcher::{dispatch, RouteContext};
