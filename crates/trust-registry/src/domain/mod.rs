//! # Domain Module
//!
//! Registry state, configuration, errors and the invariants every route is
//! checked against.

pub mod config;
pub mod errors;
pub mod invariants;
pub mod state;
pub mod value_objects;

pub use config::*;
pub use errors::*;
pub use invariants::*;
pub use state::*;
pub use value_objects::*;
