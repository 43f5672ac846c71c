//! # Trust Registry
//!
//! Stateless router between one authority and an unbounded population of
//! child units.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//! **Status:** Production-Ready
//!
//! ## Purpose
//!
//! The registry stores no per-unit records. A child unit's identity is its
//! address, and that address is recomputed from `(child code, registry
//! address, index)` whenever a message arrives:
//! - Upward: a unit proves who it is by sending from its derived address
//! - Downward: only the authority may command units; the target is derived
//! - Allocation: the authority grows the population one index at a time
//! - Bounce: undeliverable forwards come back as a failure notice
//!
//! ## Security Features
//!
//! | Defense | Description |
//! |---------|-------------|
//! | Derived identity | Sender must equal `derive(index)` |
//! | Index bound | Only `index < next_index` is routable |
//! | Authority gate | Downward and allocation require the authority |
//! | Atomic transactions | A rejection writes nothing and sends nothing |
//!
//! ## Module Structure
//!
//! ```text
//! trust-registry/
//! ├── domain/          # RegistryState, config, errors, invariants
//! ├── algorithms/      # Derivation, dispatcher, convey, allocation, bounce
//! ├── ports/           # TrustRegistryApi, StateStore, MessageTransport
//! ├── adapters/        # InMemoryStateStore, InMemoryLedger
//! └── service.rs       # TrustRegistryService
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::{bounced_body, Delivery, InMemoryLedger, InMemoryStateStore};
pub use algorithms::{
    allocate, child_data, child_state_init, convey_down, convey_up, derive_child_address,
    dispatch, handle_bounce, RouteContext,
};
pub use domain::{
    invariant_index_allocated, invariant_sender_is, invariant_within_capacity, ConfigError,
    Operation, PersistedState, RegistryConfig, RegistryError, RegistryState, StoreError,
    Transaction, TransactionKind, TransactionReceipt, TransportError, ValuePolicies, ValuePolicy,
    MAX_UNITS,
};
pub use ports::{MessageTransport, StateStore, TrustRegistryApi};
pub use service::{ServiceStats, TrustRegistryService};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
