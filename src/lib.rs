//! Permissioned attendance record store.
//!
//! Courses, role-gated attendance writes and an append-only event history.
//! The [`ledger`] module is the synchronous core; [`service`] serializes
//! access to it and commits snapshots; [`rpc`] and the binary expose it over
//! NATS.

// Access control, course registry, attendance store, event log
pub mod ledger;

// Serialized service, persistence and event fan-out
pub mod service;

// Caller authentication
pub mod identity;

// Environment settings
pub mod config;

// JSON request protocol
pub mod rpc;

pub use config::LedgerSettings;
pub use identity::{IdentityProvider, JwtIdentityProvider};
pub use ledger::{Identity, LedgerError, LedgerEvent, LedgerLimits, LedgerState};
pub use service::{LedgerService, ServiceError};
