//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the natural-key data access contract used by the service.
//! - Isolate SQLite query details from service/business orchestration.
//! - Provide a scripted stand-in for service tests.
//!
//! # Invariants
//! - Every repository call runs inside a caller-supplied transaction.
//! - Repository APIs return domain errors (`*NotExists`, `*AlreadyExists`)
//!   in addition to opaque storage errors.

pub mod dictionary_repo;
pub mod scripted_repo;
