//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into dictionary use cases.
//! - Own transaction boundaries; one transaction per use case.

pub mod dictionary_service;
