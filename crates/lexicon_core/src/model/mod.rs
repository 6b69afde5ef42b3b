//! Dictionary domain model.
//!
//! # Responsibility
//! - Define the Word -> Translation -> Sentence hierarchy shared by all layers.
//! - Define the insert payloads accepted by repository write paths.
//! - Provide pure mappings to the external (API-facing) representation.
//!
//! # Invariants
//! - Entities are plain values; uniqueness and cascade rules live in the schema.
//! - A loaded `Word` always carries its full translation/sentence subtree.

pub mod entry;
pub mod view;
