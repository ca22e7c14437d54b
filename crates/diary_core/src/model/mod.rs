//! Diary domain model.
//!
//! # Responsibility
//! - Define stored entities (persons, locations, encounters, visits).
//! - Define the derived per-day projection consumed by the UI shell.
//!
//! # Invariants
//! - Entity ids are unique within their own collection.
//! - `DiaryDay` values are always rebuilt by the store, never patched.

pub mod date;
pub mod day;
pub mod entity;
