//! Diary façades used by the UI shell.
//!
//! # Responsibility
//! - Translate entry-level UI actions into store operations.
//! - Keep UI callers decoupled from store backends.
//!
//! # Invariants
//! - Façades never hold references into store state, only `Arc` handles
//!   and subscriptions.
//! - Dropping a façade releases its subscription.

pub mod diary_day_service;
pub mod diary_service;
