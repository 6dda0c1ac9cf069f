//! Change and history-entry model shared by the engine and its collaborators.
//!
//! # Responsibility
//! - Define the reversible change contract the engine drives.
//! - Define entry identity and the metadata exposed outside core.
//!
//! # Invariants
//! - Every committed change is owned by exactly one `HistoryEntry`.
//! - Entry identifiers are strictly increasing within one history.

pub mod change;
pub mod entry;
