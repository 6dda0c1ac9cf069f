//! Persistence collaborators for history metadata.
//!
//! # Responsibility
//! - Define the journal contract the service layer writes through.
//! - Keep SQL details out of the engine and the services.
//!
//! # Invariants
//! - Journal writes happen only after the in-memory history accepted them.
//! - Journal APIs return semantic errors (`UnknownEntry`) in addition to DB
//!   transport errors.

pub mod journal_repo;
