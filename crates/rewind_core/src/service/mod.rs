//! Core use-case services.
//!
//! # Responsibility
//! - Combine projects, the coordinator and the journal into caller-facing APIs.
//! - Keep request-routing layers decoupled from engine and storage details.

pub mod history_service;
