//! Use-case services exposed to presentation-facing callers.
//!
//! # Responsibility
//! - Keep domain policy between controllers and the persistence boundary.

pub mod note_service;
