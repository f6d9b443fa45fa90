//! Use-case services.
//!
//! # Responsibility
//! - Expose visibility checks in the shapes callers need (single record,
//!   reasoned decision, batch filtering).
//! - Keep callers decoupled from registry storage details.

pub mod visibility_service;
