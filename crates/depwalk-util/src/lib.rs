//! Shared utilities for depwalk.
//!
//! This crate provides the cross-cutting concerns used by the other depwalk
//! crates: the unified error type and tracing subscriber setup.

pub mod errors;
pub mod logging;
