//! Core data types for depwalk.
//!
//! This crate defines the values the resolution walker passes around:
//! library ranges and identities, dependency edges, target frameworks,
//! the walker configuration and lock-file pins.
//!
//! This crate is intentionally free of async code and network I/O.

pub mod config;
pub mod library;
pub mod lockfile;

pub use library::{
    Framework, LibraryDependency, LibraryIdentity, LibraryRange, LibraryType, TypeConstraint,
};
