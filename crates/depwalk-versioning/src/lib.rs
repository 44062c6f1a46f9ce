//! Version algebra: semantic versions, legacy four-part versions, floating
//! ranges and version ranges.
//!
//! Everything in this crate is a pure function over immutable values. It
//! performs no I/O and is shared by the library model, the providers and
//! the resolution walker.

pub mod error;
pub mod float;
pub mod range;
pub mod version;

pub use error::VersionError;
pub use float::{FloatBehavior, FloatRange};
pub use range::VersionRange;
pub use version::{SemanticVersion, Version};
