//! Dependency resolution engine: walks a root library request through
//! project, local and remote providers, memoizing each requested range,
//! and produces a dependency graph with every edge resolved, rejected,
//! marked as a cycle or flagged as a potential downgrade.

pub mod cache;
pub mod context;
pub mod error;
pub mod graph;
pub mod matcher;
pub mod memory;
pub mod provider;
pub mod report;
pub mod walker;

pub use context::WalkContext;
pub use error::{ProviderError, WalkError};
pub use graph::{DependencyGraph, Disposition, GraphItem, GraphNode, ProviderMatch, ProviderTier};
pub use provider::DependencyProvider;
pub use report::WalkReport;
pub use walker::RemoteDependencyWalker;
