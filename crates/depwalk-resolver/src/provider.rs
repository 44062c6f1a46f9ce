//! The capability the walker needs from a package source.

use async_trait::async_trait;
use depwalk_core::{Framework, LibraryDependency, LibraryIdentity, LibraryRange, TypeConstraint};
use tokio_util::sync::CancellationToken;

use crate::error::ProviderError;

/// A source of libraries: a project system, a folder of packages or a feed.
///
/// Implementations are stateless lookups from the walker's point of view and
/// may be called concurrently. Long-running calls should observe `cancel`.
#[async_trait]
pub trait DependencyProvider: Send + Sync {
    /// Name of the source, used in logs and on matched graph items.
    fn source(&self) -> &str;

    /// True for network feeds; false for filesystem-backed sources.
    fn is_http(&self) -> bool;

    /// Whether this provider can satisfy requests with `constraint`.
    fn supports_type(&self, constraint: TypeConstraint) -> bool {
        constraint.allows_package()
    }

    /// The best library this source offers for `range`, or `None` if it has
    /// nothing that satisfies it.
    async fn find_best_match(
        &self,
        range: &LibraryRange,
        framework: &Framework,
        cancel: &CancellationToken,
    ) -> Result<Option<LibraryIdentity>, ProviderError>;

    /// The dependencies `identity` declares for `framework`.
    async fn get_dependencies(
        &self,
        identity: &LibraryIdentity,
        framework: &Framework,
        cancel: &CancellationToken,
    ) -> Result<Vec<LibraryDependency>, ProviderError>;
}
