//! Recursive, concurrent expansion of a root request into a dependency tree.
//!
//! Each requested range is resolved once per walk through a single-flight
//! cache; the subtree below it is expanded for every place it is declared.
//! Siblings are expanded concurrently and the parent waits for all of them.

use std::sync::Arc;

use depwalk_core::{Framework, LibraryDependency, LibraryRange};
use depwalk_versioning::range::is_greater_than_or_equal_to;
use futures_util::future::{self, BoxFuture, FutureExt};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::SingleFlight;
use crate::context::WalkContext;
use crate::error::{ProviderError, WalkError};
use crate::graph::{DependencyGraph, GraphItem, GraphNode, WalkNode};
use crate::matcher::Matcher;

/// Resolves a root request against the providers of a [`WalkContext`].
#[derive(Debug, Clone)]
pub struct RemoteDependencyWalker {
    context: Arc<WalkContext>,
}

impl RemoteDependencyWalker {
    pub fn new(context: WalkContext) -> Self {
        Self {
            context: Arc::new(context),
        }
    }

    pub fn context(&self) -> &WalkContext {
        &self.context
    }

    /// Walk `range` and everything it depends on for `framework`.
    ///
    /// Unresolvable ranges, cycles and downgrades are recorded in the graph;
    /// only cancellation aborts the walk.
    pub async fn walk(
        &self,
        range: LibraryRange,
        framework: &Framework,
        cancel: &CancellationToken,
    ) -> Result<DependencyGraph, WalkError> {
        info!("resolving {range} for {framework}");
        let session = WalkSession {
            context: &self.context,
            framework,
            cancel,
            permits: Semaphore::new(self.context.config.max_concurrent_requests.max(1)),
            cache: SingleFlight::new(),
        };

        let tree = session.create_node(range, None, Vec::new()).await?;
        let graph = DependencyGraph::from_tree(tree);
        info!(
            nodes = graph.len(),
            lookups = session.cache.len(),
            shared = session.cache.shared_count(),
            "resolved {}",
            graph.root_node()
        );
        Ok(graph)
    }
}

/// A library already on the path from the root, with the edges it declared.
#[derive(Debug, Clone)]
struct AncestorFrame {
    name: String,
    declared: Vec<LibraryRange>,
}

enum EdgeCheck {
    Walk,
    Cycle,
    Eclipsed,
    Downgraded(LibraryRange),
}

/// State owned by one call to [`RemoteDependencyWalker::walk`].
struct WalkSession<'a> {
    context: &'a WalkContext,
    framework: &'a Framework,
    cancel: &'a CancellationToken,
    permits: Semaphore,
    cache: SingleFlight<LibraryRange, Arc<GraphItem>>,
}

impl<'a> WalkSession<'a> {
    fn matcher(&self) -> Matcher<'_> {
        Matcher::new(self.context, self.framework, self.cancel, &self.permits)
    }

    fn create_node<'s>(
        &'s self,
        range: LibraryRange,
        edge: Option<LibraryDependency>,
        ancestors: Vec<AncestorFrame>,
    ) -> BoxFuture<'s, Result<WalkNode, WalkError>> {
        async move {
            if self.cancel.is_cancelled() {
                return Err(WalkError::Cancelled);
            }

            let item = self.find_library_cached(&range).await?;
            let node = GraphNode::resolved(range, Arc::clone(&item));
            let is_root = ancestors.is_empty();

            // Non-recursive walks stop after the root.
            if !item.is_resolved() || !self.context.config.recursive {
                return Ok(WalkNode {
                    node,
                    edge,
                    children: Vec::new(),
                });
            }

            let mut path = ancestors;
            path.push(AncestorFrame {
                name: item.key.name.clone(),
                declared: item
                    .dependencies
                    .iter()
                    .map(|d| d.library_range.clone())
                    .collect(),
            });

            let mut children: Vec<BoxFuture<'s, Result<WalkNode, WalkError>>> = Vec::new();
            for dependency in &item.dependencies {
                if dependency.suppress_parent && !is_root {
                    continue;
                }
                let guard = |node: GraphNode| {
                    future::ready(Ok(WalkNode {
                        node,
                        edge: Some(dependency.clone()),
                        children: Vec::new(),
                    }))
                    .boxed()
                };
                match check_edge(&path, dependency) {
                    EdgeCheck::Walk => children.push(self.create_node(
                        dependency.library_range.clone(),
                        Some(dependency.clone()),
                        path.clone(),
                    )),
                    EdgeCheck::Cycle => {
                        let chain = cycle_chain(&path, dependency);
                        debug!("cycle detected: {}", chain.join(" -> "));
                        children.push(guard(GraphNode::cycle(dependency.library_range.clone())));
                    }
                    EdgeCheck::Downgraded(nearer) => {
                        debug!(
                            "{} may be downgraded by nearer {nearer}",
                            dependency.library_range
                        );
                        children.push(guard(GraphNode::downgraded(
                            dependency.library_range.clone(),
                            nearer,
                        )));
                    }
                    EdgeCheck::Eclipsed => {
                        debug!("{} eclipsed by a nearer declaration", dependency.library_range);
                    }
                }
            }

            let children = future::try_join_all(children).await?;
            Ok(WalkNode {
                node,
                edge,
                children,
            })
        }
        .boxed()
    }

    async fn find_library_cached(&self, range: &LibraryRange) -> Result<Arc<GraphItem>, WalkError> {
        self.cache
            .get_or_try_init(range.clone(), || self.create_graph_item(range))
            .await
    }

    async fn create_graph_item(&self, range: &LibraryRange) -> Result<Arc<GraphItem>, WalkError> {
        let Some(found) = self.matcher().find_library_match(range).await? else {
            debug!("{range} is unresolved");
            return Ok(Arc::new(GraphItem::unresolved(range)));
        };

        let provider = &found.provider;
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| WalkError::Cancelled)?;
        let dependencies = tokio::select! {
            _ = self.cancel.cancelled() => return Err(WalkError::Cancelled),
            result = provider.get_dependencies(&found.identity, self.framework, self.cancel) => result,
        };

        let (dependencies, failure) = match dependencies {
            Ok(dependencies) => (dependencies, None),
            Err(ProviderError::Cancelled) => return Err(WalkError::Cancelled),
            Err(e) => {
                warn!(
                    source = provider.source(),
                    "reading dependencies of {} failed: {e}", found.identity
                );
                (Vec::new(), Some(e.to_string()))
            }
        };

        Ok(Arc::new(GraphItem {
            matched: Some(found.provider_match()),
            key: found.identity,
            dependencies,
            failure,
        }))
    }
}

/// Decide what to do with `dependency`, declared by the last frame of `path`.
fn check_edge(path: &[AncestorFrame], dependency: &LibraryDependency) -> EdgeCheck {
    let name = dependency.name();
    if path.iter().any(|frame| frame.name.eq_ignore_ascii_case(name)) {
        return EdgeCheck::Cycle;
    }

    // The declaring library's own edges are skipped; nearer ancestors win.
    let ancestors = &path[..path.len().saturating_sub(1)];
    for frame in ancestors.iter().rev() {
        let Some(nearer) = frame.declared.iter().find(|r| r.has_name(name)) else {
            continue;
        };
        return match (&nearer.version_range, &dependency.library_range.version_range) {
            (Some(near), Some(far)) if !is_greater_than_or_equal_to(near, far) => {
                EdgeCheck::Downgraded(nearer.clone())
            }
            _ => EdgeCheck::Eclipsed,
        };
    }
    EdgeCheck::Walk
}

fn cycle_chain(path: &[AncestorFrame], dependency: &LibraryDependency) -> Vec<String> {
    path.iter()
        .map(|frame| frame.name.clone())
        .chain(std::iter::once(dependency.name().to_string()))
        .collect()
}
