use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use depwalk_core::config::WalkerConfig;
use depwalk_core::lockfile::LockedLibraries;
use depwalk_core::{
    Framework, LibraryDependency, LibraryIdentity, LibraryRange, LibraryType, TypeConstraint,
};
use depwalk_resolver::memory::InMemoryProvider;
use depwalk_resolver::{
    DependencyGraph, DependencyProvider, Disposition, ProviderError, ProviderTier,
    RemoteDependencyWalker, WalkContext, WalkError, WalkReport,
};
use depwalk_versioning::{Version, VersionRange};
use tokio_util::sync::CancellationToken;

fn v(s: &str) -> Version {
    Version::parse(s).unwrap()
}

fn range(name: &str, r: &str) -> LibraryRange {
    LibraryRange::package(name, VersionRange::parse(r).unwrap())
}

fn dep(name: &str, r: &str) -> LibraryDependency {
    LibraryDependency::new(range(name, r))
}

fn net8() -> Framework {
    Framework::new("net8.0")
}

async fn walk(context: WalkContext, root: LibraryRange) -> Result<DependencyGraph, WalkError> {
    depwalk_util::logging::init_for_tests();
    RemoteDependencyWalker::new(context)
        .walk(root, &net8(), &CancellationToken::new())
        .await
}

fn root_identity(graph: &DependencyGraph) -> &LibraryIdentity {
    graph.root_node().identity().unwrap()
}

fn root_tier(graph: &DependencyGraph) -> ProviderTier {
    let item = graph.root_node().item.as_ref().unwrap();
    item.matched.as_ref().unwrap().tier
}

#[tokio::test]
async fn resolves_transitive_tree() {
    let local = InMemoryProvider::new("disk")
        .with_library("A", v("1.0.0"), vec![dep("B", "1.0.0")])
        .with_library("B", v("1.0.0"), vec![dep("C", "1.0.0")])
        .with_library("C", v("1.0.0"), Vec::new());
    let context = WalkContext::new().with_local_provider(Arc::new(local));

    let graph = walk(context, range("A", "1.0.0")).await.unwrap();
    assert_eq!(
        graph.print_tree(None),
        "A 1.0.0\n└── B 1.0.0\n    └── C 1.0.0\n"
    );
    assert!(WalkReport::from_graph(&graph).is_empty());
}

#[tokio::test]
async fn shared_range_is_resolved_once() {
    let local = Arc::new(
        InMemoryProvider::new("disk")
            .with_library("A", v("1.0.0"), vec![dep("B", "1.0.0"), dep("C", "1.0.0")])
            .with_library("B", v("1.0.0"), vec![dep("D", "1.0.0")])
            .with_library("C", v("1.0.0"), vec![dep("d", "1.0.0")])
            .with_library("D", v("1.0.0"), Vec::new())
            .with_delay(Duration::from_millis(5)),
    );
    let context = WalkContext::new().with_local_provider(local.clone());

    let graph = walk(context, range("A", "1.0.0")).await.unwrap();

    let d_nodes = graph.find("D");
    assert_eq!(d_nodes.len(), 2);
    let first = graph.node(d_nodes[0]).item.clone().unwrap();
    let second = graph.node(d_nodes[1]).item.clone().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    assert_eq!(local.find_calls(), 4);
    assert_eq!(local.dependency_calls(), 4);
}

#[tokio::test]
async fn project_tier_wins() {
    let projects = Arc::new(InMemoryProvider::projects("workspace").with_library(
        "A",
        v("1.0.0"),
        Vec::new(),
    ));
    let local = Arc::new(InMemoryProvider::new("disk").with_library("A", v("1.0.0"), Vec::new()));
    let context = WalkContext::new()
        .with_project_provider(projects.clone())
        .with_local_provider(local.clone());

    let root = LibraryRange::new(
        "A",
        Some(VersionRange::parse("1.0.0").unwrap()),
        TypeConstraint::PACKAGE_OR_PROJECT,
    );
    let graph = walk(context, root).await.unwrap();

    assert_eq!(root_identity(&graph).library_type, LibraryType::Project);
    assert_eq!(root_tier(&graph), ProviderTier::Project);
    assert_eq!(local.find_calls(), 0);
}

#[tokio::test]
async fn package_constraint_skips_project_tier() {
    let projects = Arc::new(InMemoryProvider::projects("workspace").with_library(
        "A",
        v("1.0.0"),
        Vec::new(),
    ));
    let local = Arc::new(InMemoryProvider::new("disk").with_library("A", v("1.0.0"), Vec::new()));
    let context = WalkContext::new()
        .with_project_provider(projects.clone())
        .with_local_provider(local);

    let graph = walk(context, range("A", "1.0.0")).await.unwrap();
    assert_eq!(root_identity(&graph).library_type, LibraryType::Package);
    assert_eq!(projects.find_calls(), 0);
}

#[tokio::test]
async fn cycle_is_terminal_and_reported() {
    let local = InMemoryProvider::new("disk")
        .with_library("A", v("1.0.0"), vec![dep("B", "1.0.0")])
        .with_library("B", v("1.0.0"), vec![dep("A", "1.0.0")]);
    let context = WalkContext::new().with_local_provider(Arc::new(local));

    let graph = tokio::time::timeout(Duration::from_secs(5), walk(context, range("A", "1.0.0")))
        .await
        .expect("walk should not hang")
        .unwrap();

    let cycles = graph.nodes_with(Disposition::Cycle);
    assert_eq!(cycles.len(), 1);
    assert!(graph.node(cycles[0]).item.is_none());

    let report = WalkReport::from_graph(&graph);
    assert_eq!(report.cycles[0].chain, ["A", "B", "A"]);
    match report.into_result() {
        Err(WalkError::CircularDependency { chain }) => assert_eq!(chain, ["A", "B", "A"]),
        other => panic!("expected a circular dependency, got {other:?}"),
    }
}

#[tokio::test]
async fn self_dependency_is_a_cycle() {
    let local = InMemoryProvider::new("disk").with_library("A", v("1.0.0"), vec![dep("a", "1.0.0")]);
    let context = WalkContext::new().with_local_provider(Arc::new(local));

    let graph = walk(context, range("A", "1.0.0")).await.unwrap();
    assert_eq!(graph.nodes_with(Disposition::Cycle).len(), 1);
}

#[tokio::test]
async fn local_exact_match_skips_remote() {
    let local = Arc::new(InMemoryProvider::new("disk").with_library("A", v("1.0.0"), Vec::new()));
    let remote = Arc::new(
        InMemoryProvider::new("feed")
            .http()
            .with_library("A", v("1.0.0"), Vec::new())
            .with_library("A", v("2.0.0"), Vec::new()),
    );
    let context = WalkContext::new()
        .with_local_provider(local)
        .with_remote_provider(remote.clone());

    let graph = walk(context, range("A", "1.0.0")).await.unwrap();
    assert_eq!(root_identity(&graph).version, v("1.0.0"));
    assert_eq!(root_tier(&graph), ProviderTier::Local);
    assert_eq!(remote.find_calls(), 0);
}

#[tokio::test]
async fn floating_range_takes_highest_remote() {
    let local = InMemoryProvider::new("disk").with_library("A", v("1.0.0"), Vec::new());
    let remote = InMemoryProvider::new("feed")
        .http()
        .with_library("A", v("1.0.0"), Vec::new())
        .with_library("A", v("2.0.0"), Vec::new());
    let context = WalkContext::new()
        .with_local_provider(Arc::new(local))
        .with_remote_provider(Arc::new(remote));

    let graph = walk(context, range("A", "*")).await.unwrap();
    assert_eq!(root_identity(&graph).version, v("2.0.0"));
    assert_eq!(root_tier(&graph), ProviderTier::Remote);
}

#[tokio::test]
async fn floating_range_prefers_local_copy_of_remote_version() {
    let local = InMemoryProvider::new("disk")
        .with_library("A", v("1.0.0"), Vec::new())
        .with_library("A", v("2.0.0"), Vec::new());
    let remote = InMemoryProvider::new("feed")
        .http()
        .with_library("A", v("2.0.0"), Vec::new());
    let context = WalkContext::new()
        .with_local_provider(Arc::new(local))
        .with_remote_provider(Arc::new(remote));

    let graph = walk(context, range("A", "*")).await.unwrap();
    assert_eq!(root_identity(&graph).version, v("2.0.0"));
    assert_eq!(root_tier(&graph), ProviderTier::Local);
}

#[tokio::test]
async fn floating_range_falls_back_to_local_when_remote_lacks_it() {
    let local = InMemoryProvider::new("disk").with_library("A", v("1.3.0"), Vec::new());
    let remote = InMemoryProvider::new("feed")
        .http()
        .with_library("B", v("9.0.0"), Vec::new());
    let context = WalkContext::new()
        .with_local_provider(Arc::new(local))
        .with_remote_provider(Arc::new(remote));

    let graph = walk(context, range("A", "*")).await.unwrap();
    assert_eq!(graph.root_node().disposition, Disposition::Accepted);
    assert_eq!(root_identity(&graph).version, v("1.3.0"));
    assert_eq!(root_tier(&graph), ProviderTier::Local);
}

#[tokio::test]
async fn fixed_range_prefers_lowest_across_tiers() {
    let local = InMemoryProvider::new("disk").with_library("A", v("1.5.0"), Vec::new());
    let remote = InMemoryProvider::new("feed")
        .http()
        .with_library("A", v("1.0.0"), Vec::new())
        .with_library("A", v("1.5.0"), Vec::new());
    let context = WalkContext::new()
        .with_local_provider(Arc::new(local))
        .with_remote_provider(Arc::new(remote));

    let graph = walk(context, range("A", "1.0.0")).await.unwrap();
    assert_eq!(root_identity(&graph).version, v("1.0.0"));
    assert_eq!(root_tier(&graph), ProviderTier::Remote);
}

/// A package folder that can only answer for exact versions.
struct ExactOnly(InMemoryProvider);

#[async_trait]
impl DependencyProvider for ExactOnly {
    fn source(&self) -> &str {
        self.0.source()
    }

    fn is_http(&self) -> bool {
        false
    }

    async fn find_best_match(
        &self,
        range: &LibraryRange,
        framework: &Framework,
        cancel: &CancellationToken,
    ) -> Result<Option<LibraryIdentity>, ProviderError> {
        if !range.version_range.as_ref().is_some_and(VersionRange::is_exact) {
            return Ok(None);
        }
        self.0.find_best_match(range, framework, cancel).await
    }

    async fn get_dependencies(
        &self,
        identity: &LibraryIdentity,
        framework: &Framework,
        cancel: &CancellationToken,
    ) -> Result<Vec<LibraryDependency>, ProviderError> {
        self.0.get_dependencies(identity, framework, cancel).await
    }
}

#[tokio::test]
async fn remote_result_is_reprobed_locally() {
    let local = ExactOnly(InMemoryProvider::new("disk").with_library("A", v("1.2.0"), Vec::new()));
    let remote = InMemoryProvider::new("feed")
        .http()
        .with_library("A", v("1.2.0"), Vec::new());
    let context = WalkContext::new()
        .with_local_provider(Arc::new(local))
        .with_remote_provider(Arc::new(remote));

    let graph = walk(context, range("A", "1.0.0")).await.unwrap();
    assert_eq!(root_identity(&graph).version, v("1.2.0"));
    assert_eq!(root_tier(&graph), ProviderTier::Local);
    let item = graph.root_node().item.as_ref().unwrap();
    assert_eq!(item.matched.as_ref().unwrap().source, "disk");
}

#[tokio::test]
async fn unresolved_range_is_rejected_not_fatal() {
    let local = InMemoryProvider::new("disk")
        .with_library("A", v("1.0.0"), vec![dep("Missing", "[2.0.0, 3.0.0)")]);
    let context = WalkContext::new().with_local_provider(Arc::new(local));

    let graph = walk(context, range("A", "1.0.0")).await.unwrap();
    let rejected = graph.nodes_with(Disposition::Rejected);
    assert_eq!(rejected.len(), 1);

    let identity = graph.node(rejected[0]).identity().unwrap();
    assert_eq!(identity.library_type, LibraryType::Unresolved);
    assert_eq!(identity.version, v("2.0.0"));

    let report = WalkReport::from_graph(&graph);
    assert_eq!(report.unresolved[0].path, ["A", "Missing"]);
}

#[tokio::test]
async fn failing_provider_counts_as_no_match() {
    let local = InMemoryProvider::new("disk").with_library("A", v("1.2.0"), Vec::new());
    let remote = InMemoryProvider::new("feed").http().failing("503 Service Unavailable");
    let context = WalkContext::new()
        .with_local_provider(Arc::new(local))
        .with_remote_provider(Arc::new(remote));

    let graph = walk(context, range("A", "1.0.0")).await.unwrap();
    assert_eq!(graph.root_node().disposition, Disposition::Accepted);
    assert_eq!(root_identity(&graph).version, v("1.2.0"));
}

/// Finds every library but cannot read any dependencies.
struct BrokenDependencies;

#[async_trait]
impl DependencyProvider for BrokenDependencies {
    fn source(&self) -> &str {
        "broken"
    }

    fn is_http(&self) -> bool {
        true
    }

    async fn find_best_match(
        &self,
        range: &LibraryRange,
        _framework: &Framework,
        _cancel: &CancellationToken,
    ) -> Result<Option<LibraryIdentity>, ProviderError> {
        let version = range
            .version_range
            .as_ref()
            .and_then(VersionRange::min_version)
            .cloned();
        Ok(version.map(|version| LibraryIdentity::package(range.name.clone(), version)))
    }

    async fn get_dependencies(
        &self,
        _identity: &LibraryIdentity,
        _framework: &Framework,
        _cancel: &CancellationToken,
    ) -> Result<Vec<LibraryDependency>, ProviderError> {
        Err(ProviderError::transport("broken", "truncated manifest"))
    }
}

#[tokio::test]
async fn unreadable_dependencies_reject_the_node() {
    let context = WalkContext::new().with_remote_provider(Arc::new(BrokenDependencies));

    let graph = walk(context, range("A", "1.0.0")).await.unwrap();
    let root = graph.root_node();
    assert_eq!(root.disposition, Disposition::Rejected);
    assert_eq!(root.identity().unwrap().library_type, LibraryType::Package);

    let report = WalkReport::from_graph(&graph);
    let failure = report.unresolved[0].failure.as_deref().unwrap();
    assert!(failure.contains("truncated manifest"), "got: {failure}");
}

#[tokio::test]
async fn cancelled_before_start() {
    let local = InMemoryProvider::new("disk").with_library("A", v("1.0.0"), Vec::new());
    let walker = RemoteDependencyWalker::new(WalkContext::new().with_local_provider(Arc::new(local)));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = walker.walk(range("A", "1.0.0"), &net8(), &cancel).await;
    assert!(matches!(result, Err(WalkError::Cancelled)));
}

#[tokio::test]
async fn cancellation_aborts_a_slow_walk() {
    let local = InMemoryProvider::new("disk")
        .with_library("A", v("1.0.0"), Vec::new())
        .with_delay(Duration::from_secs(30));
    let walker = RemoteDependencyWalker::new(WalkContext::new().with_local_provider(Arc::new(local)));
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        walker.walk(range("A", "1.0.0"), &net8(), &cancel),
    )
    .await
    .expect("cancellation should end the walk");
    assert!(matches!(result, Err(WalkError::Cancelled)));
}

#[tokio::test]
async fn nearer_declaration_eclipses_deeper_one() {
    let local = InMemoryProvider::new("disk")
        .with_library("A", v("1.0.0"), vec![dep("B", "1.0.0"), dep("C", "2.0.0")])
        .with_library("B", v("1.0.0"), vec![dep("C", "1.0.0")])
        .with_library("C", v("1.0.0"), Vec::new())
        .with_library("C", v("2.0.0"), Vec::new());
    let context = WalkContext::new().with_local_provider(Arc::new(local));

    let graph = walk(context, range("A", "1.0.0")).await.unwrap();
    let b = graph.find("B")[0];
    assert!(graph.inner_nodes(b).is_empty());
    assert_eq!(graph.find("C").len(), 1);
    assert!(WalkReport::from_graph(&graph).is_empty());
}

#[tokio::test]
async fn repeated_edge_in_one_library_is_kept_for_each_declaration() {
    let local = InMemoryProvider::new("disk")
        .with_library("A", v("1.0.0"), vec![dep("B", "1.0.0"), dep("B", "2.0.0")])
        .with_library("B", v("1.0.0"), Vec::new())
        .with_library("B", v("2.0.0"), Vec::new());
    let context = WalkContext::new().with_local_provider(Arc::new(local));

    let graph = walk(context, range("A", "1.0.0")).await.unwrap();
    let children: Vec<String> = graph
        .inner_nodes(graph.root())
        .into_iter()
        .map(|idx| graph.node(idx).to_string())
        .collect();
    assert_eq!(children, ["B 1.0.0", "B 2.0.0"]);
}

#[tokio::test]
async fn nearer_lower_declaration_is_a_potential_downgrade() {
    let local = InMemoryProvider::new("disk")
        .with_library("A", v("1.0.0"), vec![dep("B", "1.0.0"), dep("C", "1.0.0")])
        .with_library("B", v("1.0.0"), vec![dep("C", "2.0.0")])
        .with_library("C", v("1.0.0"), Vec::new())
        .with_library("C", v("2.0.0"), Vec::new());
    let context = WalkContext::new().with_local_provider(Arc::new(local));

    let graph = walk(context, range("A", "1.0.0")).await.unwrap();
    let downgrades = graph.nodes_with(Disposition::PotentiallyDowngraded);
    assert_eq!(downgrades.len(), 1);
    assert_eq!(graph.outer_node(downgrades[0]), Some(graph.find("B")[0]));

    let report = WalkReport::from_graph(&graph);
    assert_eq!(report.downgrades[0].requested, range("C", "2.0.0"));
    assert_eq!(report.downgrades[0].nearer, range("C", "1.0.0"));
    assert_eq!(report.downgrades[0].path, ["A", "B", "C"]);
}

#[tokio::test]
async fn suppressed_edges_are_skipped_below_root() {
    let mut suppressed_at_root = dep("B", "1.0.0");
    suppressed_at_root.suppress_parent = true;
    let mut suppressed_below = dep("C", "1.0.0");
    suppressed_below.suppress_parent = true;

    let local = InMemoryProvider::new("disk")
        .with_library("A", v("1.0.0"), vec![suppressed_at_root])
        .with_library("B", v("1.0.0"), vec![suppressed_below])
        .with_library("C", v("1.0.0"), Vec::new());
    let context = WalkContext::new().with_local_provider(Arc::new(local));

    let graph = walk(context, range("A", "1.0.0")).await.unwrap();
    assert_eq!(graph.find("B").len(), 1);
    assert!(graph.find("C").is_empty());
}

#[tokio::test]
async fn non_recursive_walk_resolves_only_root() {
    let local = Arc::new(
        InMemoryProvider::new("disk")
            .with_library("A", v("1.0.0"), vec![dep("B", "1.0.0")])
            .with_library("B", v("1.0.0"), Vec::new()),
    );
    let config = WalkerConfig {
        recursive: false,
        ..WalkerConfig::default()
    };
    let context = WalkContext::new()
        .with_local_provider(local.clone())
        .with_config(config);

    let graph = walk(context, range("A", "1.0.0")).await.unwrap();
    assert_eq!(graph.len(), 1);
    assert_eq!(local.find_calls(), 1);
}

#[tokio::test]
async fn lock_file_pins_override_ranges() {
    let local = InMemoryProvider::new("disk")
        .with_library(
            "A",
            v("1.0.0"),
            vec![dep("B", "1.0.0"), dep("C", "1.0.0")],
        )
        .with_library(
            "A",
            v("1.2.0"),
            vec![dep("B", "1.0.0"), dep("C", "1.0.0")],
        )
        .with_library("B", v("1.0.0"), Vec::new())
        .with_library("C", v("1.0.0"), Vec::new());

    let mut locked = LockedLibraries::default();
    locked.pin(&net8(), "A", v("1.2.0"));
    locked.pin(&net8(), "B", v("1.0.0"));

    let context = WalkContext::new()
        .with_local_provider(Arc::new(local))
        .with_locked(locked);

    let graph = walk(context, range("A", "1.0.0")).await.unwrap();
    assert_eq!(root_identity(&graph).version, v("1.2.0"));
    assert_eq!(graph.node(graph.find("B")[0]).disposition, Disposition::Accepted);
    assert_eq!(graph.node(graph.find("C")[0]).disposition, Disposition::Rejected);
}

#[tokio::test]
async fn filesystem_exact_match_skips_http_in_same_tier() {
    let disk = Arc::new(InMemoryProvider::new("disk").with_library("A", v("1.0.0"), Vec::new()));
    let feed = Arc::new(
        InMemoryProvider::new("feed")
            .http()
            .with_library("A", v("1.0.0"), Vec::new()),
    );
    let context = WalkContext::new()
        .with_remote_provider(feed.clone())
        .with_remote_provider(disk.clone());

    let graph = walk(context, range("A", "1.0.0")).await.unwrap();
    assert_eq!(root_identity(&graph).version, v("1.0.0"));
    assert_eq!(disk.find_calls(), 1);
    assert_eq!(feed.find_calls(), 0);
}

#[tokio::test]
async fn http_lower_match_beats_filesystem_in_same_tier() {
    let disk = InMemoryProvider::new("disk").with_library("A", v("1.5.0"), Vec::new());
    let feed = InMemoryProvider::new("feed")
        .http()
        .with_library("A", v("1.1.0"), Vec::new());
    let context = WalkContext::new()
        .with_remote_provider(Arc::new(disk))
        .with_remote_provider(Arc::new(feed));

    let graph = walk(context, range("A", "1.0.0")).await.unwrap();
    assert_eq!(root_identity(&graph).version, v("1.1.0"));
    let item = graph.root_node().item.as_ref().unwrap();
    assert_eq!(item.matched.as_ref().unwrap().source, "feed");
}

#[tokio::test]
async fn equal_answers_go_to_the_earlier_provider() {
    let first = InMemoryProvider::new("first")
        .http()
        .with_library("A", v("1.2.0"), Vec::new());
    let second = InMemoryProvider::new("second")
        .http()
        .with_library("A", v("1.2.0"), Vec::new());
    let context = WalkContext::new()
        .with_remote_provider(Arc::new(first))
        .with_remote_provider(Arc::new(second));

    let graph = walk(context, range("A", "1.0.0")).await.unwrap();
    let item = graph.root_node().item.as_ref().unwrap();
    assert_eq!(item.matched.as_ref().unwrap().source, "first");
}

#[tokio::test]
async fn exact_minimum_does_not_wait_for_slow_feed() {
    let slow = InMemoryProvider::new("slow")
        .http()
        .with_library("A", v("1.0.0"), Vec::new())
        .with_delay(Duration::from_secs(20));
    let fast = InMemoryProvider::new("fast")
        .http()
        .with_library("A", v("1.0.0"), Vec::new());
    let context = WalkContext::new()
        .with_remote_provider(Arc::new(slow))
        .with_remote_provider(Arc::new(fast));

    let graph = tokio::time::timeout(Duration::from_secs(5), walk(context, range("A", "1.0.0")))
        .await
        .expect("walk waited for the slow feed")
        .unwrap();
    assert_eq!(root_identity(&graph).version, v("1.0.0"));
    let item = graph.root_node().item.as_ref().unwrap();
    assert_eq!(item.matched.as_ref().unwrap().source, "fast");
}
