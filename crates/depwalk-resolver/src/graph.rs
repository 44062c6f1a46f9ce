//! The walk result: a tree of requested ranges backed by petgraph.
//!
//! Every edge a library declares becomes its own node, so the same library
//! can appear several times under different parents. Edges point from the
//! declaring (outer) node to the declared (inner) node and carry the
//! dependency exactly as declared.

use std::fmt;
use std::sync::Arc;

use depwalk_core::{LibraryDependency, LibraryIdentity, LibraryRange};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

/// Which provider tier produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderTier {
    Project,
    Local,
    Remote,
}

impl fmt::Display for ProviderTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Project => f.write_str("project"),
            Self::Local => f.write_str("local"),
            Self::Remote => f.write_str("remote"),
        }
    }
}

/// Where a resolved library came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderMatch {
    pub source: String,
    pub is_http: bool,
    pub tier: ProviderTier,
}

/// The memoized outcome of resolving one range: the chosen library and the
/// dependencies it declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphItem {
    pub key: LibraryIdentity,
    pub dependencies: Vec<LibraryDependency>,
    /// `None` when nothing matched.
    pub matched: Option<ProviderMatch>,
    /// Set when the library matched but its dependencies could not be read.
    pub failure: Option<String>,
}

impl GraphItem {
    pub fn unresolved(range: &LibraryRange) -> Self {
        Self {
            key: LibraryIdentity::unresolved(range),
            dependencies: Vec::new(),
            matched: None,
            failure: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !self.key.is_unresolved() && self.failure.is_none()
    }
}

/// What the walker decided about a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disposition {
    Accepted,
    /// No provider could satisfy the range, or its dependencies were unreadable.
    Rejected,
    /// The range names one of its own ancestors.
    Cycle,
    /// A nearer declaration of the same library asks for a lower version.
    PotentiallyDowngraded,
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted => f.write_str("accepted"),
            Self::Rejected => f.write_str("rejected"),
            Self::Cycle => f.write_str("cycle"),
            Self::PotentiallyDowngraded => f.write_str("potentially downgraded"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GraphNode {
    pub key: LibraryRange,
    /// `None` for guard-only nodes (cycles and downgrades).
    pub item: Option<Arc<GraphItem>>,
    pub disposition: Disposition,
    /// For a downgrade guard, the nearer declaration that eclipsed this one.
    pub eclipsed_by: Option<LibraryRange>,
}

impl GraphNode {
    pub fn resolved(key: LibraryRange, item: Arc<GraphItem>) -> Self {
        let disposition = if item.is_resolved() {
            Disposition::Accepted
        } else {
            Disposition::Rejected
        };
        Self {
            key,
            item: Some(item),
            disposition,
            eclipsed_by: None,
        }
    }

    pub fn cycle(key: LibraryRange) -> Self {
        Self {
            key,
            item: None,
            disposition: Disposition::Cycle,
            eclipsed_by: None,
        }
    }

    pub fn downgraded(key: LibraryRange, eclipsed_by: LibraryRange) -> Self {
        Self {
            key,
            item: None,
            disposition: Disposition::PotentiallyDowngraded,
            eclipsed_by: Some(eclipsed_by),
        }
    }

    pub fn identity(&self) -> Option<&LibraryIdentity> {
        self.item.as_ref().map(|item| &item.key)
    }
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.disposition, self.identity()) {
            (Disposition::Accepted, Some(identity)) => write!(f, "{identity}"),
            (disposition, _) => write!(f, "{} ({disposition})", self.key),
        }
    }
}

/// Intermediate tree produced by the walker before it is flattened.
#[derive(Debug)]
pub(crate) struct WalkNode {
    pub node: GraphNode,
    pub edge: Option<LibraryDependency>,
    pub children: Vec<WalkNode>,
}

/// A resolved dependency tree backed by petgraph.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: DiGraph<GraphNode, LibraryDependency>,
    root: NodeIndex,
}

impl DependencyGraph {
    /// A graph holding only `root`.
    pub fn new(root: GraphNode) -> Self {
        let mut graph = DiGraph::new();
        let root = graph.add_node(root);
        Self { graph, root }
    }

    pub(crate) fn from_tree(tree: WalkNode) -> Self {
        let mut graph = Self::new(tree.node);
        let mut stack = vec![(graph.root, tree.children)];
        while let Some((parent, children)) = stack.pop() {
            for child in children {
                let Some(edge) = child.edge else { continue };
                let idx = graph.add_inner(parent, child.node, edge);
                stack.push((idx, child.children));
            }
        }
        graph
    }

    /// Attach `node` below `outer` through `edge`. Inner nodes keep the
    /// order they were added in.
    pub fn add_inner(
        &mut self,
        outer: NodeIndex,
        node: GraphNode,
        edge: LibraryDependency,
    ) -> NodeIndex {
        let idx = self.graph.add_node(node);
        self.graph.add_edge(outer, idx, edge);
        idx
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    pub fn root_node(&self) -> &GraphNode {
        &self.graph[self.root]
    }

    pub fn node(&self, idx: NodeIndex) -> &GraphNode {
        &self.graph[idx]
    }

    /// Direct children of `idx`, in declaration order.
    pub fn inner_nodes(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut edges: Vec<(EdgeIndex, NodeIndex)> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.id(), e.target()))
            .collect();
        edges.sort_by_key(|(edge, _)| *edge);
        edges.into_iter().map(|(_, target)| target).collect()
    }

    /// The node that declared `idx`; `None` for the root.
    pub fn outer_node(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .next()
            .map(|e| e.source())
    }

    /// The dependency edge through which `idx` was reached.
    pub fn incoming_edge(&self, idx: NodeIndex) -> Option<&LibraryDependency> {
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .next()
            .map(|e| e.weight())
    }

    /// Nodes from the root down to `idx`, inclusive.
    pub fn path_from_root(&self, idx: NodeIndex) -> Vec<&GraphNode> {
        let mut path = vec![&self.graph[idx]];
        let mut current = idx;
        while let Some(outer) = self.outer_node(current) {
            path.push(&self.graph[outer]);
            current = outer;
        }
        path.reverse();
        path
    }

    /// All nodes requesting a library called `name` (case-insensitive).
    pub fn find(&self, name: &str) -> Vec<NodeIndex> {
        self.depth_first()
            .into_iter()
            .filter(|&idx| self.graph[idx].key.has_name(name))
            .collect()
    }

    /// All nodes with `disposition`, in depth-first declaration order.
    pub fn nodes_with(&self, disposition: Disposition) -> Vec<NodeIndex> {
        self.depth_first()
            .into_iter()
            .filter(|&idx| self.graph[idx].disposition == disposition)
            .collect()
    }

    /// Pre-order traversal following declaration order.
    pub fn depth_first(&self) -> Vec<NodeIndex> {
        let mut order = Vec::with_capacity(self.graph.node_count());
        let mut stack = vec![self.root];
        while let Some(idx) = stack.pop() {
            order.push(idx);
            stack.extend(self.inner_nodes(idx).into_iter().rev());
        }
        order
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Always false: a graph has at least its root.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Render the tree, one node per line.
    pub fn print_tree(&self, max_depth: Option<usize>) -> String {
        let mut output = format!("{}\n", self.root_node());
        let children = self.inner_nodes(self.root);
        let count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            self.print_subtree(&mut output, child, "", i == count - 1, 1, max_depth);
        }
        output
    }

    fn print_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        prefix: &str,
        is_last: bool,
        depth: usize,
        max_depth: Option<usize>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        output.push_str(&format!("{prefix}{connector}{}\n", self.graph[idx]));

        if max_depth.is_some_and(|max| depth >= max) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let children = self.inner_nodes(idx);
        let count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            self.print_subtree(
                output,
                child,
                &child_prefix,
                i == count - 1,
                depth + 1,
                max_depth,
            );
        }
    }
}
