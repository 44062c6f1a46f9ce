//! Summary of the problems recorded in a walked graph.

use std::fmt;

use depwalk_core::LibraryRange;
use petgraph::graph::NodeIndex;

use crate::error::WalkError;
use crate::graph::{DependencyGraph, Disposition};

/// Everything in a graph an external conflict resolver needs to look at.
#[derive(Debug, Default)]
pub struct WalkReport {
    pub unresolved: Vec<UnresolvedRange>,
    pub cycles: Vec<CycleReport>,
    pub downgrades: Vec<Downgrade>,
}

/// A range no provider could satisfy.
#[derive(Debug, Clone)]
pub struct UnresolvedRange {
    pub range: LibraryRange,
    /// Names from the root down to the declaring library.
    pub path: Vec<String>,
    /// Set when the library matched but its dependencies were unreadable.
    pub failure: Option<String>,
}

/// A chain of names from the root ending in a repeat of an ancestor.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub chain: Vec<String>,
}

/// An edge eclipsed by a nearer declaration asking for a lower version.
#[derive(Debug, Clone)]
pub struct Downgrade {
    pub requested: LibraryRange,
    pub nearer: LibraryRange,
    pub path: Vec<String>,
}

impl WalkReport {
    pub fn from_graph(graph: &DependencyGraph) -> Self {
        let path_to = |idx: NodeIndex| -> Vec<String> {
            graph
                .path_from_root(idx)
                .iter()
                .map(|node| match node.identity() {
                    Some(identity) if !identity.is_unresolved() => identity.name.clone(),
                    _ => node.key.name.clone(),
                })
                .collect()
        };

        let mut report = Self::default();
        for idx in graph.depth_first() {
            let node = graph.node(idx);
            match node.disposition {
                Disposition::Accepted => {}
                Disposition::Rejected => report.unresolved.push(UnresolvedRange {
                    range: node.key.clone(),
                    path: path_to(idx),
                    failure: node.item.as_ref().and_then(|item| item.failure.clone()),
                }),
                Disposition::Cycle => report.cycles.push(CycleReport {
                    chain: path_to(idx),
                }),
                Disposition::PotentiallyDowngraded => {
                    if let Some(nearer) = node.eclipsed_by.clone() {
                        report.downgrades.push(Downgrade {
                            requested: node.key.clone(),
                            nearer,
                            path: path_to(idx),
                        });
                    }
                }
            }
        }
        report
    }

    pub fn is_empty(&self) -> bool {
        self.unresolved.is_empty() && self.cycles.is_empty() && self.downgrades.is_empty()
    }

    /// Turn the first recorded cycle into an error, for callers that treat
    /// cycles as fatal.
    pub fn into_result(self) -> Result<Self, WalkError> {
        match self.cycles.first() {
            Some(cycle) => Err(WalkError::CircularDependency {
                chain: cycle.chain.clone(),
            }),
            None => Ok(self),
        }
    }
}

impl fmt::Display for WalkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "No resolution problems.");
        }
        if !self.unresolved.is_empty() {
            writeln!(f, "Unresolved ({}):", self.unresolved.len())?;
            for u in &self.unresolved {
                write!(f, "  {} via {}", u.range, u.path.join(" -> "))?;
                match u.failure {
                    Some(ref failure) => writeln!(f, " ({failure})")?,
                    None => writeln!(f)?,
                }
            }
        }
        if !self.cycles.is_empty() {
            writeln!(f, "Cycles ({}):", self.cycles.len())?;
            for c in &self.cycles {
                writeln!(f, "  {}", c.chain.join(" -> "))?;
            }
        }
        if !self.downgrades.is_empty() {
            writeln!(f, "Potential downgrades ({}):", self.downgrades.len())?;
            for d in &self.downgrades {
                writeln!(
                    f,
                    "  {} requested via {} but {} is nearer",
                    d.requested,
                    d.path.join(" -> "),
                    d.nearer
                )?;
            }
        }
        Ok(())
    }
}
