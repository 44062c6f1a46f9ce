//! Library model: what is asked for, what was found, and the edges between.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::BitOr;

use depwalk_versioning::{Version, VersionRange};
use serde::{Deserialize, Serialize};

/// Which kinds of library may satisfy a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeConstraint(u8);

impl TypeConstraint {
    pub const NONE: Self = Self(0);
    pub const PACKAGE: Self = Self(1);
    pub const PROJECT: Self = Self(1 << 1);
    pub const EXTERNAL_PROJECT: Self = Self(1 << 2);
    pub const PACKAGE_OR_PROJECT: Self = Self(Self::PACKAGE.0 | Self::PROJECT.0);
    pub const ALL: Self = Self(Self::PACKAGE.0 | Self::PROJECT.0 | Self::EXTERNAL_PROJECT.0);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn allows_package(self) -> bool {
        self.contains(Self::PACKAGE)
    }

    /// True if either a project or an external project may satisfy the request.
    pub fn allows_project(self) -> bool {
        self.0 & (Self::PROJECT.0 | Self::EXTERNAL_PROJECT.0) != 0
    }

    pub fn overlaps(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl Default for TypeConstraint {
    fn default() -> Self {
        Self::ALL
    }
}

impl BitOr for TypeConstraint {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for TypeConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = [
            (Self::PACKAGE, "Package"),
            (Self::PROJECT, "Project"),
            (Self::EXTERNAL_PROJECT, "ExternalProject"),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| name)
        .collect();
        if names.is_empty() {
            f.write_str("None")
        } else {
            f.write_str(&names.join(","))
        }
    }
}

/// The kind of library a request resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryType {
    Package,
    Project,
    /// No provider could satisfy the request.
    Unresolved,
}

impl fmt::Display for LibraryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Package => f.write_str("package"),
            Self::Project => f.write_str("project"),
            Self::Unresolved => f.write_str("unresolved"),
        }
    }
}

/// An opaque target-framework selector, e.g. `net8.0`. Passed through to
/// providers untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Framework(String);

impl Framework {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Framework {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A request for a library: a name, an optional version range and the
/// kinds of library allowed to satisfy it.
///
/// Names compare case-insensitively. This type is the memoization key of a
/// walk, so `Hash` folds case the same way `Eq` does.
#[derive(Debug, Clone)]
pub struct LibraryRange {
    pub name: String,
    pub version_range: Option<VersionRange>,
    pub type_constraint: TypeConstraint,
}

impl LibraryRange {
    pub fn new(
        name: impl Into<String>,
        version_range: Option<VersionRange>,
        type_constraint: TypeConstraint,
    ) -> Self {
        Self {
            name: name.into(),
            version_range,
            type_constraint,
        }
    }

    /// A package request for `name` within `range`.
    pub fn package(name: impl Into<String>, range: VersionRange) -> Self {
        Self::new(name, Some(range), TypeConstraint::PACKAGE)
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub fn is_floating(&self) -> bool {
        self.version_range
            .as_ref()
            .is_some_and(VersionRange::is_floating)
    }
}

impl PartialEq for LibraryRange {
    fn eq(&self, other: &Self) -> bool {
        self.has_name(&other.name)
            && self.version_range == other.version_range
            && self.type_constraint == other.type_constraint
    }
}

impl Eq for LibraryRange {}

impl Hash for LibraryRange {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_name(&self.name, state);
        self.version_range.hash(state);
        self.type_constraint.hash(state);
    }
}

impl fmt::Display for LibraryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.version_range {
            Some(ref range) => write!(f, "{} {range}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// A concrete library chosen for a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryIdentity {
    pub name: String,
    pub version: Version,
    #[serde(rename = "type")]
    pub library_type: LibraryType,
}

impl LibraryIdentity {
    pub fn new(name: impl Into<String>, version: Version, library_type: LibraryType) -> Self {
        Self {
            name: name.into(),
            version,
            library_type,
        }
    }

    pub fn package(name: impl Into<String>, version: Version) -> Self {
        Self::new(name, version, LibraryType::Package)
    }

    /// Placeholder identity for a request nothing could satisfy: the
    /// requested minimum, or `0.0.0` when the range has none.
    pub fn unresolved(range: &LibraryRange) -> Self {
        let version = range
            .version_range
            .as_ref()
            .and_then(VersionRange::min_version)
            .cloned()
            .unwrap_or_else(|| Version::new(0, 0, 0));
        Self::new(range.name.clone(), version, LibraryType::Unresolved)
    }

    pub fn is_unresolved(&self) -> bool {
        self.library_type == LibraryType::Unresolved
    }
}

impl PartialEq for LibraryIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
            && self.version == other.version
            && self.library_type == other.library_type
    }
}

impl Eq for LibraryIdentity {}

impl Hash for LibraryIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_name(&self.name, state);
        self.version.hash(state);
        self.library_type.hash(state);
    }
}

impl fmt::Display for LibraryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

/// An edge declared by a library: the requested range plus flags the
/// walker passes through to the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LibraryDependency {
    pub library_range: LibraryRange,
    pub development_only: bool,
    /// The dependency is not flowed to consumers of the declaring library.
    pub suppress_parent: bool,
}

impl LibraryDependency {
    pub fn new(library_range: LibraryRange) -> Self {
        Self {
            library_range,
            development_only: false,
            suppress_parent: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.library_range.name
    }
}

impl From<LibraryRange> for LibraryDependency {
    fn from(library_range: LibraryRange) -> Self {
        Self::new(library_range)
    }
}

impl fmt::Display for LibraryDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.library_range.fmt(f)
    }
}

fn hash_name<H: Hasher>(name: &str, state: &mut H) {
    for b in name.bytes() {
        state.write_u8(b.to_ascii_lowercase());
    }
    state.write_u8(0xff);
}
