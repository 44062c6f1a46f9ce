use std::collections::HashSet;

use depwalk_core::{
    LibraryDependency, LibraryIdentity, LibraryRange, LibraryType, TypeConstraint,
};
use depwalk_versioning::{Version, VersionRange};

fn range(name: &str, r: &str) -> LibraryRange {
    LibraryRange::package(name, VersionRange::parse(r).unwrap())
}

#[test]
fn library_range_names_are_case_insensitive() {
    let a = range("Newtonsoft.Json", "13.0");
    let b = range("newtonsoft.json", "[13.0.0, )");
    assert_eq!(a, b);

    let set: HashSet<LibraryRange> = [a, b].into_iter().collect();
    assert_eq!(set.len(), 1);
}

#[test]
fn library_range_differs_by_range_and_constraint() {
    assert_ne!(range("A", "1.0"), range("A", "2.0"));
    let project = LibraryRange::new(
        "A",
        Some(VersionRange::parse("1.0").unwrap()),
        TypeConstraint::PROJECT,
    );
    assert_ne!(range("A", "1.0"), project);
}

#[test]
fn library_range_display() {
    assert_eq!(range("A", "[1.0, 2.0)").to_string(), "A [1.0.0, 2.0.0)");
    let bare = LibraryRange::new("B", None, TypeConstraint::ALL);
    assert_eq!(bare.to_string(), "B");
}

#[test]
fn library_range_floating() {
    assert!(range("A", "1.*").is_floating());
    assert!(!range("A", "1.0").is_floating());
}

#[test]
fn identity_equality_and_display() {
    let a = LibraryIdentity::package("A", Version::parse("1.0").unwrap());
    let b = LibraryIdentity::package("a", Version::parse("1.0.0").unwrap());
    assert_eq!(a, b);
    assert_eq!(a.to_string(), "A 1.0");
    assert_ne!(
        a,
        LibraryIdentity::new("A", Version::new(1, 0, 0), LibraryType::Project)
    );
}

#[test]
fn dependency_defaults() {
    let dep = LibraryDependency::from(range("A", "1.0"));
    assert_eq!(dep.name(), "A");
    assert!(!dep.development_only);
    assert!(!dep.suppress_parent);
    assert_eq!(dep.to_string(), "A [1.0.0, )");
}
