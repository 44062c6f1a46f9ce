//! Semantic versions and legacy four-part versions.
//!
//! Ordering follows SemVer 2.0 precedence with two relaxations inherited
//! from legacy package feeds:
//! - an optional fourth numeric component (revision), compared after patch
//! - alphabetic release labels compare case-insensitively
//!
//! Build metadata (`+...`) is kept for display but never takes part in
//! equality, ordering or hashing.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::VersionError;

/// A strict `major.minor.patch[-labels][+metadata]` version.
#[derive(Debug, Clone)]
pub struct SemanticVersion {
    major: u64,
    minor: u64,
    patch: u64,
    release_labels: Vec<String>,
    metadata: Option<String>,
}

impl SemanticVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            release_labels: Vec::new(),
            metadata: None,
        }
    }

    /// Attach dot-separated pre-release labels, e.g. `"beta.1"`.
    pub fn with_release(mut self, release: &str) -> Result<Self, VersionError> {
        self.release_labels = parse_labels(release, release)?;
        Ok(self)
    }

    /// Attach build metadata, e.g. `"sha.5114f85"`.
    pub fn with_metadata(mut self, metadata: &str) -> Result<Self, VersionError> {
        validate_metadata(metadata, metadata)?;
        self.metadata = Some(metadata.to_string());
        Ok(self)
    }

    /// Parse exactly three numeric components plus optional labels and metadata.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let raw = parse_raw(input)?;
        if raw.numbers.len() != 3 {
            return Err(VersionError::version(
                input,
                format!("expected 3 numeric components, found {}", raw.numbers.len()),
            ));
        }
        Ok(Self {
            major: raw.numbers[0],
            minor: raw.numbers[1],
            patch: raw.numbers[2],
            release_labels: raw.labels,
            metadata: raw.metadata,
        })
    }

    pub fn try_parse(input: &str) -> Option<Self> {
        Self::parse(input).ok()
    }

    pub fn major(&self) -> u64 {
        self.major
    }

    pub fn minor(&self) -> u64 {
        self.minor
    }

    pub fn patch(&self) -> u64 {
        self.patch
    }

    pub fn release_labels(&self) -> &[String] {
        &self.release_labels
    }

    /// The release labels joined with `.`; empty for a release version.
    pub fn release(&self) -> String {
        self.release_labels.join(".")
    }

    pub fn metadata(&self) -> Option<&str> {
        self.metadata.as_deref()
    }

    pub fn is_prerelease(&self) -> bool {
        !self.release_labels.is_empty()
    }

    /// `major.minor.patch[-labels]`, without metadata.
    pub fn to_normalized_string(&self) -> String {
        let mut out = format!("{}.{}.{}", self.major, self.minor, self.patch);
        push_release(&mut out, &self.release_labels);
        out
    }
}

impl PartialEq for SemanticVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SemanticVersion {}

impl Hash for SemanticVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.major, self.minor, self.patch).hash(state);
        hash_labels(&self.release_labels, state);
    }
}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| compare_labels(&self.release_labels, &other.release_labels))
    }
}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_normalized_string())?;
        if let Some(ref metadata) = self.metadata {
            write!(f, "+{metadata}")?;
        }
        Ok(())
    }
}

impl FromStr for SemanticVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A legacy-compatible version: 2 to 4 numeric components, labels and
/// metadata, remembering the string it was parsed from.
#[derive(Debug, Clone)]
pub struct Version {
    version: SemanticVersion,
    revision: Option<u64>,
    original: Option<String>,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        SemanticVersion::new(major, minor, patch).into()
    }

    pub fn with_revision(major: u64, minor: u64, patch: u64, revision: u64) -> Self {
        Self {
            version: SemanticVersion::new(major, minor, patch),
            revision: Some(revision),
            original: None,
        }
    }

    /// Build from signed components as produced by legacy tooling, where
    /// `-1` marks an unspecified component. Negative values become zero.
    pub fn from_legacy_parts(major: i64, minor: i64, patch: i64, revision: i64) -> Self {
        let clamp = |n: i64| n.max(0) as u64;
        Self::with_revision(clamp(major), clamp(minor), clamp(patch), clamp(revision))
    }

    /// Attach dot-separated pre-release labels.
    pub fn with_release(mut self, release: &str) -> Result<Self, VersionError> {
        self.version = self.version.with_release(release)?;
        self.original = None;
        Ok(self)
    }

    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let raw = parse_raw(input)?;
        if !(2..=4).contains(&raw.numbers.len()) {
            return Err(VersionError::version(
                input,
                format!(
                    "expected 2 to 4 numeric components, found {}",
                    raw.numbers.len()
                ),
            ));
        }
        let component = |i: usize| raw.numbers.get(i).copied().unwrap_or(0);
        Ok(Self {
            version: SemanticVersion {
                major: component(0),
                minor: component(1),
                patch: component(2),
                release_labels: raw.labels.clone(),
                metadata: raw.metadata.clone(),
            },
            revision: raw.numbers.get(3).copied(),
            original: Some(input.trim().to_string()),
        })
    }

    pub fn try_parse(input: &str) -> Option<Self> {
        Self::parse(input).ok()
    }

    pub fn major(&self) -> u64 {
        self.version.major
    }

    pub fn minor(&self) -> u64 {
        self.version.minor
    }

    pub fn patch(&self) -> u64 {
        self.version.patch
    }

    /// The fourth component; zero when absent.
    pub fn revision(&self) -> u64 {
        self.revision.unwrap_or(0)
    }

    /// True when a non-zero fourth component is present.
    pub fn is_legacy(&self) -> bool {
        self.revision() > 0
    }

    pub fn release_labels(&self) -> &[String] {
        self.version.release_labels()
    }

    pub fn release(&self) -> String {
        self.version.release()
    }

    pub fn metadata(&self) -> Option<&str> {
        self.version.metadata()
    }

    pub fn is_prerelease(&self) -> bool {
        self.version.is_prerelease()
    }

    /// The string this version was parsed from, if any.
    pub fn original_string(&self) -> Option<&str> {
        self.original.as_deref()
    }

    pub fn as_semantic(&self) -> &SemanticVersion {
        &self.version
    }

    /// Numeric part only: `major.minor.patch[.revision]`.
    pub fn to_numeric_string(&self) -> String {
        let v = &self.version;
        if self.is_legacy() {
            format!("{}.{}.{}.{}", v.major, v.minor, v.patch, self.revision())
        } else {
            format!("{}.{}.{}", v.major, v.minor, v.patch)
        }
    }

    /// `major.minor.patch[.revision][-labels]`, without metadata.
    pub fn to_normalized_string(&self) -> String {
        let mut out = self.to_numeric_string();
        push_release(&mut out, self.version.release_labels());
        out
    }

    /// Normalized form plus `+metadata` when present.
    pub fn to_full_string(&self) -> String {
        match self.version.metadata() {
            Some(metadata) => format!("{}+{metadata}", self.to_normalized_string()),
            None => self.to_normalized_string(),
        }
    }

    /// Compare the numeric components only, ignoring release labels.
    pub fn cmp_numeric(&self, other: &Self) -> Ordering {
        self.numeric_key().cmp(&other.numeric_key())
    }

    fn numeric_key(&self) -> (u64, u64, u64, u64) {
        (
            self.version.major,
            self.version.minor,
            self.version.patch,
            self.revision(),
        )
    }
}

impl From<SemanticVersion> for Version {
    fn from(version: SemanticVersion) -> Self {
        Self {
            version,
            revision: None,
            original: None,
        }
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.numeric_key().hash(state);
        hash_labels(self.version.release_labels(), state);
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_numeric(other).then_with(|| {
            compare_labels(self.version.release_labels(), other.version.release_labels())
        })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.original {
            Some(ref original) => f.write_str(original),
            None => f.write_str(&self.to_full_string()),
        }
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

struct RawVersion {
    numbers: Vec<u64>,
    labels: Vec<String>,
    metadata: Option<String>,
}

fn parse_raw(input: &str) -> Result<RawVersion, VersionError> {
    let text = input.trim();
    if text.is_empty() {
        return Err(VersionError::Empty);
    }

    let (rest, metadata) = match text.split_once('+') {
        Some((rest, metadata)) => {
            validate_metadata(metadata, input)?;
            (rest, Some(metadata.to_string()))
        }
        None => (text, None),
    };
    let (core, release) = match rest.split_once('-') {
        Some((core, release)) => (core, Some(release)),
        None => (rest, None),
    };

    let numbers = core
        .split('.')
        .map(|part| parse_component(part, input))
        .collect::<Result<Vec<_>, _>>()?;
    let labels = match release {
        Some(release) => parse_labels(release, input)?,
        None => Vec::new(),
    };

    Ok(RawVersion {
        numbers,
        labels,
        metadata,
    })
}

fn parse_component(part: &str, input: &str) -> Result<u64, VersionError> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VersionError::version(
            input,
            format!("'{part}' is not a numeric component"),
        ));
    }
    part.parse::<u64>()
        .map_err(|e| VersionError::version(input, format!("component '{part}': {e}")))
}

fn parse_labels(release: &str, input: &str) -> Result<Vec<String>, VersionError> {
    release
        .split('.')
        .map(|label| {
            if is_identifier(label) {
                Ok(label.to_string())
            } else {
                Err(VersionError::version(
                    input,
                    format!("invalid release label '{label}'"),
                ))
            }
        })
        .collect()
}

fn validate_metadata(metadata: &str, input: &str) -> Result<(), VersionError> {
    if metadata.split('.').all(is_identifier) {
        Ok(())
    } else {
        Err(VersionError::version(
            input,
            format!("invalid build metadata '{metadata}'"),
        ))
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

fn push_release(out: &mut String, labels: &[String]) {
    if !labels.is_empty() {
        out.push('-');
        out.push_str(&labels.join("."));
    }
}

fn is_numeric_label(label: &str) -> bool {
    label.bytes().all(|b| b.is_ascii_digit())
}

/// Release label sequences: no labels sorts after any labels, then label by
/// label, then the shorter sequence first.
pub(crate) fn compare_labels(a: &[String], b: &[String]) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }
    a.iter()
        .zip(b)
        .map(|(x, y)| compare_label(x, y))
        .find(|ord| *ord != Ordering::Equal)
        .unwrap_or_else(|| a.len().cmp(&b.len()))
}

fn compare_label(a: &str, b: &str) -> Ordering {
    match (is_numeric_label(a), is_numeric_label(b)) {
        (true, true) => {
            let a = a.trim_start_matches('0');
            let b = b.trim_start_matches('0');
            a.len().cmp(&b.len()).then_with(|| a.cmp(b))
        }
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => cmp_ignore_ascii_case(a, b),
    }
}

pub(crate) fn cmp_ignore_ascii_case(a: &str, b: &str) -> Ordering {
    a.bytes()
        .map(|c| c.to_ascii_lowercase())
        .cmp(b.bytes().map(|c| c.to_ascii_lowercase()))
}

fn hash_labels<H: Hasher>(labels: &[String], state: &mut H) {
    labels.len().hash(state);
    for label in labels {
        if is_numeric_label(label) {
            label.trim_start_matches('0').hash(state);
        } else {
            label.to_ascii_lowercase().hash(state);
        }
    }
}
