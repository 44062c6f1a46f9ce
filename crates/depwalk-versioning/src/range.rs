//! Version ranges in interval notation.
//!
//! Supported forms:
//! - `1.0` (at least 1.0)
//! - `[1.0]` (exactly 1.0)
//! - `[1.0, 2.0)`, `(1.0, 2.0]`, `[1.0, )`, `(, 2.0]`
//! - floating minimums: `1.*`, `1.0.0-beta*`, `[1.0.*, 2.0)`, `*`
//!
//! Pre-release versions are only eligible when the range opts in: either a
//! bound carries a pre-release label, the float includes pre-releases, or
//! the caller set the flag explicitly with [`VersionRange::with_prerelease`].

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::VersionError;
use crate::float::{FloatBehavior, FloatRange};
use crate::version::{cmp_ignore_ascii_case, Version};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionRange {
    min_version: Option<Version>,
    include_min: bool,
    max_version: Option<Version>,
    include_max: bool,
    float_range: Option<FloatRange>,
    include_prerelease: bool,
}

impl VersionRange {
    pub fn new(
        min_version: Option<Version>,
        include_min: bool,
        max_version: Option<Version>,
        include_max: bool,
    ) -> Self {
        let include_prerelease = min_version.as_ref().is_some_and(Version::is_prerelease)
            || max_version.as_ref().is_some_and(Version::is_prerelease);
        Self {
            include_min: include_min && min_version.is_some(),
            include_max: include_max && max_version.is_some(),
            min_version,
            max_version,
            float_range: None,
            include_prerelease,
        }
    }

    /// Matches every version, pre-releases included.
    pub fn all() -> Self {
        Self::new(None, false, None, false).with_prerelease(true)
    }

    /// Matches every stable version.
    ///
    /// Renders as `(, )`, the same text as [`VersionRange::all`]; parsing it
    /// back yields `all()`.
    pub fn all_stable() -> Self {
        Self::new(None, false, None, false)
    }

    /// `[version]`
    pub fn exact(version: Version) -> Self {
        Self::new(Some(version.clone()), true, Some(version), true)
    }

    /// `version` (inclusive minimum, no maximum).
    pub fn at_least(version: Version) -> Self {
        Self::new(Some(version), true, None, false)
    }

    /// Attach a floating specifier. A `FloatBehavior::None` float is dropped.
    pub fn with_float(mut self, float_range: FloatRange) -> Self {
        if float_range.behavior() == FloatBehavior::None {
            return self;
        }
        self.include_prerelease |= float_range.behavior().includes_prerelease();
        self.float_range = Some(float_range);
        self
    }

    /// Override pre-release eligibility.
    pub fn with_prerelease(mut self, include_prerelease: bool) -> Self {
        self.include_prerelease = include_prerelease;
        self
    }

    pub fn min_version(&self) -> Option<&Version> {
        self.min_version.as_ref()
    }

    pub fn max_version(&self) -> Option<&Version> {
        self.max_version.as_ref()
    }

    pub fn has_lower_bound(&self) -> bool {
        self.min_version.is_some()
    }

    pub fn has_upper_bound(&self) -> bool {
        self.max_version.is_some()
    }

    pub fn has_lower_and_upper_bounds(&self) -> bool {
        self.has_lower_bound() && self.has_upper_bound()
    }

    pub fn is_min_inclusive(&self) -> bool {
        self.include_min
    }

    pub fn is_max_inclusive(&self) -> bool {
        self.include_max
    }

    pub fn float_range(&self) -> Option<&FloatRange> {
        self.float_range.as_ref()
    }

    /// A floating range must be re-queried; it never accepts a fixed version outright.
    pub fn is_floating(&self) -> bool {
        self.float_range.is_some()
    }

    pub fn allows_prerelease(&self) -> bool {
        self.include_prerelease
    }

    /// True when the range pins exactly one version, e.g. `[1.0.0]`.
    pub fn is_exact(&self) -> bool {
        !self.is_floating()
            && self.include_min
            && self.include_max
            && self.min_version.is_some()
            && self.min_version == self.max_version
    }

    /// True if `version` lies within the bounds and is eligible with respect
    /// to pre-release labels.
    pub fn satisfies(&self, version: &Version) -> bool {
        if version.is_prerelease() && !self.include_prerelease {
            return false;
        }
        self.within_bounds(version)
    }

    fn within_bounds(&self, version: &Version) -> bool {
        if let Some(ref min) = self.min_version {
            match version.cmp(min) {
                Ordering::Less => return false,
                Ordering::Equal if !self.include_min => return false,
                _ => {}
            }
        }
        if let Some(ref max) = self.max_version {
            match version.cmp(max) {
                Ordering::Greater => return false,
                Ordering::Equal if !self.include_max => return false,
                _ => {}
            }
        }
        true
    }

    /// True if `considering` is strictly preferable to `current` for this range.
    ///
    /// Fixed ranges favour the lowest satisfying version. Floating ranges
    /// favour versions inside the float, highest first; outside the float a
    /// version above it beats one below it.
    pub fn is_better(&self, current: Option<&Version>, considering: Option<&Version>) -> bool {
        let Some(considering) = considering else {
            return false;
        };
        if !self.satisfies(considering) {
            return false;
        }
        let Some(current) = current else {
            return true;
        };
        if current == considering {
            return false;
        }

        if let Some(ref float) = self.float_range {
            let current_in = float.satisfies(current);
            let considering_in = float.satisfies(considering);
            return match (current_in, considering_in) {
                (true, false) => false,
                (false, true) => true,
                (true, true) => current < considering,
                (false, false) => {
                    let Some(floor) = float.min_version() else {
                        return current < considering;
                    };
                    let current_below = current < floor;
                    let considering_below = considering < floor;
                    match (current_below, considering_below) {
                        (true, false) => true,
                        (false, true) => false,
                        (false, false) => current > considering,
                        (true, true) => current < considering,
                    }
                }
            };
        }

        current > considering
    }

    /// The best of `versions` according to [`is_better`](Self::is_better).
    /// On ties the earliest candidate is kept.
    pub fn find_best_match<'a, I>(&self, versions: I) -> Option<&'a Version>
    where
        I: IntoIterator<Item = &'a Version>,
    {
        versions.into_iter().fold(None, |best, candidate| {
            if self.is_better(best, Some(candidate)) {
                Some(candidate)
            } else {
                best
            }
        })
    }

    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(VersionError::Empty);
        }

        if s == "*" {
            let float = FloatRange::parse(s)?;
            return Ok(Self::at_least(Version::new(0, 0, 0)).with_float(float));
        }

        let (min_text, max_text, include_min, include_max) =
            if s.starts_with('[') || s.starts_with('(') {
                let include_min = s.starts_with('[');
                let include_max = match s.chars().last() {
                    Some(']') => true,
                    Some(')') => false,
                    _ => return Err(VersionError::range(input, "missing closing bracket")),
                };
                if s.len() < 2 {
                    return Err(VersionError::range(input, "missing closing bracket"));
                }
                let inner = &s[1..s.len() - 1];
                let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
                if parts.len() > 2 {
                    return Err(VersionError::range(input, "more than two bounds"));
                }
                if parts.iter().all(|p| p.is_empty()) {
                    if parts.len() == 2 {
                        return Ok(Self::all());
                    }
                    return Err(VersionError::range(input, "no bounds given"));
                }
                if parts.len() == 1 {
                    if !(include_min && include_max) {
                        return Err(VersionError::range(
                            input,
                            "a single version must use inclusive brackets",
                        ));
                    }
                    (parts[0], parts[0], true, true)
                } else {
                    (parts[0], parts[1], include_min, include_max)
                }
            } else {
                (s, "", true, false)
            };

        let mut float = None;
        let min_version = if min_text.is_empty() {
            None
        } else if min_text.contains('*') {
            let parsed = FloatRange::parse(min_text)?;
            let min = parsed.min_version().cloned().ok_or_else(|| VersionError::InvalidFloat {
                input: min_text.to_string(),
            })?;
            float = Some(parsed);
            Some(min)
        } else {
            Some(Version::parse(min_text)?)
        };

        let max_version = if max_text.is_empty() {
            None
        } else if max_text.contains('*') {
            return Err(VersionError::range(input, "the maximum cannot float"));
        } else {
            Some(Version::parse(max_text)?)
        };

        if let (Some(min), Some(max)) = (&min_version, &max_version) {
            match min.cmp(max) {
                Ordering::Greater => {
                    return Err(VersionError::range(input, "minimum is above maximum"));
                }
                Ordering::Equal if !(include_min && include_max) => {
                    return Err(VersionError::range(input, "empty range"));
                }
                _ => {}
            }
        }

        let range = Self::new(min_version, include_min, max_version, include_max);
        Ok(match float {
            Some(float) => range.with_float(float),
            None => range,
        })
    }

    pub fn try_parse(input: &str) -> Option<Self> {
        Self::parse(input).ok()
    }

    /// Human-oriented rendering, e.g. `(>= 1.0.0 && < 2.0.0)`; empty for a
    /// range without bounds.
    pub fn pretty_print(&self) -> String {
        let min = self.min_version.as_ref().map(Version::to_normalized_string);
        let max = self.max_version.as_ref().map(Version::to_normalized_string);
        if self.is_exact() {
            return format!("(= {})", min.unwrap_or_default());
        }
        let lower = min.map(|v| format!("{} {v}", if self.include_min { ">=" } else { ">" }));
        let upper = max.map(|v| format!("{} {v}", if self.include_max { "<=" } else { "<" }));
        match (lower, upper) {
            (Some(l), Some(u)) => format!("({l} && {u})"),
            (Some(l), None) => format!("({l})"),
            (None, Some(u)) => format!("({u})"),
            (None, None) => String::new(),
        }
    }
}

/// True if the lower bound of `near` is at least the lower bound of `far`.
///
/// Used to detect a nearer declaration pulling a dependency below what a
/// deeper declaration asked for. Floating bounds compare by the highest
/// version they could float to.
pub fn is_greater_than_or_equal_to(near: &VersionRange, far: &VersionRange) -> bool {
    let Some(near_min) = near.min_version() else {
        return true;
    };
    let Some(far_min) = far.min_version() else {
        return false;
    };

    if !near.is_floating() && !far.is_floating() {
        return near_min >= far_min;
    }

    if near.float_range().map(FloatRange::behavior) == Some(FloatBehavior::Major) {
        return true;
    }
    if far.float_range().map(FloatRange::behavior) == Some(FloatBehavior::Major) {
        return false;
    }

    let (near_ceiling, near_release) = float_ceiling(near, near_min);
    let (far_ceiling, far_release) = float_ceiling(far, far_min);

    match near_ceiling.cmp_numeric(&far_ceiling) {
        Ordering::Equal => {}
        other => return other == Ordering::Greater,
    }

    let near_release = near_release.trim_matches('-');
    let far_release = far_release.trim_matches('-');
    if near_release.is_empty() {
        return true;
    }
    if far_release.is_empty() {
        return false;
    }
    let len = near_release.len().min(far_release.len());
    cmp_ignore_ascii_case(&near_release[..len], &far_release[..len]) != Ordering::Less
}

fn float_ceiling(range: &VersionRange, min: &Version) -> (Version, String) {
    let Some(float) = range.float_range() else {
        return (min.clone(), min.release());
    };
    let release = float
        .min_version()
        .map(Version::release)
        .unwrap_or_default();
    let (major, minor, patch) = (min.major(), min.minor(), min.patch());
    let ceiling = match float.behavior() {
        FloatBehavior::Minor => Version::with_revision(major, u64::MAX, u64::MAX, u64::MAX),
        FloatBehavior::Patch => Version::with_revision(major, minor, u64::MAX, u64::MAX),
        FloatBehavior::Revision => Version::with_revision(major, minor, patch, u64::MAX),
        _ => Version::with_revision(major, minor, patch, min.revision()),
    };
    (ceiling, release)
}

/// Normalized interval notation. Pre-release eligibility is not part of the
/// text: it is re-derived from the bounds on parse.
impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let close = if self.include_max { ']' } else { ')' };
        let max = self
            .max_version
            .as_ref()
            .map(Version::to_normalized_string)
            .unwrap_or_default();

        if let Some(ref float) = self.float_range {
            return write!(f, "[{float}, {max}{close}");
        }
        if self.is_exact() {
            return write!(f, "[{max}]");
        }

        let open = if self.include_min { '[' } else { '(' };
        let min = self
            .min_version
            .as_ref()
            .map(Version::to_normalized_string)
            .unwrap_or_default();
        write!(f, "{open}{min}, {max}{close}")
    }
}

impl FromStr for VersionRange {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for VersionRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for VersionRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
