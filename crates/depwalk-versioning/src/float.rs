//! Floating versions: the `*` part of a range such as `1.*` or `2.0.0-beta*`.
//!
//! A floating range is not satisfied by one fixed version. The walker asks
//! the sources for every candidate and keeps the highest one inside the
//! float, so a floating request always has to be re-queried.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::VersionError;
use crate::version::Version;

/// Which section of the version floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatBehavior {
    /// Not floating.
    None,
    /// `1.0.0-beta*`: highest pre-release with the prefix, or the release.
    Prerelease,
    /// `1.0.0.*`
    Revision,
    /// `1.0.*`: highest within major.minor.
    Patch,
    /// `1.*`: highest within major.
    Minor,
    /// `*`: highest stable version.
    Major,
    /// `*-*`: highest version, pre-releases included.
    AbsoluteLatest,
    /// `1.0.0.*-beta*`
    PrereleaseRevision,
    /// `1.0.*-beta*`
    PrereleasePatch,
    /// `1.*-beta*`
    PrereleaseMinor,
    /// `*-beta*`
    PrereleaseMajor,
}

impl FloatBehavior {
    /// True when pre-release versions may satisfy the float.
    pub fn includes_prerelease(self) -> bool {
        matches!(
            self,
            Self::Prerelease
                | Self::AbsoluteLatest
                | Self::PrereleaseRevision
                | Self::PrereleasePatch
                | Self::PrereleaseMinor
                | Self::PrereleaseMajor
        )
    }
}

/// The floating part of a version range.
#[derive(Debug, Clone)]
pub struct FloatRange {
    behavior: FloatBehavior,
    min_version: Option<Version>,
    release_prefix: Option<String>,
}

impl FloatRange {
    pub fn new(
        behavior: FloatBehavior,
        min_version: Option<Version>,
        release_prefix: Option<String>,
    ) -> Self {
        let release_prefix = release_prefix.or_else(|| {
            min_version
                .as_ref()
                .filter(|v| v.is_prerelease())
                .map(|v| v.release())
        });
        Self {
            behavior,
            min_version,
            release_prefix,
        }
    }

    pub fn behavior(&self) -> FloatBehavior {
        self.behavior
    }

    pub fn min_version(&self) -> Option<&Version> {
        self.min_version.as_ref()
    }

    pub fn has_min_version(&self) -> bool {
        self.min_version.is_some()
    }

    /// The release label prefix as written, e.g. `beta` for `1.0.0-beta*`.
    pub fn release_prefix(&self) -> Option<&str> {
        self.release_prefix.as_deref()
    }

    /// True if `version` falls inside the floating section.
    pub fn satisfies(&self, version: &Version) -> bool {
        match self.behavior {
            FloatBehavior::AbsoluteLatest => return true,
            FloatBehavior::Major if !version.is_prerelease() => return true,
            _ => {}
        }

        let Some(ref min) = self.min_version else {
            return false;
        };

        let prefix = self.release_prefix.as_deref().unwrap_or("");
        let label_matches = !version.is_prerelease() || starts_with_ignore_case(&version.release(), prefix);
        let same_major = min.major() == version.major();
        let same_minor = same_major && min.minor() == version.minor();
        let same_patch = same_minor && min.patch() == version.patch();

        match self.behavior {
            FloatBehavior::PrereleaseRevision => same_patch && label_matches,
            FloatBehavior::PrereleasePatch => same_minor && label_matches,
            FloatBehavior::PrereleaseMinor => same_major && label_matches,
            FloatBehavior::PrereleaseMajor => label_matches,
            FloatBehavior::Prerelease => {
                min.cmp_numeric(version) == Ordering::Equal && label_matches
            }
            FloatBehavior::Revision => same_patch && !version.is_prerelease(),
            FloatBehavior::Patch => same_minor && !version.is_prerelease(),
            FloatBehavior::Minor => same_major && !version.is_prerelease(),
            _ => false,
        }
    }

    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(VersionError::Empty);
        }
        let invalid = || VersionError::InvalidFloat {
            input: input.to_string(),
        };

        if s == "*" {
            return Ok(Self::new(
                FloatBehavior::Major,
                Some(Version::new(0, 0, 0)),
                None,
            ));
        }
        if s == "*-*" {
            let min = Version::new(0, 0, 0).with_release("0")?;
            return Ok(Self::new(
                FloatBehavior::AbsoluteLatest,
                Some(min),
                Some(String::new()),
            ));
        }

        let has_metadata = s.contains('+');
        match (s.find('*'), s.rfind('*')) {
            (Some(first), Some(last)) if first != last && !has_metadata => {
                // Two stars only as `<stable>*-<prefix>*`.
                let dash = s.find('-').ok_or_else(invalid)?;
                if last != s.len() - 1 || first + 1 != dash {
                    return Err(invalid());
                }
                let stable = format!("{}0", &s[..first]);
                let behavior = match count_parts(&stable) {
                    1 => FloatBehavior::PrereleaseMajor,
                    2 => FloatBehavior::PrereleaseMinor,
                    3 => FloatBehavior::PrereleasePatch,
                    4 => FloatBehavior::PrereleaseRevision,
                    _ => return Err(invalid()),
                };
                let stable = if count_parts(&stable) == 1 {
                    format!("{stable}.0.0")
                } else {
                    stable
                };
                let prefix = &s[dash + 1..last];
                let mut release = prefix.to_string();
                if prefix.is_empty() || prefix.ends_with('.') {
                    release.push('0');
                }
                let min = Version::parse(&format!("{stable}-{release}")).map_err(|_| invalid())?;
                Ok(Self::new(behavior, Some(min), Some(prefix.to_string())))
            }
            (Some(_), Some(last)) if last == s.len() - 1 && !has_metadata => {
                let mut actual = s[..last].to_string();
                let mut prefix = None;
                let behavior = if !s.contains('-') {
                    actual.push('0');
                    match count_parts(&actual) {
                        2 => FloatBehavior::Minor,
                        3 => FloatBehavior::Patch,
                        4 => FloatBehavior::Revision,
                        _ => return Err(invalid()),
                    }
                } else {
                    if s.find('-') == s.rfind('-') {
                        let dash = actual.rfind('-').ok_or_else(invalid)?;
                        let label = actual[dash + 1..].to_string();
                        if label.is_empty() || actual.ends_with('.') {
                            actual.push('0');
                        }
                        prefix = Some(label);
                    }
                    FloatBehavior::Prerelease
                };
                let min = Version::parse(&actual).map_err(|_| invalid())?;
                Ok(Self::new(behavior, Some(min), prefix))
            }
            (None, None) => {
                let version = Version::parse(s)?;
                Ok(Self::new(FloatBehavior::None, Some(version), None))
            }
            _ => Err(invalid()),
        }
    }

    pub fn try_parse(input: &str) -> Option<Self> {
        Self::parse(input).ok()
    }
}

impl PartialEq for FloatRange {
    fn eq(&self, other: &Self) -> bool {
        self.behavior == other.behavior && self.min_version == other.min_version
    }
}

impl Eq for FloatRange {}

impl Hash for FloatRange {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.behavior.hash(state);
        self.min_version.hash(state);
    }
}

impl fmt::Display for FloatRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = self.release_prefix.as_deref().unwrap_or("");
        let Some(ref min) = self.min_version else {
            return match self.behavior {
                FloatBehavior::AbsoluteLatest => f.write_str("*-*"),
                _ => f.write_str("*"),
            };
        };
        let (major, minor, patch) = (min.major(), min.minor(), min.patch());
        match self.behavior {
            FloatBehavior::None => f.write_str(&min.to_normalized_string()),
            FloatBehavior::Prerelease => write!(f, "{}-{prefix}*", min.to_numeric_string()),
            FloatBehavior::Revision => write!(f, "{major}.{minor}.{patch}.*"),
            FloatBehavior::Patch => write!(f, "{major}.{minor}.*"),
            FloatBehavior::Minor => write!(f, "{major}.*"),
            FloatBehavior::Major => f.write_str("*"),
            FloatBehavior::PrereleaseRevision => {
                write!(f, "{major}.{minor}.{patch}.*-{prefix}*")
            }
            FloatBehavior::PrereleasePatch => write!(f, "{major}.{minor}.*-{prefix}*"),
            FloatBehavior::PrereleaseMinor => write!(f, "{major}.*-{prefix}*"),
            FloatBehavior::PrereleaseMajor => write!(f, "*-{prefix}*"),
            FloatBehavior::AbsoluteLatest => f.write_str("*-*"),
        }
    }
}

impl FromStr for FloatRange {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn count_parts(version: &str) -> usize {
    version.bytes().filter(|&b| b == b'.').count() + 1
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len()
        && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}
