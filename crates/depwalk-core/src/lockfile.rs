use serde::{Deserialize, Serialize};
use std::path::Path;

use depwalk_util::errors::DepwalkError;
use depwalk_versioning::Version;

use crate::library::Framework;

/// Exact versions recorded by a previous restore, grouped by framework.
///
/// When a framework has pins, the walker resolves only pinned versions for
/// it and treats any unpinned library as unresolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedLibraries {
    #[serde(default)]
    pub target: Vec<LockedTarget>,
}

/// Pins for one target framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedTarget {
    pub framework: Framework,
    #[serde(default)]
    pub library: Vec<LockedLibrary>,
}

/// A single pinned library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedLibrary {
    pub name: String,
    pub version: Version,
}

impl LockedTarget {
    /// The pinned version of `name`, matched case-insensitively.
    pub fn version_of(&self, name: &str) -> Option<&Version> {
        self.library
            .iter()
            .find(|lib| lib.name.eq_ignore_ascii_case(name))
            .map(|lib| &lib.version)
    }
}

impl LockedLibraries {
    /// Load and parse pins from a TOML file.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DepwalkError::LockFile {
            message: format!("Failed to read lock file {}: {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> miette::Result<Self> {
        let locked: Self = toml::from_str(content).map_err(|e| DepwalkError::LockFile {
            message: format!("Failed to parse lock file: {e}"),
        })?;
        let mut seen = std::collections::HashSet::new();
        if let Some(dup) = locked.target.iter().find(|t| !seen.insert(&t.framework)) {
            return Err(DepwalkError::LockFile {
                message: format!("framework '{}' appears more than once", dup.framework),
            }
            .into());
        }
        Ok(locked)
    }

    /// Serialize the pins to a pretty-printed TOML string.
    pub fn to_string_pretty(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Write the pins to `path`, replacing any existing file.
    pub fn write_to(&self, path: &Path) -> miette::Result<()> {
        let content = self.to_string_pretty().map_err(|e| DepwalkError::LockFile {
            message: format!("Failed to serialize lock file: {e}"),
        })?;
        std::fs::write(path, content).map_err(DepwalkError::from)?;
        Ok(())
    }

    /// The pins recorded for `framework`, if any.
    pub fn pins_for(&self, framework: &Framework) -> Option<&LockedTarget> {
        self.target
            .iter()
            .find(|t| &t.framework == framework)
            .filter(|t| !t.library.is_empty())
    }

    /// Record `name` at `version` for `framework`, replacing an existing pin.
    pub fn pin(&mut self, framework: &Framework, name: &str, version: Version) {
        let index = match self.target.iter().position(|t| &t.framework == framework) {
            Some(index) => index,
            None => {
                self.target.push(LockedTarget {
                    framework: framework.clone(),
                    library: Vec::new(),
                });
                self.target.len() - 1
            }
        };
        let target = &mut self.target[index];
        match target
            .library
            .iter_mut()
            .find(|lib| lib.name.eq_ignore_ascii_case(name))
        {
            Some(existing) => existing.version = version,
            None => target.library.push(LockedLibrary {
                name: name.to_string(),
                version,
            }),
        }
    }
}
