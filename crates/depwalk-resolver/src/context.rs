//! Everything a walk needs besides the root request.

use std::sync::Arc;

use depwalk_core::config::WalkerConfig;
use depwalk_core::lockfile::{LockedLibraries, LockedTarget};
use depwalk_core::Framework;

use crate::provider::DependencyProvider;

/// Provider tiers in priority order, plus optional pins and settings.
///
/// Project providers answer first; local providers are filesystem-backed
/// caches; remote providers are feeds. Order within a tier only matters for
/// tie-breaking between equally good matches.
#[derive(Clone, Default)]
pub struct WalkContext {
    pub project_providers: Vec<Arc<dyn DependencyProvider>>,
    pub local_providers: Vec<Arc<dyn DependencyProvider>>,
    pub remote_providers: Vec<Arc<dyn DependencyProvider>>,
    pub locked: Option<LockedLibraries>,
    pub config: WalkerConfig,
}

impl WalkContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project_provider(mut self, provider: Arc<dyn DependencyProvider>) -> Self {
        self.project_providers.push(provider);
        self
    }

    pub fn with_local_provider(mut self, provider: Arc<dyn DependencyProvider>) -> Self {
        self.local_providers.push(provider);
        self
    }

    pub fn with_remote_provider(mut self, provider: Arc<dyn DependencyProvider>) -> Self {
        self.remote_providers.push(provider);
        self
    }

    pub fn with_locked(mut self, locked: LockedLibraries) -> Self {
        self.locked = Some(locked);
        self
    }

    pub fn with_config(mut self, config: WalkerConfig) -> Self {
        self.config = config;
        self
    }

    /// Pins recorded for `framework`, if the walk is locked.
    pub fn pins_for(&self, framework: &Framework) -> Option<&LockedTarget> {
        self.locked.as_ref()?.pins_for(framework)
    }
}

impl std::fmt::Debug for WalkContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = |providers: &[Arc<dyn DependencyProvider>]| {
            providers.iter().map(|p| p.source().to_string()).collect::<Vec<_>>()
        };
        f.debug_struct("WalkContext")
            .field("project_providers", &names(&self.project_providers))
            .field("local_providers", &names(&self.local_providers))
            .field("remote_providers", &names(&self.remote_providers))
            .field("locked", &self.locked.is_some())
            .field("config", &self.config)
            .finish()
    }
}
