//! Choosing one library for a requested range.
//!
//! Tiers are consulted in order: project, lock-file pins, then local and
//! remote package providers. Within a tier all providers are queried
//! concurrently and the best answer wins.

use std::sync::Arc;

use depwalk_core::{Framework, LibraryIdentity, LibraryRange, TypeConstraint};
use depwalk_versioning::{Version, VersionRange};
use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::context::WalkContext;
use crate::error::{ProviderError, WalkError};
use crate::graph::{ProviderMatch, ProviderTier};
use crate::provider::DependencyProvider;

/// A library chosen for a range and the provider that offered it.
#[derive(Clone)]
pub struct RemoteMatch {
    pub identity: LibraryIdentity,
    pub provider: Arc<dyn DependencyProvider>,
    pub tier: ProviderTier,
}

impl RemoteMatch {
    pub fn provider_match(&self) -> ProviderMatch {
        ProviderMatch {
            source: self.provider.source().to_string(),
            is_http: self.provider.is_http(),
            tier: self.tier,
        }
    }
}

impl std::fmt::Debug for RemoteMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteMatch")
            .field("identity", &self.identity)
            .field("source", &self.provider.source())
            .field("tier", &self.tier)
            .finish()
    }
}

/// Provider lookups for one walk.
pub struct Matcher<'a> {
    context: &'a WalkContext,
    framework: &'a Framework,
    cancel: &'a CancellationToken,
    permits: &'a Semaphore,
}

impl<'a> Matcher<'a> {
    pub fn new(
        context: &'a WalkContext,
        framework: &'a Framework,
        cancel: &'a CancellationToken,
        permits: &'a Semaphore,
    ) -> Self {
        Self {
            context,
            framework,
            cancel,
            permits,
        }
    }

    /// Pick the library that satisfies `range`, or `None` if no tier can.
    pub async fn find_library_match(
        &self,
        range: &LibraryRange,
    ) -> Result<Option<RemoteMatch>, WalkError> {
        let constraint = range.type_constraint;

        if constraint.allows_project() {
            for provider in &self.context.project_providers {
                if !provider.supports_type(constraint) {
                    continue;
                }
                if let Some(found) = self.query(provider, range, ProviderTier::Project).await? {
                    return Ok(Some(found));
                }
            }
        }

        let Some(version_range) = range.version_range.as_ref() else {
            return Ok(None);
        };
        if !constraint.allows_package() {
            return Ok(None);
        }

        if let Some(pins) = self.context.pins_for(self.framework) {
            let Some(pinned) = pins.version_of(&range.name) else {
                debug!("{} is not pinned for {}", range.name, self.framework);
                return Ok(None);
            };
            let exact = exact_range(range, pinned.clone());
            if let Some(local) = self.find_in_tier(ProviderTier::Local, &exact).await? {
                return Ok(Some(local));
            }
            return self.find_in_tier(ProviderTier::Remote, &exact).await;
        }

        if version_range.is_floating() {
            let Some(remote) = self.find_in_tier(ProviderTier::Remote, range).await? else {
                return self.find_in_tier(ProviderTier::Local, range).await;
            };
            let exact = exact_range(range, remote.identity.version.clone());
            if let Some(local) = self.find_in_tier(ProviderTier::Local, &exact).await? {
                if local.identity.version == remote.identity.version {
                    return Ok(Some(local));
                }
            }
            return Ok(Some(remote));
        }

        let local = self.find_in_tier(ProviderTier::Local, range).await?;
        if let Some(ref local) = local {
            if version_range.min_version() == Some(&local.identity.version) {
                return Ok(Some(local.clone()));
            }
        }

        let remote = self.find_in_tier(ProviderTier::Remote, range).await?;
        match (local, remote) {
            (None, Some(remote)) => {
                let exact = exact_range(range, remote.identity.version.clone());
                match self.find_in_tier(ProviderTier::Local, &exact).await? {
                    Some(local) => Ok(Some(local)),
                    None => Ok(Some(remote)),
                }
            }
            (Some(local), Some(remote)) => {
                let better = version_range.is_better(
                    Some(&local.identity.version),
                    Some(&remote.identity.version),
                );
                Ok(Some(if better { remote } else { local }))
            }
            (local, None) => Ok(local),
        }
    }

    fn providers(&self, tier: ProviderTier) -> &'a [Arc<dyn DependencyProvider>] {
        match tier {
            ProviderTier::Project => &self.context.project_providers,
            ProviderTier::Local => &self.context.local_providers,
            ProviderTier::Remote => &self.context.remote_providers,
        }
    }

    /// Best match for `range` among the providers of `tier`.
    ///
    /// For fixed ranges filesystem-backed providers are tried before http
    /// ones, and http providers are skipped when the filesystem already had
    /// the requested minimum.
    pub async fn find_in_tier(
        &self,
        tier: ProviderTier,
        range: &LibraryRange,
    ) -> Result<Option<RemoteMatch>, WalkError> {
        let providers = self.providers(tier);
        if providers.is_empty() {
            return Ok(None);
        }

        if !range.is_floating() && self.context.config.prefer_filesystem_sources {
            let (http, filesystem): (Vec<_>, Vec<_>) =
                providers.iter().cloned().partition(|p| p.is_http());
            if !http.is_empty() && !filesystem.is_empty() {
                let from_disk = self.race(&filesystem, range, tier).await?;
                if from_disk
                    .as_ref()
                    .is_some_and(|m| is_exact_minimum(range, &m.identity))
                {
                    return Ok(from_disk);
                }
                let from_http = self.race(&http, range, tier).await?;
                return Ok(pick_better(range, from_disk, from_http));
            }
        }

        self.race(providers, range, tier).await
    }

    /// Query `providers` concurrently. An answer equal to an inclusive
    /// minimum of a fixed range ends the race; otherwise all answers are
    /// collected and the best one is kept, earlier providers winning ties.
    async fn race(
        &self,
        providers: &[Arc<dyn DependencyProvider>],
        range: &LibraryRange,
        tier: ProviderTier,
    ) -> Result<Option<RemoteMatch>, WalkError> {
        let mut pending: FuturesUnordered<_> = providers
            .iter()
            .enumerate()
            .map(|(order, provider)| async move {
                (order, self.query(provider, range, tier).await)
            })
            .collect();

        let mut answers = Vec::with_capacity(providers.len());
        while let Some((order, result)) = pending.next().await {
            let Some(found) = result? else { continue };
            if is_exact_minimum(range, &found.identity) {
                return Ok(Some(found));
            }
            answers.push((order, found));
        }

        answers.sort_by_key(|(order, _)| *order);
        Ok(answers
            .into_iter()
            .map(|(_, found)| found)
            .fold(None, |best, candidate| {
                pick_better(range, best, Some(candidate))
            }))
    }

    /// Ask one provider, observing cancellation and the concurrency limit.
    async fn query(
        &self,
        provider: &Arc<dyn DependencyProvider>,
        range: &LibraryRange,
        tier: ProviderTier,
    ) -> Result<Option<RemoteMatch>, WalkError> {
        if self.cancel.is_cancelled() {
            return Err(WalkError::Cancelled);
        }
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| WalkError::Cancelled)?;

        let result = tokio::select! {
            _ = self.cancel.cancelled() => return Err(WalkError::Cancelled),
            result = provider.find_best_match(range, self.framework, self.cancel) => result,
        };

        match result {
            Ok(Some(identity)) => {
                debug!(source = provider.source(), %tier, "{range} matched {identity}");
                Ok(Some(RemoteMatch {
                    identity,
                    provider: Arc::clone(provider),
                    tier,
                }))
            }
            Ok(None) => {
                debug!(source = provider.source(), %tier, "{range} not found");
                Ok(None)
            }
            Err(ProviderError::Cancelled) => Err(WalkError::Cancelled),
            Err(e) => {
                warn!(source = provider.source(), %tier, "lookup of {range} failed: {e}");
                Ok(None)
            }
        }
    }
}

/// A package request for exactly `version` of the library `range` names.
fn exact_range(range: &LibraryRange, version: Version) -> LibraryRange {
    LibraryRange::new(
        range.name.clone(),
        Some(VersionRange::exact(version)),
        TypeConstraint::PACKAGE,
    )
}

/// True if `identity` is exactly the inclusive minimum of a fixed range.
fn is_exact_minimum(range: &LibraryRange, identity: &LibraryIdentity) -> bool {
    let Some(version_range) = range.version_range.as_ref() else {
        return false;
    };
    !version_range.is_floating()
        && version_range.is_min_inclusive()
        && version_range.min_version() == Some(&identity.version)
}

fn pick_better(
    range: &LibraryRange,
    current: Option<RemoteMatch>,
    considering: Option<RemoteMatch>,
) -> Option<RemoteMatch> {
    match (current, considering) {
        (Some(current), Some(considering)) => {
            let better = range.version_range.as_ref().is_some_and(|r| {
                r.is_better(Some(&current.identity.version), Some(&considering.identity.version))
            });
            Some(if better { considering } else { current })
        }
        (current, None) => current,
        (None, considering) => considering,
    }
}
