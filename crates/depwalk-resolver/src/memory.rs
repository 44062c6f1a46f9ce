//! A provider backed by a map of libraries held in memory.
//!
//! Useful for embedding a fixed package set and for exercising the walker
//! without a real source. Every call is counted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use depwalk_core::{
    Framework, LibraryDependency, LibraryIdentity, LibraryRange, LibraryType, TypeConstraint,
};
use depwalk_versioning::Version;
use tokio_util::sync::CancellationToken;

use crate::error::ProviderError;
use crate::provider::DependencyProvider;

#[derive(Debug)]
pub struct InMemoryProvider {
    source: String,
    is_http: bool,
    library_type: LibraryType,
    /// Lower-cased name to the versions on offer and their dependencies.
    libraries: HashMap<String, Vec<(Version, Vec<LibraryDependency>)>>,
    failure: Option<String>,
    delay: Option<Duration>,
    find_calls: AtomicUsize,
    dependency_calls: AtomicUsize,
}

impl InMemoryProvider {
    /// An empty filesystem-style package source.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            is_http: false,
            library_type: LibraryType::Package,
            libraries: HashMap::new(),
            failure: None,
            delay: None,
            find_calls: AtomicUsize::new(0),
            dependency_calls: AtomicUsize::new(0),
        }
    }

    /// An empty source answering with projects instead of packages.
    pub fn projects(source: impl Into<String>) -> Self {
        Self {
            library_type: LibraryType::Project,
            ..Self::new(source)
        }
    }

    /// Mark the source as a network feed.
    pub fn http(mut self) -> Self {
        self.is_http = true;
        self
    }

    /// Offer `name` at `version` with the given dependencies.
    pub fn with_library(
        mut self,
        name: &str,
        version: Version,
        dependencies: Vec<LibraryDependency>,
    ) -> Self {
        self.libraries
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push((version, dependencies));
        self
    }

    /// Make every call fail with a transport error.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn dependency_calls(&self) -> usize {
        self.dependency_calls.load(Ordering::SeqCst)
    }

    async fn simulate(&self, cancel: &CancellationToken) -> Result<(), ProviderError> {
        if let Some(delay) = self.delay {
            tokio::select! {
                _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
        match self.failure {
            Some(ref message) => Err(ProviderError::transport(&self.source, message.clone())),
            None => Ok(()),
        }
    }

    fn entries(&self, name: &str) -> &[(Version, Vec<LibraryDependency>)] {
        self.libraries
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

#[async_trait]
impl DependencyProvider for InMemoryProvider {
    fn source(&self) -> &str {
        &self.source
    }

    fn is_http(&self) -> bool {
        self.is_http
    }

    fn supports_type(&self, constraint: TypeConstraint) -> bool {
        match self.library_type {
            LibraryType::Project => constraint.allows_project(),
            _ => constraint.allows_package(),
        }
    }

    async fn find_best_match(
        &self,
        range: &LibraryRange,
        _framework: &Framework,
        cancel: &CancellationToken,
    ) -> Result<Option<LibraryIdentity>, ProviderError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate(cancel).await?;

        let entries = self.entries(&range.name);
        let best = match range.version_range {
            Some(ref version_range) => {
                version_range.find_best_match(entries.iter().map(|(version, _)| version))
            }
            // Projects answer without a version range; take the highest.
            None => entries.iter().map(|(version, _)| version).max(),
        };
        Ok(best.map(|version| {
            LibraryIdentity::new(range.name.clone(), version.clone(), self.library_type)
        }))
    }

    async fn get_dependencies(
        &self,
        identity: &LibraryIdentity,
        _framework: &Framework,
        cancel: &CancellationToken,
    ) -> Result<Vec<LibraryDependency>, ProviderError> {
        self.dependency_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate(cancel).await?;

        Ok(self
            .entries(&identity.name)
            .iter()
            .find(|(version, _)| *version == identity.version)
            .map(|(_, dependencies)| dependencies.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depwalk_versioning::VersionRange;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[tokio::test]
    async fn picks_best_version_for_range() {
        let provider = InMemoryProvider::new("disk")
            .with_library("A", v("1.0.0"), Vec::new())
            .with_library("A", v("1.5.0"), Vec::new());
        let cancel = CancellationToken::new();
        let fw = Framework::new("net8.0");

        let range = LibraryRange::package("a", VersionRange::parse("1.1").unwrap());
        let found = provider.find_best_match(&range, &fw, &cancel).await.unwrap();
        assert_eq!(found.unwrap().version, v("1.5.0"));
        assert_eq!(provider.find_calls(), 1);
    }

    #[tokio::test]
    async fn failing_provider_reports_transport_error() {
        let provider = InMemoryProvider::new("feed").http().failing("503");
        let cancel = CancellationToken::new();
        let range = LibraryRange::package("A", VersionRange::parse("1.0").unwrap());
        let err = provider
            .find_best_match(&range, &Framework::new("net8.0"), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Transport { .. }));
    }

    #[test]
    fn project_provider_supports_project_constraints() {
        let provider = InMemoryProvider::projects("workspace");
        assert!(provider.supports_type(TypeConstraint::PROJECT));
        assert!(!provider.supports_type(TypeConstraint::PACKAGE));
    }
}
