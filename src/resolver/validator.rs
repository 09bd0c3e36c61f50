//! Checks that a repository is reachable and accepts its credentials.

use log::{debug, info};

use super::{ArtifactFetcher, ResolutionContext};
use crate::coordinate::ArtifactCoordinate;
use crate::repository::{RepositoryDescriptor, RepositoryRegistry};
use crate::runtime::Runtime;

/// Coordinate no repository is expected to host.
pub const PROBE_COORDINATE: &str = "test:test:1.0";

pub struct RepositoryValidator<'a, R: Runtime> {
    context: &'a ResolutionContext<'a, R>,
}

impl<'a, R: Runtime> RepositoryValidator<'a, R> {
    pub fn new(context: &'a ResolutionContext<'a, R>) -> Self {
        Self { context }
    }

    /// Probes `descriptor` with [`PROBE_COORDINATE`], ignoring the cache.
    ///
    /// Returns an empty string when the repository answered "not found",
    /// otherwise the message of the deepest error.
    #[tracing::instrument(skip(self, registry, descriptor), fields(repository = %descriptor.id))]
    pub async fn validate(
        &self,
        registry: &RepositoryRegistry,
        descriptor: &RepositoryDescriptor,
    ) -> String {
        let repository = registry.build_repository(descriptor);
        let probe = ArtifactCoordinate::new("test", "test", "1.0");
        let repositories = std::slice::from_ref(&repository);
        let fetcher = ArtifactFetcher::new(self.context, repositories).bypass_cache();

        match fetcher.resolve(&probe, Some(&repository)).await {
            Err(e) if e.is_not_found() => {
                debug!("{} answered the probe", repository);
                String::new()
            }
            Err(e) => {
                info!("Validation of {} failed: {}", repository, e);
                e.root_cause_message()
            }
            Ok(_) => {
                debug!("{} hosts {}", repository, PROBE_COORDINATE);
                String::new()
            }
        }
    }
}
