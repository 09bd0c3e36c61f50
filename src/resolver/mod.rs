//! The resolution engine.
//!
//! - `version` - version ranges against repository metadata
//! - `artifact` - single artifacts, batches, and installation
//! - `graph` - transitive dependencies flattened to a classpath
//! - `validator` - reachability and credential probe for a repository
//!
//! Every resolver borrows a [`ResolutionContext`]; none keeps state
//! between calls.

mod artifact;
mod graph;
mod validator;
mod version;

#[cfg(test)]
pub(crate) mod testing;

pub use artifact::{ArtifactFetcher, ResolvedArtifact};
pub use graph::{DependencyGraphResolver, DependencyNode, classpath_string};
pub use validator::{PROBE_COORDINATE, RepositoryValidator};
pub use version::{ResolvedVersionSet, VersionResolver};

use crate::cache::LocalCache;
use crate::listener::{ResolutionEvent, ResolutionListener};
use crate::runtime::Runtime;
use crate::transport::Transport;

/// What every resolver needs: where the cache lives, how to reach a
/// repository, and who to tell about it.
pub struct ResolutionContext<'a, R: Runtime> {
    pub cache: LocalCache<'a, R>,
    pub transport: &'a dyn Transport,
    pub listener: &'a dyn ResolutionListener,
}

impl<'a, R: Runtime> ResolutionContext<'a, R> {
    pub fn new(
        cache: LocalCache<'a, R>,
        transport: &'a dyn Transport,
        listener: &'a dyn ResolutionListener,
    ) -> Self {
        Self {
            cache,
            transport,
            listener,
        }
    }

    pub(crate) fn emit(&self, event: ResolutionEvent) {
        self.listener.on_event(&event);
    }
}
