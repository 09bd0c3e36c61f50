pub mod cache;
pub mod commands;
pub mod coordinate;
pub mod error;
pub mod http;
pub mod library;
pub mod listener;
pub mod metadata;
pub mod pom;
pub mod repository;
pub mod resolver;
pub mod runtime;
pub mod settings;
pub mod system;
pub mod transport;
pub mod version;

pub use coordinate::ArtifactCoordinate;
pub use error::{ResolveError, Result};
pub use system::RepositorySystem;
