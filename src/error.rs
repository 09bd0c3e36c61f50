//! Error kinds produced by the resolution engine.
//!
//! Every variant may wrap the failure that caused it, so a caller can walk
//! the chain with [`root_cause`] and show the innermost message.

use std::error::Error;
use std::fmt;
use std::path::PathBuf;

/// Boxed cause carried inside a [`ResolveError`].
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

#[derive(Debug)]
pub enum ResolveError {
    /// A repository could not be reached, refused the credentials, or
    /// answered with something other than "not found".
    Transport {
        repository: String,
        message: String,
        source: Option<BoxError>,
    },
    /// The coordinate does not exist in the repositories that were asked.
    NotFound {
        coordinate: String,
        repository: Option<String>,
    },
    /// No published version matches the requested range.
    RangeUnsatisfiable { coordinate: String },
    /// The payload did not match the checksum published next to it.
    Checksum {
        coordinate: String,
        repository: String,
        expected: String,
        actual: String,
    },
    /// Metadata or a POM could not be read.
    Parse { what: String, message: String },
    /// The local cache could not be written.
    CacheWrite { path: PathBuf, source: BoxError },
    /// The engine itself cannot be set up.
    Configuration {
        message: String,
        source: Option<BoxError>,
    },
}

pub type Result<T, E = ResolveError> = std::result::Result<T, E>;

impl ResolveError {
    pub fn transport(repository: &str, message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        ResolveError::Transport {
            repository: repository.to_string(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn not_found(coordinate: impl fmt::Display, repository: Option<&str>) -> Self {
        ResolveError::NotFound {
            coordinate: coordinate.to_string(),
            repository: repository.map(str::to_string),
        }
    }

    pub fn configuration(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        ResolveError::Configuration {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn cache_write(path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        ResolveError::CacheWrite {
            path: path.into(),
            source: source.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolveError::NotFound { .. })
    }

    /// Message of the innermost cause of this error.
    pub fn root_cause_message(&self) -> String {
        root_cause(self).to_string()
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::Transport {
                repository,
                message,
                ..
            } => write!(f, "Transfer from repository '{}' failed: {}", repository, message),
            ResolveError::NotFound {
                coordinate,
                repository: Some(repository),
            } => write!(f, "Could not find artifact {} in {}", coordinate, repository),
            ResolveError::NotFound {
                coordinate,
                repository: None,
            } => write!(f, "Could not find artifact {}", coordinate),
            ResolveError::RangeUnsatisfiable { coordinate } => {
                write!(f, "No versions available for {} within the requested range", coordinate)
            }
            ResolveError::Checksum {
                coordinate,
                repository,
                expected,
                actual,
            } => write!(
                f,
                "Checksum validation failed for {} from {}: expected {} but was {}",
                coordinate, repository, expected, actual
            ),
            ResolveError::Parse { what, message } => {
                write!(f, "Failed to parse {}: {}", what, message)
            }
            ResolveError::CacheWrite { path, source } => {
                write!(f, "Failed to write {:?}: {}", path, source)
            }
            ResolveError::Configuration { message, .. } => {
                write!(f, "Repository system is not usable: {}", message)
            }
        }
    }
}

impl Error for ResolveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ResolveError::Transport { source, .. } | ResolveError::Configuration { source, .. } => {
                source.as_deref().map(|e| e as &(dyn Error + 'static))
            }
            ResolveError::CacheWrite { source, .. } => Some(source.as_ref() as &(dyn Error + 'static)),
            _ => None,
        }
    }
}

/// Follows `source()` to the deepest error in the chain.
///
/// Stops early if an error reports itself as its own source.
pub fn root_cause<'a>(error: &'a (dyn Error + 'static)) -> &'a (dyn Error + 'static) {
    let mut current = error;
    while let Some(next) = current.source() {
        if std::ptr::addr_eq(current as *const dyn Error, next as *const dyn Error) {
            break;
        }
        current = next;
    }
    current
}
