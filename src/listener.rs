//! Status messages emitted while resolving.
//!
//! Listeners are informational only; nothing they do feeds back into a
//! resolution.

use log::debug;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::coordinate::ArtifactCoordinate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionEvent {
    TransferSucceeded { repository: String, path: String },
    TransferFailed {
        repository: String,
        path: String,
        message: String,
    },
    ArtifactResolved {
        coordinate: ArtifactCoordinate,
        repository: String,
    },
    ArtifactInstalled {
        coordinate: ArtifactCoordinate,
        path: PathBuf,
    },
    MetadataInvalidated { path: PathBuf },
}

impl std::fmt::Display for ResolutionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolutionEvent::TransferSucceeded { repository, path } => {
                write!(f, "Downloaded {} from {}", path, repository)
            }
            ResolutionEvent::TransferFailed {
                repository,
                path,
                message,
            } => write!(f, "Failed to download {} from {}: {}", path, repository, message),
            ResolutionEvent::ArtifactResolved {
                coordinate,
                repository,
            } => write!(f, "Resolved {} from {}", coordinate, repository),
            ResolutionEvent::ArtifactInstalled { coordinate, path } => {
                write!(f, "Installed {} to {:?}", coordinate, path)
            }
            ResolutionEvent::MetadataInvalidated { path } => {
                write!(f, "Removed stale metadata {:?}", path)
            }
        }
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait ResolutionListener: Send + Sync {
    fn on_event(&self, event: &ResolutionEvent);
}

/// Writes every event to the log at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingListener;

impl ResolutionListener for LoggingListener {
    fn on_event(&self, event: &ResolutionEvent) {
        debug!("{}", event);
    }
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<ResolutionEvent>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ResolutionEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl ResolutionListener for RecordingListener {
    fn on_event(&self, event: &ResolutionEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
