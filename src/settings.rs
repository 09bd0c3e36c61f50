use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::http::{MAX_RETRIES, RETRY_DELAY_MS, RetryPolicy};
use crate::repository::RepositoryDescriptor;
use crate::runtime::Runtime;

/// Environment variable overriding the local repository location.
pub const LOCAL_REPO_ENV: &str = "MAVENKIT_LOCAL_REPO";

/// Persistent user settings, stored as JSON.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub local_repository: Option<PathBuf>,
    pub releases_only: bool,
    /// Whether the built-in repositories come before `repositories`.
    pub use_presets: bool,
    pub repositories: Vec<RepositoryDescriptor>,
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            local_repository: None,
            releases_only: false,
            use_presets: true,
            repositories: Vec::new(),
            connect_timeout_secs: 10,
            timeout_secs: 60,
            max_retries: MAX_RETRIES,
            retry_delay_ms: RETRY_DELAY_MS,
        }
    }
}

impl Settings {
    /// `<config dir>/mavenkit/settings.json`
    pub fn default_path<R: Runtime>(runtime: &R) -> Result<PathBuf> {
        let config_dir = runtime
            .config_dir()
            .context("Could not find configuration directory")?;
        Ok(config_dir.join("mavenkit").join("settings.json"))
    }

    /// Reads settings from `path`; a missing file gives the defaults.
    #[tracing::instrument(skip(runtime, path))]
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        if !runtime.exists(path) {
            debug!("No settings at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = runtime.read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)
            .with_context(|| format!("Invalid settings file {:?}", path))?;
        Ok(settings)
    }

    #[tracing::instrument(skip(self, runtime, path))]
    pub fn save<R: Runtime>(&self, runtime: &R, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            runtime.create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let tmp_path = path.with_extension("json.tmp");
        runtime.write(&tmp_path, json.as_bytes())?;
        runtime.rename(&tmp_path, path)?;
        Ok(())
    }

    /// Where the local repository lives: `cli`, then the environment, then
    /// the settings file, then `~/.m2/repository`.
    pub fn local_repository_root<R: Runtime>(
        &self,
        runtime: &R,
        cli: Option<PathBuf>,
    ) -> Result<PathBuf> {
        if let Some(path) = cli {
            return Ok(path);
        }
        if let Ok(path) = runtime.env_var(LOCAL_REPO_ENV)
            && !path.trim().is_empty()
        {
            return Ok(PathBuf::from(path));
        }
        if let Some(path) = &self.local_repository {
            return Ok(path.clone());
        }
        let home = runtime.home_dir().context("Could not find home directory")?;
        Ok(home.join(".m2").join("repository"))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.retry_delay_ms))
    }
}
