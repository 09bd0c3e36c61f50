use anyhow::Result;
use log::debug;
use std::path::PathBuf;

use crate::runtime::Runtime;
use crate::settings::Settings;
use crate::system::RepositorySystem;

/// Global command-line options shared by every command.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub settings: Option<PathBuf>,
    pub local_repo: Option<PathBuf>,
    pub releases_only: bool,
}

/// Settings as loaded for one command, and where to save them back.
pub struct Config {
    pub settings: Settings,
    pub settings_path: PathBuf,
}

impl Config {
    /// Loads settings and builds the repository system they describe.
    #[tracing::instrument(skip(runtime, options))]
    pub fn load<R: Runtime>(runtime: R, options: &Options) -> Result<(Self, RepositorySystem<R>)> {
        let settings_path = match &options.settings {
            Some(path) => path.clone(),
            None => Settings::default_path(&runtime)?,
        };
        let mut settings = Settings::load(&runtime, &settings_path)?;
        if options.releases_only {
            settings.releases_only = true;
        }

        let local_repository = settings.local_repository_root(&runtime, options.local_repo.clone())?;
        debug!("Using settings {:?}, local repository {:?}", settings_path, local_repository);

        let system = RepositorySystem::new(runtime, &settings, local_repository)?;
        Ok((
            Self {
                settings,
                settings_path,
            },
            system,
        ))
    }
}
