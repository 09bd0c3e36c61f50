use anyhow::Result;
use log::{debug, warn};
use std::path::Path;

use super::config::{Config, Options};
use crate::cache::LocalCache;
use crate::coordinate::ArtifactCoordinate;
use crate::library::Library;
use crate::runtime::Runtime;

/// List the members of a component library.
#[tracing::instrument(skip(runtime))]
pub fn list<R: Runtime>(runtime: R, dir: &Path) -> Result<()> {
    let library = Library::new(&runtime, dir);
    let entries = library.list()?;
    if entries.is_empty() {
        println!("Library {:?} is empty.", dir);
        return Ok(());
    }

    for entry in entries {
        let linked = if entry.linked { " (linked)" } else { "" };
        println!("{} {}{}", entry.kind, entry.path.display(), linked);
    }
    Ok(())
}

/// Fetch an artifact and link its jar into the library.
#[tracing::instrument(skip(runtime, options))]
pub async fn add<R: Runtime>(
    runtime: R,
    options: &Options,
    dir: &Path,
    coordinate: &str,
    repository: Option<&str>,
) -> Result<()> {
    let coordinate: ArtifactCoordinate = coordinate.parse()?;
    let (_, system) = Config::load(runtime, options)?;

    let path = system.fetch(std::slice::from_ref(&coordinate), repository).await;
    if path.is_empty() {
        anyhow::bail!("Could not resolve {}", coordinate);
    }
    Library::new(system.runtime(), dir).add_jar(Path::new(&path))?;

    println!("Added {} to library {}", path, dir.display());
    Ok(())
}

/// Drop a jar, FXML file or folder from the library.
#[tracing::instrument(skip(runtime))]
pub fn remove<R: Runtime>(runtime: R, dir: &Path, path: &Path) -> Result<()> {
    let library = Library::new(&runtime, dir);
    if !library.remove_entry(path)? {
        anyhow::bail!("{} is not part of library {}", path.display(), dir.display());
    }
    println!("Removed {} from library {}", path.display(), dir.display());
    Ok(())
}

/// Resolve the library's jars again, restoring the ones that came from the
/// local repository and have since been deleted. Prints the usable jars.
#[tracing::instrument(skip(runtime, options))]
pub async fn resolve<R: Runtime>(
    runtime: R,
    options: &Options,
    dir: &Path,
    repository: Option<&str>,
) -> Result<()> {
    let (_, system) = Config::load(runtime, options)?;
    let runtime = system.runtime();
    let library = Library::new(runtime, dir);
    let cache = LocalCache::new(runtime, runtime.absolute(system.local_repository())?);

    let mut jars = library.jars()?;
    for recorded in library.recorded_jars()? {
        if !jars.contains(&recorded) {
            jars.push(recorded);
        }
    }

    let mut unresolved = 0;
    for jar in jars {
        let Some(coordinate) = cache.coordinate_of(&jar) else {
            if runtime.is_file(&jar) {
                println!("{}", jar.display());
            } else {
                warn!("{:?} is gone and did not come from the local repository", jar);
                unresolved += 1;
            }
            continue;
        };

        let path = system.fetch(std::slice::from_ref(&coordinate), repository).await;
        if path.is_empty() {
            warn!("Could not resolve {} for {:?}", coordinate, jar);
            unresolved += 1;
            continue;
        }
        debug!("{} resolved to {}", coordinate, path);
        println!("{}", path);
    }

    if unresolved > 0 {
        anyhow::bail!("{} jar(s) of library {} could not be resolved", unresolved, dir.display());
    }
    Ok(())
}
