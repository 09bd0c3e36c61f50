use anyhow::{Context, Result};
use log::debug;

use super::config::{Config, Options};
use crate::coordinate::ArtifactCoordinate;
use crate::pom::Exclusion;
use crate::resolver::classpath_string;
use crate::runtime::Runtime;

/// `group:name` means any version.
fn with_open_range(coordinate: &str) -> String {
    if coordinate.split(':').count() == 2 {
        format!("{}:[0,)", coordinate)
    } else {
        coordinate.to_string()
    }
}

fn parse(coordinate: &str) -> Result<ArtifactCoordinate> {
    with_open_range(coordinate)
        .parse()
        .with_context(|| format!("Cannot read coordinate '{}'", coordinate))
}

/// Print every version within the range, with the repository it came from.
#[tracing::instrument(skip(runtime, options))]
pub async fn versions<R: Runtime>(runtime: R, options: &Options, coordinate: &str) -> Result<()> {
    let coordinate = parse(coordinate)?;
    let (_, system) = Config::load(runtime, options)?;

    let versions = system.versions(&coordinate).await;
    if versions.is_empty() {
        anyhow::bail!("No versions of {} found", coordinate);
    }
    for version in versions.candidates() {
        let repository = system.remote_repository(&versions, version);
        println!("{} {}", version, repository.id());
    }
    Ok(())
}

/// Print the newest release within the range.
#[tracing::instrument(skip(runtime, options))]
pub async fn latest<R: Runtime>(runtime: R, options: &Options, coordinate: &str) -> Result<()> {
    let coordinate = parse(coordinate)?;
    let (_, system) = Config::load(runtime, options)?;

    match system.latest_release(&coordinate).await {
        Some(version) => {
            println!("{}", version);
            Ok(())
        }
        None => anyhow::bail!("No release of {}:{} found", coordinate.group(), coordinate.name()),
    }
}

/// Fetch and install artifacts, printing the path of the first one.
#[tracing::instrument(skip(runtime, options))]
pub async fn fetch<R: Runtime>(
    runtime: R,
    options: &Options,
    coordinates: &[String],
    repository: Option<&str>,
) -> Result<()> {
    let coordinates = coordinates
        .iter()
        .map(|c| c.parse::<ArtifactCoordinate>())
        .collect::<Result<Vec<_>>>()?;
    let Some(primary) = coordinates.first() else {
        anyhow::bail!("Nothing to fetch");
    };
    let (_, system) = Config::load(runtime, options)?;

    let path = system.fetch(&coordinates, repository).await;
    if path.is_empty() {
        anyhow::bail!("Could not resolve {}", primary);
    }
    debug!("{} installed at {}", primary, path);
    println!("{}", path);
    Ok(())
}

/// Print the runtime classpath of an artifact, without the artifact itself.
#[tracing::instrument(skip(runtime, options))]
pub async fn classpath<R: Runtime>(
    runtime: R,
    options: &Options,
    coordinate: &str,
    repository: Option<&str>,
    excludes: &[String],
) -> Result<()> {
    let coordinate: ArtifactCoordinate = coordinate.parse()?;
    let exclusions = excludes
        .iter()
        .map(|e| e.parse::<Exclusion>())
        .collect::<Result<Vec<_>>>()?;
    let (_, system) = Config::load(runtime, options)?;

    let paths = system.classpath(&coordinate, repository, &exclusions).await;
    println!("{}", classpath_string(&paths));
    Ok(())
}
