use anyhow::Result;
use log::info;

use super::config::{Config, Options};
use crate::repository::RepositoryDescriptor;
use crate::runtime::Runtime;

/// List the repositories in lookup order.
#[tracing::instrument(skip(runtime, options))]
pub fn repos<R: Runtime>(runtime: R, options: &Options) -> Result<()> {
    let (_, system) = Config::load(runtime, options)?;
    let user: Vec<String> = system
        .registry()
        .user_repositories()
        .iter()
        .map(|d| d.id.clone())
        .collect();

    for descriptor in system.repositories() {
        let origin = if user.contains(&descriptor.id) { "user" } else { "preset" };
        let auth = if descriptor.credentials.is_some() { " (authenticated)" } else { "" };
        println!("{} {} [{}]{}", descriptor.id, descriptor.url, origin, auth);
    }
    Ok(())
}

/// Probe a repository without registering it.
#[tracing::instrument(skip(runtime, options, descriptor), fields(id = %descriptor.id))]
pub async fn validate<R: Runtime>(
    runtime: R,
    options: &Options,
    descriptor: &RepositoryDescriptor,
) -> Result<()> {
    let (_, system) = Config::load(runtime, options)?;
    let message = system.validate(descriptor).await;
    if !message.is_empty() {
        anyhow::bail!("Repository '{}' is not usable: {}", descriptor.id, message);
    }
    println!("Repository '{}' is reachable", descriptor.id);
    Ok(())
}

/// Validate a repository and save it to the settings.
#[tracing::instrument(skip(runtime, options, descriptor), fields(id = %descriptor.id))]
pub async fn add<R: Runtime>(
    runtime: R,
    options: &Options,
    descriptor: RepositoryDescriptor,
) -> Result<()> {
    let (mut config, system) = Config::load(runtime, options)?;
    if system.registry().contains(&descriptor.id) {
        anyhow::bail!("A repository with id '{}' already exists", descriptor.id);
    }

    let message = system.validate(&descriptor).await;
    if !message.is_empty() {
        anyhow::bail!("Repository '{}' is not usable: {}", descriptor.id, message);
    }

    info!("Saving repository '{}' to {:?}", descriptor.id, config.settings_path);
    let id = descriptor.id.clone();
    config.settings.repositories.push(descriptor);
    config.settings.save(system.runtime(), &config.settings_path)?;

    println!("Added repository '{}'", id);
    Ok(())
}
