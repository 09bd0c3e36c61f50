//! Transitive dependency resolution.
//!
//! The graph is walked breadth-first from the root, so the first time a
//! `group:name:classifier:extension` key is seen is also its nearest
//! declaration; later versions of the same key are dropped.

use log::{debug, info, warn};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;

use super::{ArtifactFetcher, ResolutionContext, VersionResolver};
use crate::coordinate::ArtifactCoordinate;
use crate::error::{ResolveError, Result};
use crate::pom::{Dependency, EffectivePom, Exclusion, PomModel, Scope};
use crate::repository::RemoteRepository;
use crate::runtime::Runtime;

/// A node of the filtered dependency graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNode {
    pub coordinate: ArtifactCoordinate,
    pub scope: Scope,
    pub optional: bool,
    /// Exclusions in force below this node, including inherited ones.
    pub exclusions: Vec<Exclusion>,
    pub depth: usize,
    /// Set for system-scoped nodes, which are never fetched or expanded.
    pub system_path: Option<PathBuf>,
}

/// Why an edge was left out of the graph, if it was.
fn rejection(dependency: &Dependency, exclusions: &[Exclusion]) -> Option<&'static str> {
    match dependency.scope {
        Scope::Test | Scope::Provided => return Some("scope"),
        // Only meaningful inside dependencyManagement.
        Scope::Import => return Some("scope"),
        Scope::System if dependency.system_path.is_none() => {
            return Some("system scope without systemPath");
        }
        Scope::Compile | Scope::Runtime | Scope::System => {}
    }
    if dependency.optional {
        return Some("optional");
    }
    if exclusions.iter().any(|e| e.matches(&dependency.coordinate)) {
        return Some("excluded");
    }
    None
}

pub struct DependencyGraphResolver<'a, R: Runtime> {
    context: &'a ResolutionContext<'a, R>,
    repositories: &'a [RemoteRepository],
}

impl<'a, R: Runtime> DependencyGraphResolver<'a, R> {
    pub fn new(context: &'a ResolutionContext<'a, R>, repositories: &'a [RemoteRepository]) -> Self {
        Self {
            context,
            repositories,
        }
    }

    fn fetcher(&self) -> ArtifactFetcher<'a, R> {
        ArtifactFetcher::new(self.context, self.repositories)
    }

    /// Cached paths of every dependency of `root`, nearest first.
    ///
    /// The root itself is never part of the result. Any failure is logged
    /// and yields an empty list.
    #[tracing::instrument(skip(self, root, preferred, exclusions), fields(root = %root))]
    pub async fn resolve_classpath(
        &self,
        root: &ArtifactCoordinate,
        preferred: Option<&RemoteRepository>,
        exclusions: &[Exclusion],
    ) -> Vec<PathBuf> {
        match self.try_resolve_classpath(root, preferred, exclusions).await {
            Ok(paths) => paths,
            Err(e) => {
                info!("Failed to resolve dependencies of {}: {}", root, e);
                Vec::new()
            }
        }
    }

    async fn try_resolve_classpath(
        &self,
        root: &ArtifactCoordinate,
        preferred: Option<&RemoteRepository>,
        exclusions: &[Exclusion],
    ) -> Result<Vec<PathBuf>> {
        let nodes = self.collect(root, preferred, exclusions).await?;
        let root = match nodes.first() {
            Some(node) => node.coordinate.clone(),
            None => return Ok(Vec::new()),
        };

        let fetcher = self.fetcher();
        let mut paths = Vec::with_capacity(nodes.len());
        for node in nodes.iter().filter(|n| n.coordinate != root) {
            if let Some(system_path) = &node.system_path {
                if !self.context.cache.runtime().is_file(system_path) {
                    warn!("{} points at missing file {:?}", node.coordinate, system_path);
                    return Err(ResolveError::not_found(&node.coordinate, None));
                }
                paths.push(system_path.clone());
                continue;
            }
            let artifact = fetcher.resolve(&node.coordinate, preferred).await?;
            paths.push(artifact.path);
        }
        Ok(paths)
    }

    /// The filtered graph in breadth-first order, root first.
    pub async fn collect(
        &self,
        root: &ArtifactCoordinate,
        preferred: Option<&RemoteRepository>,
        exclusions: &[Exclusion],
    ) -> Result<Vec<DependencyNode>> {
        let root = self.concrete(root, preferred).await?;

        let mut chosen: HashMap<_, ArtifactCoordinate> = HashMap::new();
        chosen.insert(root.versionless_key(), root.clone());

        let mut visited: HashSet<ArtifactCoordinate> = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([DependencyNode {
            coordinate: root,
            scope: Scope::Compile,
            optional: false,
            exclusions: exclusions.to_vec(),
            depth: 0,
            system_path: None,
        }]);

        while let Some(node) = queue.pop_front() {
            if !visited.insert(node.coordinate.clone()) {
                continue;
            }
            if node.system_path.is_some() {
                order.push(node);
                continue;
            }

            let pom = self.effective_pom(&node.coordinate, preferred).await?;
            for dependency in pom.iter().flat_map(|p| p.dependencies()) {
                if let Some(reason) = rejection(dependency, &node.exclusions) {
                    debug!(
                        "{} -> {} dropped ({})",
                        node.coordinate, dependency.coordinate, reason
                    );
                    continue;
                }

                let key = dependency.coordinate.versionless_key();
                if let Some(existing) = chosen.get(&key) {
                    debug!(
                        "{} -> {} dropped, nearer {} wins",
                        node.coordinate, dependency.coordinate, existing
                    );
                    continue;
                }

                let coordinate = match dependency.scope {
                    Scope::System => dependency.coordinate.clone(),
                    _ => self.concrete(&dependency.coordinate, preferred).await?,
                };
                chosen.insert(key, coordinate.clone());

                let mut inherited = node.exclusions.clone();
                inherited.extend(dependency.exclusions.iter().cloned());
                queue.push_back(DependencyNode {
                    coordinate,
                    scope: dependency.scope,
                    optional: false,
                    exclusions: inherited,
                    depth: node.depth + 1,
                    system_path: match dependency.scope {
                        Scope::System => dependency.system_path.clone(),
                        _ => None,
                    },
                });
            }

            order.push(node);
        }

        Ok(order)
    }

    /// Turns a range into its highest matching version.
    async fn concrete(
        &self,
        coordinate: &ArtifactCoordinate,
        preferred: Option<&RemoteRepository>,
    ) -> Result<ArtifactCoordinate> {
        let repositories = match preferred {
            Some(repository) => std::slice::from_ref(repository),
            None => self.repositories,
        };
        let versions = VersionResolver::new(self.context)
            .query(coordinate, repositories)
            .await?;
        match versions.highest() {
            Some(version) if version.as_str() == coordinate.version() => Ok(coordinate.clone()),
            Some(version) => Ok(coordinate.with_version(version.as_str())),
            None => Err(ResolveError::RangeUnsatisfiable {
                coordinate: coordinate.to_string(),
            }),
        }
    }

    /// The POM of `coordinate` merged with its parents. `None` when the
    /// artifact publishes no POM.
    async fn effective_pom(
        &self,
        coordinate: &ArtifactCoordinate,
        preferred: Option<&RemoteRepository>,
    ) -> Result<Option<EffectivePom>> {
        let mut chain: Vec<(ArtifactCoordinate, PomModel)> = Vec::new();
        let mut seen = HashSet::new();
        let mut current = coordinate.pom();

        loop {
            let model = match self.read_pom(&current, preferred).await {
                Ok(model) => model,
                Err(e) if e.is_not_found() && chain.is_empty() => {
                    debug!("{} has no POM, assuming no dependencies", coordinate);
                    return Ok(None);
                }
                Err(e) if e.is_not_found() => {
                    warn!("Parent POM {} is missing, ignoring it", current);
                    break;
                }
                Err(e) => return Err(e),
            };

            let parent = model.parent.as_ref().map(|p| p.coordinate());
            seen.insert(current.clone());
            chain.push((current, model));

            match parent {
                Some(parent) if seen.contains(&parent) => {
                    warn!("Parent chain of {} loops at {}", coordinate, parent);
                    break;
                }
                Some(parent) => current = parent,
                None => break,
            }
        }

        let mut effective: Option<EffectivePom> = None;
        for (pom_coordinate, model) in chain.into_iter().rev() {
            effective = Some(EffectivePom::from_model(&pom_coordinate, model, effective.as_ref()));
        }
        Ok(effective)
    }

    async fn read_pom(
        &self,
        pom: &ArtifactCoordinate,
        preferred: Option<&RemoteRepository>,
    ) -> Result<PomModel> {
        self.fetcher().resolve(pom, preferred).await?;
        let bytes = self
            .context
            .cache
            .read_artifact(pom)
            .ok_or_else(|| ResolveError::not_found(pom, None))?;
        PomModel::from_bytes(&bytes).map_err(|e| ResolveError::Parse {
            what: pom.to_string(),
            message: format!("{:#}", e),
        })
    }
}

/// Joins paths with the platform path-list separator.
pub fn classpath_string(paths: &[PathBuf]) -> String {
    match std::env::join_paths(paths) {
        Ok(joined) => joined.to_string_lossy().into_owned(),
        Err(e) => {
            warn!("Cannot join classpath: {}", e);
            String::new()
        }
    }
}
