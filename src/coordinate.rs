//! Artifact coordinates and their Maven repository layout.

use anyhow::Result;
use std::fmt;
use std::str::FromStr;

/// Extension used when a coordinate does not name one.
pub const DEFAULT_EXTENSION: &str = "jar";

/// Checks that `value` stays one directory or file name in a repository
/// layout: not `.` or `..`, no separators, no NUL.
pub fn check_component(kind: &str, value: &str) -> Result<()> {
    if value.is_empty() || value == "." || value == ".." || value.contains(['/', '\\', '\0']) {
        anyhow::bail!("Invalid {} '{}'", kind, value.escape_default());
    }
    Ok(())
}

/// Identifies an artifact: `group:name[:extension[:classifier]]:version`.
///
/// The version may be a concrete version or a range expression such as
/// `[1.0,2.0)`; resolvers turn the latter into concrete coordinates with
/// [`ArtifactCoordinate::with_version`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactCoordinate {
    group: String,
    name: String,
    version: String,
    classifier: Option<String>,
    extension: String,
}

impl ArtifactCoordinate {
    pub fn new(group: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            version: version.into(),
            classifier: None,
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    /// Empty classifiers are treated as absent.
    pub fn with_classifier(mut self, classifier: Option<impl Into<String>>) -> Self {
        self.classifier = classifier.map(Into::into).filter(|c: &String| !c.is_empty());
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Same artifact, different version.
    pub fn with_version(&self, version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..self.clone()
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn classifier(&self) -> Option<&str> {
        self.classifier.as_deref()
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Rejects coordinates whose layout path would leave the repository root.
    pub fn validate(&self) -> Result<()> {
        check_component("groupId", &self.group)?;
        check_component("artifactId", &self.name)?;
        check_component("version", &self.version)?;
        check_component("extension", &self.extension)?;
        if let Some(classifier) = &self.classifier {
            check_component("classifier", classifier)?;
        }
        Ok(())
    }

    pub fn is_snapshot(&self) -> bool {
        self.version.to_uppercase().ends_with("SNAPSHOT")
    }

    /// `org.example` -> `org/example`
    pub fn group_path(&self) -> String {
        self.group.replace('.', "/")
    }

    /// `name-version[-classifier].extension`
    pub fn file_name(&self) -> String {
        match &self.classifier {
            Some(classifier) => format!(
                "{}-{}-{}.{}",
                self.name, self.version, classifier, self.extension
            ),
            None => format!("{}-{}.{}", self.name, self.version, self.extension),
        }
    }

    /// Repository-relative path of the artifact, always `/`-separated.
    pub fn repository_path(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.group_path(),
            self.name,
            self.version,
            self.file_name()
        )
    }

    /// Repository-relative directory holding the version index of this artifact.
    pub fn metadata_dir(&self) -> String {
        format!("{}/{}", self.group_path(), self.name)
    }

    /// The POM describing this artifact.
    pub fn pom(&self) -> Self {
        Self {
            classifier: None,
            extension: "pom".to_string(),
            ..self.clone()
        }
    }

    /// Everything but the version; two coordinates with the same key are
    /// competing versions of one artifact.
    pub fn versionless_key(&self) -> (String, String, Option<String>, String) {
        (
            self.group.clone(),
            self.name.clone(),
            self.classifier.clone(),
            self.extension.clone(),
        )
    }
}

impl fmt::Display for ArtifactCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.name)?;
        match &self.classifier {
            Some(classifier) => write!(f, ":{}:{}", self.extension, classifier)?,
            None if self.extension != DEFAULT_EXTENSION => write!(f, ":{}", self.extension)?,
            None => {}
        }
        write!(f, ":{}", self.version)
    }
}

impl FromStr for ArtifactCoordinate {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.iter().any(|p| p.is_empty()) {
            anyhow::bail!(
                "Invalid artifact coordinate '{}'. Expected 'group:name[:extension[:classifier]]:version'.",
                s
            );
        }

        let coordinate = match parts.as_slice() {
            [group, name, version] => ArtifactCoordinate::new(*group, *name, *version),
            [group, name, extension, version] => {
                ArtifactCoordinate::new(*group, *name, *version).with_extension(*extension)
            }
            [group, name, extension, classifier, version] => {
                ArtifactCoordinate::new(*group, *name, *version)
                    .with_extension(*extension)
                    .with_classifier(Some(*classifier))
            }
            _ => anyhow::bail!(
                "Invalid artifact coordinate '{}'. Expected 'group:name[:extension[:classifier]]:version'.",
                s
            ),
        };
        coordinate
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid artifact coordinate '{}': {}", s, e))?;
        Ok(coordinate)
    }
}
