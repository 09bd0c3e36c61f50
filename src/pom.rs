//! The subset of `pom.xml` needed to walk a dependency graph.
//!
//! [`PomModel`] is one file as written. [`EffectivePom`] is a model merged
//! with its parent chain: inherited properties, `${...}` placeholders
//! substituted, and managed versions/scopes filled in.

use anyhow::{Context, Result};
use log::warn;
use roxmltree::{Document, Node};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::coordinate::{ArtifactCoordinate, DEFAULT_EXTENSION, check_component};

/// How far a dependency propagates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    #[default]
    Compile,
    Runtime,
    Test,
    Provided,
    System,
    Import,
}

impl Scope {
    /// Missing or unrecognized scopes count as compile.
    pub fn from_pom(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => Scope::Compile,
            Some(s) => s.parse().unwrap_or_else(|_| {
                warn!("Unknown dependency scope '{}', treating it as compile", s);
                Scope::Compile
            }),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scope::Compile => "compile",
            Scope::Runtime => "runtime",
            Scope::Test => "test",
            Scope::Provided => "provided",
            Scope::System => "system",
            Scope::Import => "import",
        };
        f.write_str(name)
    }
}

impl FromStr for Scope {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compile" => Ok(Scope::Compile),
            "runtime" => Ok(Scope::Runtime),
            "test" => Ok(Scope::Test),
            "provided" => Ok(Scope::Provided),
            "system" => Ok(Scope::System),
            "import" => Ok(Scope::Import),
            _ => anyhow::bail!("Unknown scope: {}", s),
        }
    }
}

/// An excluded `group:name`; either part may use `*` wildcards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Exclusion {
    pub group: String,
    pub name: String,
}

impl Exclusion {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }

    pub fn matches(&self, coordinate: &ArtifactCoordinate) -> bool {
        wildcard_match(&self.group, coordinate.group()) && wildcard_match(&self.name, coordinate.name())
    }
}

fn wildcard_match(pattern: &str, value: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == value;
    }
    glob::Pattern::new(pattern)
        .map(|p| p.matches(value))
        .unwrap_or(false)
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.name)
    }
}

impl FromStr for Exclusion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once(':') {
            Some((group, name)) if !group.is_empty() && !name.is_empty() && !name.contains(':') => {
                Ok(Exclusion::new(group, name))
            }
            _ => anyhow::bail!("Invalid exclusion '{}'. Expected 'group:name'.", s),
        }
    }
}

/// A dependency edge of an effective POM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub coordinate: ArtifactCoordinate,
    pub scope: Scope,
    pub optional: bool,
    pub exclusions: Vec<Exclusion>,
    /// `<systemPath>` with placeholders substituted; only meaningful for
    /// [`Scope::System`].
    pub system_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentRef {
    pub group: String,
    pub name: String,
    pub version: String,
}

impl ParentRef {
    pub fn coordinate(&self) -> ArtifactCoordinate {
        ArtifactCoordinate::new(&self.group, &self.name, &self.version).pom()
    }
}

#[derive(Debug, Clone, Default)]
struct RawDependency {
    group: Option<String>,
    name: Option<String>,
    version: Option<String>,
    scope: Option<String>,
    optional: Option<String>,
    classifier: Option<String>,
    kind: Option<String>,
    system_path: Option<String>,
    exclusions: Vec<Exclusion>,
}

/// One `pom.xml`, unmerged.
#[derive(Debug, Clone, Default)]
pub struct PomModel {
    pub parent: Option<ParentRef>,
    properties: HashMap<String, String>,
    dependency_management: Vec<RawDependency>,
    dependencies: Vec<RawDependency>,
}

impl PomModel {
    pub fn parse(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("Malformed pom.xml")?;
        let project = document.root_element();
        if !project.has_tag_name("project") {
            anyhow::bail!(
                "Expected <project> as the root element, found <{}>",
                project.tag_name().name()
            );
        }

        let parent = child(&project, "parent")
            .map(|node| -> Result<ParentRef> {
                let parent = ParentRef {
                    group: text(&node, "groupId").context("<parent> has no groupId")?,
                    name: text(&node, "artifactId").context("<parent> has no artifactId")?,
                    version: text(&node, "version").context("<parent> has no version")?,
                };
                parent.coordinate().validate().context("Invalid <parent>")?;
                Ok(parent)
            })
            .transpose()?;

        let dependency_management = child(&project, "dependencyManagement")
            .map(|node| parse_dependencies(&node))
            .unwrap_or_default();

        Ok(Self {
            parent,
            properties: parse_properties(&project),
            dependency_management,
            dependencies: parse_dependencies(&project),
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let xml = std::str::from_utf8(bytes).context("pom.xml is not UTF-8")?;
        Self::parse(xml)
    }
}

#[derive(Debug, Clone)]
struct Managed {
    version: Option<String>,
    scope: Option<String>,
    optional: Option<String>,
    exclusions: Vec<Exclusion>,
}

/// A POM merged with its ancestors.
#[derive(Debug, Clone)]
pub struct EffectivePom {
    coordinate: ArtifactCoordinate,
    properties: HashMap<String, String>,
    management: HashMap<(String, String, Option<String>, String), Managed>,
    dependencies: Vec<Dependency>,
}

impl EffectivePom {
    /// Merges `model` (the POM of `coordinate`) onto its already merged parent.
    pub fn from_model(
        coordinate: &ArtifactCoordinate,
        model: PomModel,
        parent: Option<&EffectivePom>,
    ) -> Self {
        let mut properties = parent.map(|p| p.properties.clone()).unwrap_or_default();
        properties.extend(model.properties);
        properties.insert("project.groupId".to_string(), coordinate.group().to_string());
        properties.insert("project.artifactId".to_string(), coordinate.name().to_string());
        properties.insert("project.version".to_string(), coordinate.version().to_string());
        if let Some(parent) = parent {
            properties.insert("project.parent.groupId".to_string(), parent.coordinate.group().to_string());
            properties.insert("project.parent.version".to_string(), parent.coordinate.version().to_string());
        }

        let mut management = parent.map(|p| p.management.clone()).unwrap_or_default();
        for entry in model.dependency_management {
            let Some(target) = build_coordinate(&entry, None, &properties) else {
                continue;
            };
            management.insert(
                target.versionless_key(),
                Managed {
                    version: resolve_property(entry.version.as_deref(), &properties),
                    scope: entry.scope,
                    optional: entry.optional,
                    exclusions: entry.exclusions,
                },
            );
        }

        let mut dependencies = Vec::new();
        for entry in model.dependencies {
            let Some(unversioned) = build_coordinate(&entry, Some("0"), &properties) else {
                warn!("Skipping dependency of {} without a usable groupId or artifactId", coordinate);
                continue;
            };
            let managed = management.get(&unversioned.versionless_key());

            let version = resolve_property(entry.version.as_deref(), &properties)
                .or_else(|| managed.and_then(|m| m.version.clone()));
            let Some(version) = version else {
                warn!(
                    "Skipping {}:{} in {}: no version and none managed",
                    unversioned.group(),
                    unversioned.name(),
                    coordinate
                );
                continue;
            };

            let scope = entry.scope.as_deref().or(managed.and_then(|m| m.scope.as_deref()));
            let optional = entry
                .optional
                .as_deref()
                .or(managed.and_then(|m| m.optional.as_deref()))
                .is_some_and(|o| o.trim().eq_ignore_ascii_case("true"));

            let mut exclusions = entry.exclusions;
            if let Some(managed) = managed {
                exclusions.extend(managed.exclusions.iter().cloned());
            }

            let target = unversioned.with_version(version);
            if let Err(e) = check_component("version", target.version()) {
                warn!("Skipping {} in {}: {}", target, coordinate, e);
                continue;
            }

            dependencies.push(Dependency {
                coordinate: target,
                scope: Scope::from_pom(scope),
                optional,
                exclusions,
                system_path: resolve_property(entry.system_path.as_deref(), &properties)
                    .map(PathBuf::from),
            });
        }

        Self {
            coordinate: coordinate.clone(),
            properties,
            management,
            dependencies,
        }
    }

    pub fn coordinate(&self) -> &ArtifactCoordinate {
        &self.coordinate
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// Coordinate of a dependency entry, with `type` mapped to extension and
/// classifier. Version is `version_placeholder` or left empty.
fn build_coordinate(
    entry: &RawDependency,
    version_placeholder: Option<&str>,
    properties: &HashMap<String, String>,
) -> Option<ArtifactCoordinate> {
    let group = resolve_property(entry.group.as_deref(), properties)?;
    let name = resolve_property(entry.name.as_deref(), properties)?;
    let kind = resolve_property(entry.kind.as_deref(), properties);
    let mut classifier = resolve_property(entry.classifier.as_deref(), properties);

    let extension = match kind.as_deref() {
        None | Some("jar") | Some("bundle") | Some("maven-plugin") | Some("ejb") => DEFAULT_EXTENSION,
        Some("test-jar") => {
            classifier.get_or_insert_with(|| "tests".to_string());
            DEFAULT_EXTENSION
        }
        Some("java-source") => {
            classifier.get_or_insert_with(|| "sources".to_string());
            DEFAULT_EXTENSION
        }
        Some(other) => other,
    };

    let coordinate = ArtifactCoordinate::new(group, name, version_placeholder.unwrap_or_default())
        .with_extension(extension)
        .with_classifier(classifier);
    let checked = check_component("groupId", coordinate.group())
        .and_then(|_| check_component("artifactId", coordinate.name()))
        .and_then(|_| check_component("extension", coordinate.extension()))
        .and_then(|_| coordinate.classifier().map_or(Ok(()), |c| check_component("classifier", c)));
    match checked {
        Ok(()) => Some(coordinate),
        Err(e) => {
            warn!("Ignoring dependency {}:{}: {}", coordinate.group(), coordinate.name(), e);
            None
        }
    }
}

fn child<'a, 'input>(node: &Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == tag)
}

fn text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    child(node, tag)
        .and_then(|n| n.text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn parse_properties(project: &Node<'_, '_>) -> HashMap<String, String> {
    child(project, "properties")
        .map(|props| {
            props
                .children()
                .filter(|n| n.is_element())
                .map(|n| {
                    let value = n.text().map(|t| t.trim().to_string()).unwrap_or_default();
                    (n.tag_name().name().to_string(), value)
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Reads `<dependencies>` under `parent`.
fn parse_dependencies(parent: &Node<'_, '_>) -> Vec<RawDependency> {
    let Some(list) = child(parent, "dependencies") else {
        return Vec::new();
    };

    list.children()
        .filter(|n| n.is_element() && n.tag_name().name() == "dependency")
        .map(|node| RawDependency {
            group: text(&node, "groupId"),
            name: text(&node, "artifactId"),
            version: text(&node, "version"),
            scope: text(&node, "scope"),
            optional: text(&node, "optional"),
            classifier: text(&node, "classifier"),
            kind: text(&node, "type"),
            system_path: text(&node, "systemPath"),
            exclusions: child(&node, "exclusions")
                .map(|exclusions| {
                    exclusions
                        .children()
                        .filter(|n| n.is_element() && n.tag_name().name() == "exclusion")
                        .filter_map(|n| {
                            Some(Exclusion::new(text(&n, "groupId")?, text(&n, "artifactId")?))
                        })
                        .collect()
                })
                .unwrap_or_default(),
        })
        .collect()
}

/// Substitutes `${...}` placeholders; `None` if one stays unresolved.
fn resolve_property(value: Option<&str>, properties: &HashMap<String, String>) -> Option<String> {
    let mut current = value?.trim().to_string();
    if current.is_empty() {
        return None;
    }

    // Values may refer to other properties; give up on long or circular chains.
    for _ in 0..8 {
        if !current.contains("${") {
            return Some(current);
        }
        current = substitute(&current, properties)?;
    }
    None
}

fn substitute(raw: &str, properties: &HashMap<String, String>) -> Option<String> {
    let mut result = String::new();
    let mut rest = raw;
    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}')?;
        result.push_str(properties.get(&after[..end])?);
        rest = &after[end + 1..];
    }
    result.push_str(rest);
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARENT: &str = r#"<project xmlns="http://maven.apache.org/POM/4.0.0">
  <groupId>org.example</groupId>
  <artifactId>parent</artifactId>
  <version>3</version>
  <packaging>pom</packaging>
  <properties>
    <widgets.version>1.2</widgets.version>
    <core.version>${widgets.version}</core.version>
  </properties>
  <dependencyManagement>
    <dependencies>
      <dependency>
        <groupId>org.example</groupId>
        <artifactId>core</artifactId>
        <version>${core.version}</version>
        <scope>runtime</scope>
        <exclusions>
          <exclusion><groupId>org.legacy</groupId><artifactId>*</artifactId></exclusion>
        </exclusions>
      </dependency>
    </dependencies>
  </dependencyManagement>
</project>"#;

    const CHILD: &str = r#"<project xmlns="http://maven.apache.org/POM/4.0.0">
  <parent>
    <groupId>org.example</groupId>
    <artifactId>parent</artifactId>
    <version>3</version>
  </parent>
  <artifactId>app</artifactId>
  <dependencies>
    <dependency>
      <groupId>org.example</groupId>
      <artifactId>core</artifactId>
    </dependency>
    <dependency>
      <groupId>${project.groupId}</groupId>
      <artifactId>widgets</artifactId>
      <version>${widgets.version}</version>
      <optional>true</optional>
    </dependency>
    <dependency>
      <groupId>org.example</groupId>
      <artifactId>fixtures</artifactId>
      <version>1.0</version>
      <type>test-jar</type>
      <scope>test</scope>
    </dependency>
    <dependency>
      <groupId>org.example</groupId>
      <artifactId>unversioned</artifactId>
    </dependency>
    <dependency>
      <groupId>org.example</groupId>
      <artifactId>ranged</artifactId>
      <version>[1.0,2.0)</version>
    </dependency>
  </dependencies>
</project>"#;

    fn effective_child() -> EffectivePom {
        let parent_coordinate = ArtifactCoordinate::new("org.example", "parent", "3").pom();
        let parent = EffectivePom::from_model(&parent_coordinate, PomModel::parse(PARENT).unwrap(), None);

        let model = PomModel::parse(CHILD).unwrap();
        assert_eq!(model.parent.as_ref().unwrap().coordinate(), parent_coordinate);

        EffectivePom::from_model(&ArtifactCoordinate::new("org.example", "app", "1.0"), model, Some(&parent))
    }

    #[test]
    fn test_managed_version_scope_and_exclusions() {
        let pom = effective_child();
        let core = &pom.dependencies()[0];
        assert_eq!(core.coordinate.to_string(), "org.example:core:1.2");
        assert_eq!(core.scope, Scope::Runtime);
        assert!(!core.optional);
        assert_eq!(core.exclusions, vec![Exclusion::new("org.legacy", "*")]);
    }

    #[test]
    fn test_properties_and_optional() {
        let pom = effective_child();
        let widgets = &pom.dependencies()[1];
        assert_eq!(widgets.coordinate.to_string(), "org.example:widgets:1.2");
        assert!(widgets.optional);
        assert_eq!(pom.property("core.version"), Some("${widgets.version}"));
    }

    #[test]
    fn test_type_maps_to_classifier() {
        let pom = effective_child();
        let fixtures = &pom.dependencies()[2];
        assert_eq!(fixtures.coordinate.classifier(), Some("tests"));
        assert_eq!(fixtures.coordinate.extension(), "jar");
        assert_eq!(fixtures.scope, Scope::Test);
    }

    #[test]
    fn test_unversioned_dependency_is_skipped_and_ranges_kept() {
        let pom = effective_child();
        let names: Vec<&str> = pom.dependencies().iter().map(|d| d.coordinate.name()).collect();
        assert_eq!(names, vec!["core", "widgets", "fixtures", "ranged"]);
        assert_eq!(pom.dependencies()[3].coordinate.version(), "[1.0,2.0)");
    }

    #[test]
    fn test_parse_errors() {
        assert!(PomModel::parse("<metadata/>").is_err());
        assert!(PomModel::parse("<project><parent><groupId>g</groupId></parent></project>").is_err());
        assert!(PomModel::parse("<project>").is_err());
    }

    #[test]
    fn test_path_like_coordinates_are_dropped() {
        let xml = r#"<project><dependencies>
            <dependency><groupId>..</groupId><artifactId>..</artifactId><version>escaped</version></dependency>
            <dependency><groupId>g</groupId><artifactId>a</artifactId><version>../../1.0</version></dependency>
            <dependency><groupId>g</groupId><artifactId>b</artifactId><version>1.0</version><classifier>x/y</classifier></dependency>
            <dependency><groupId>g</groupId><artifactId>ok</artifactId><version>1.0</version></dependency>
          </dependencies></project>"#;
        let pom = EffectivePom::from_model(
            &ArtifactCoordinate::new("g", "root", "1.0"),
            PomModel::parse(xml).unwrap(),
            None,
        );
        let names: Vec<&str> = pom.dependencies().iter().map(|d| d.coordinate.name()).collect();
        assert_eq!(names, vec!["ok"]);

        let bad_parent = "<project><parent><groupId>g</groupId><artifactId>..</artifactId>\
                          <version>1</version></parent></project>";
        assert!(PomModel::parse(bad_parent).is_err());
    }

    #[test]
    fn test_system_path_is_interpolated() {
        let xml = r#"<project>
            <properties><tools.dir>/opt/tools</tools.dir></properties>
            <dependencies>
              <dependency><groupId>com.vendor</groupId><artifactId>native</artifactId><version>1.0</version>
                <scope>system</scope><systemPath>${tools.dir}/native.jar</systemPath></dependency>
              <dependency><groupId>g</groupId><artifactId>plain</artifactId><version>1.0</version></dependency>
            </dependencies></project>"#;
        let pom = EffectivePom::from_model(
            &ArtifactCoordinate::new("g", "root", "1.0"),
            PomModel::parse(xml).unwrap(),
            None,
        );
        let native = &pom.dependencies()[0];
        assert_eq!(native.scope, Scope::System);
        assert_eq!(native.system_path, Some(PathBuf::from("/opt/tools/native.jar")));
        assert_eq!(pom.dependencies()[1].system_path, None);
    }

    #[test]
    fn test_exclusion_wildcards() {
        let c = ArtifactCoordinate::new("org.legacy.io", "streams", "1.0");
        assert!(Exclusion::new("org.legacy.io", "streams").matches(&c));
        assert!(Exclusion::new("org.legacy.*", "*").matches(&c));
        assert!(Exclusion::new("*", "*").matches(&c));
        assert!(!Exclusion::new("org.legacy", "*").matches(&c));
        assert!(!Exclusion::new("org.legacy.io", "stream").matches(&c));
    }

    #[test]
    fn test_exclusion_parse() {
        let e: Exclusion = "org.example:widgets".parse().unwrap();
        assert_eq!(e, Exclusion::new("org.example", "widgets"));
        assert!("widgets".parse::<Exclusion>().is_err());
        assert!("a:b:c".parse::<Exclusion>().is_err());
        assert!(":b".parse::<Exclusion>().is_err());
    }

    #[test]
    fn test_scope_from_pom() {
        assert_eq!(Scope::from_pom(None), Scope::Compile);
        assert_eq!(Scope::from_pom(Some("PROVIDED")), Scope::Provided);
        assert_eq!(Scope::from_pom(Some("weird")), Scope::Compile);
    }
}
