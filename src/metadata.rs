//! Version index published by a repository as `maven-metadata.xml`.

use anyhow::{Context, Result};
use roxmltree::{Document, Node};

/// File name of the version index inside `<group path>/<name>/`.
pub const METADATA_FILE: &str = "maven-metadata.xml";

/// The parts of `maven-metadata.xml` needed to pick versions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryMetadata {
    pub group: Option<String>,
    pub name: Option<String>,
    pub latest: Option<String>,
    pub release: Option<String>,
    /// Versions in the order the repository lists them.
    pub versions: Vec<String>,
}

impl RepositoryMetadata {
    pub fn parse(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("Malformed maven-metadata.xml")?;
        let root = document.root_element();
        if !root.has_tag_name("metadata") {
            anyhow::bail!(
                "Expected <metadata> as the root element, found <{}>",
                root.tag_name().name()
            );
        }

        let versioning = child(&root, "versioning");
        let versions = versioning
            .and_then(|v| child(&v, "versions"))
            .map(|versions| {
                versions
                    .children()
                    .filter(|n| n.has_tag_name("version"))
                    .filter_map(|n| n.text())
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            group: text(&root, "groupId"),
            name: text(&root, "artifactId"),
            latest: versioning.and_then(|v| text(&v, "latest")),
            release: versioning.and_then(|v| text(&v, "release")),
            versions,
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let xml = std::str::from_utf8(bytes).context("maven-metadata.xml is not UTF-8")?;
        Self::parse(xml)
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
