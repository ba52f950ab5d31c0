//! Android manifest model and idempotent requirement merging.
//!
//! # Invariants
//! - `apply` never inserts an element when one with the same tag path and
//!   the same attributes already exists, so repeated builds are stable.
//! - Attribute names are stored without the `android:` prefix; rendering adds
//!   it to every name that has no namespace of its own.

use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const ANDROID_NAMESPACE: &str = "http://schemas.android.com/apk/res/android";
pub const MANIFEST_ROOT_TAG: &str = "manifest";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    EmptyPath,
    RootMismatch { expected: String, found: String },
}

impl Display for ManifestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPath => write!(f, "manifest element path must not be empty"),
            Self::RootMismatch { expected, found } => write!(
                f,
                "manifest element path must start at `{expected}`, found `{found}`"
            ),
        }
    }
}

impl Error for ManifestError {}

/// One element addressed by its tag path from the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestElement {
    pub element_path: Vec<String>,
    pub attributes: Vec<(String, String)>,
}

impl ManifestElement {
    pub fn new(path: &[&str], attributes: &[(&str, &str)]) -> Self {
        Self {
            element_path: path.iter().map(|tag| tag.to_string()).collect(),
            attributes: attributes
                .iter()
                .map(|(name, value)| (strip_android_prefix(name).to_string(), value.to_string()))
                .collect(),
        }
    }
}

/// Elements one feature needs added to or removed from the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestRequirement {
    /// Loader names this requirement applies to.
    pub supported_xr_loaders: Vec<String>,
    pub new_elements: Vec<ManifestElement>,
    pub remove_elements: Vec<ManifestElement>,
}

impl ManifestRequirement {
    pub fn supports_loader(&self, loader: &str) -> bool {
        self.supported_xr_loaders.iter().any(|name| name == loader)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestNode {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<ManifestNode>,
}

impl ManifestNode {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        let name = strip_android_prefix(name);
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn matches(&self, tag: &str, attributes: &[(String, String)]) -> bool {
        self.tag == tag
            && attributes.len() == self.attributes.len()
            && attributes
                .iter()
                .all(|(name, value)| self.attribute(name) == Some(value.as_str()))
    }
}

/// Summary of one `apply` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManifestChanges {
    pub added: usize,
    pub removed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AndroidManifest {
    root: ManifestNode,
}

impl Default for AndroidManifest {
    fn default() -> Self {
        Self::new()
    }
}

impl AndroidManifest {
    pub fn new() -> Self {
        let mut root = ManifestNode::new(MANIFEST_ROOT_TAG);
        root.attributes
            .push(("xmlns:android".to_string(), ANDROID_NAMESPACE.to_string()));
        Self { root }
    }

    pub fn root(&self) -> &ManifestNode {
        &self.root
    }

    /// Elements found at `path` whose attributes include all of `attributes`.
    pub fn find(&self, path: &[&str], attributes: &[(&str, &str)]) -> Vec<&ManifestNode> {
        let Some((first, rest)) = path.split_first() else {
            return Vec::new();
        };
        if *first != self.root.tag {
            return Vec::new();
        }
        let mut level = vec![&self.root];
        for tag in rest {
            level = level
                .into_iter()
                .flat_map(|node| node.children.iter().filter(move |child| child.tag == *tag))
                .collect();
        }
        level
            .into_iter()
            .filter(|node| {
                attributes
                    .iter()
                    .all(|(name, value)| node.attribute(name) == Some(*value))
            })
            .collect()
    }

    /// Removes, then inserts, the requirement's elements.
    pub fn apply(
        &mut self,
        requirement: &ManifestRequirement,
    ) -> Result<ManifestChanges, ManifestError> {
        let mut changes = ManifestChanges::default();
        for element in &requirement.remove_elements {
            changes.removed += self.remove_element(element)?;
        }
        for element in &requirement.new_elements {
            if self.insert_element(element)? {
                changes.added += 1;
            }
        }
        debug!(
            "event=manifest_apply module=build status=ok added={} removed={}",
            changes.added, changes.removed
        );
        Ok(changes)
    }

    fn split_path<'a>(&self, element: &'a ManifestElement) -> Result<&'a [String], ManifestError> {
        let Some((first, rest)) = element.element_path.split_first() else {
            return Err(ManifestError::EmptyPath);
        };
        if *first != self.root.tag {
            return Err(ManifestError::RootMismatch {
                expected: self.root.tag.clone(),
                found: first.clone(),
            });
        }
        Ok(rest)
    }

    fn insert_element(&mut self, element: &ManifestElement) -> Result<bool, ManifestError> {
        let rest = self.split_path(element)?;
        let Some((leaf, parents)) = rest.split_last() else {
            return Ok(false);
        };
        let mut node = &mut self.root;
        for tag in parents {
            let index = match node.children.iter().position(|child| child.tag == *tag) {
                Some(index) => index,
                None => {
                    node.children.push(ManifestNode::new(tag));
                    node.children.len() - 1
                }
            };
            node = &mut node.children[index];
        }
        if node
            .children
            .iter()
            .any(|child| child.matches(leaf, &element.attributes))
        {
            return Ok(false);
        }
        node.children.push(ManifestNode {
            tag: leaf.clone(),
            attributes: element.attributes.clone(),
            children: Vec::new(),
        });
        Ok(true)
    }

    fn remove_element(&mut self, element: &ManifestElement) -> Result<usize, ManifestError> {
        let rest = self.split_path(element)?;
        let Some((leaf, parents)) = rest.split_last() else {
            return Ok(0);
        };
        Ok(remove_matching(&mut self.root, parents, leaf, &element.attributes))
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
        write_node(&mut out, &self.root, 0);
        out
    }
}

fn remove_matching(
    node: &mut ManifestNode,
    parents: &[String],
    leaf: &str,
    attributes: &[(String, String)],
) -> usize {
    match parents.split_first() {
        Some((tag, rest)) => node
            .children
            .iter_mut()
            .filter(|child| child.tag == *tag)
            .map(|child| remove_matching(child, rest, leaf, attributes))
            .sum(),
        None => {
            let before = node.children.len();
            node.children.retain(|child| {
                !(child.tag == leaf
                    && attributes
                        .iter()
                        .all(|(name, value)| child.attribute(name) == Some(value.as_str())))
            });
            before - node.children.len()
        }
    }
}

fn strip_android_prefix(name: &str) -> &str {
    name.strip_prefix("android:").unwrap_or(name)
}

fn render_attribute_name(name: &str) -> String {
    if name.contains(':') {
        name.to_string()
    } else {
        format!("android:{name}")
    }
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn write_node(out: &mut String, node: &ManifestNode, depth: usize) {
    let indent = "    ".repeat(depth);
    out.push_str(&indent);
    out.push('<');
    out.push_str(&node.tag);
    for (name, value) in &node.attributes {
        out.push(' ');
        out.push_str(&render_attribute_name(name));
        out.push_str("=\"");
        out.push_str(&escape_xml(value));
        out.push('"');
    }
    if node.children.is_empty() {
        out.push_str(" />\n");
        return;
    }
    out.push_str(">\n");
    for child in &node.children {
        write_node(out, child, depth + 1);
    }
    out.push_str(&indent);
    out.push_str("</");
    out.push_str(&node.tag);
    out.push_str(">\n");
}
