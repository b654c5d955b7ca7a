//! DOM snapshot types for browser-captured pages.
//!
//! The overlay serializes the page as a flat node list; selector generation
//! walks it through the `parent`/`children` links.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A snapshot of a web page's DOM structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomSnapshot {
    /// The URL of the captured page
    pub url: Option<String>,
    /// Flattened list of DOM nodes, in document order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<DomNode>,
}

/// A single DOM element with its attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomNode {
    /// Unique identifier for this node within the snapshot
    pub id: String,
    /// HTML tag name (e.g., "div", "span", "button")
    pub tag: String,
    /// IDs of child nodes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
    /// ID of parent node
    pub parent: Option<String>,
    /// HTML attributes (id, class, data-*, etc.)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    /// Direct text content
    pub text: Option<String>,
}

impl DomSnapshot {
    pub fn node(&self, id: &str) -> Option<&DomNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn parent_of(&self, node: &DomNode) -> Option<&DomNode> {
        node.parent.as_deref().and_then(|p| self.node(p))
    }

    /// Element children of `node`, in document order.
    pub fn children_of<'a>(&'a self, node: &'a DomNode) -> impl Iterator<Item = &'a DomNode> + 'a {
        node.children.iter().filter_map(move |c| self.node(c))
    }
}

impl DomNode {
    pub fn tag_name(&self) -> String {
        self.tag.to_ascii_lowercase()
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn class_list(&self) -> Vec<&str> {
        self.attr("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }
}
