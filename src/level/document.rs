//! Immutable vector-document tree
//!
//! A document is parsed once into plain `Element` values; the compiler only
//! ever reads it. Levels are stored as the JSON rendition of this tree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::LevelError;

/// Attribute holding the authoring tool's layer/object label
pub const ATTR_LABEL: &str = "inkscape:label";

/// One element of the vector document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    #[serde(default)]
    pub children: Vec<Element>,
    /// Character data (e.g. the body of a `<desc>`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// Builder: set an attribute
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Builder: append a child
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Builder: set character data
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Parse a document from its JSON rendition
    pub fn from_json(json: &str) -> Result<Self, LevelError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Required numeric attribute
    pub fn number(&self, name: &str) -> Result<f32, LevelError> {
        self.attr(name)
            .and_then(|v| v.trim().parse::<f32>().ok())
            .ok_or_else(|| LevelError::InvalidAttribute {
                tag: self.tag.clone(),
                name: name.to_string(),
            })
    }

    /// Non-empty label, if any
    pub fn label(&self) -> Option<&str> {
        self.attr(ATTR_LABEL).filter(|l| !l.is_empty())
    }

    /// Free-text description: `desc` attribute, else the first `<desc>` child
    pub fn description(&self) -> Option<&str> {
        self.attr("desc").or_else(|| {
            self.children_by_tag("desc")
                .find_map(|d| d.text.as_deref())
        })
    }

    pub fn children_by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// First direct child with the given tag and exact label
    pub fn child_by_label(&self, tag: &str, label: &str) -> Option<&Element> {
        self.children
            .iter()
            .find(|c| c.tag == tag && c.label() == Some(label))
    }

    /// Direct children whose label starts with `prefix`, paired with the
    /// remainder of the label
    pub fn children_by_prefix<'a>(
        &'a self,
        tag: &'a str,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a Element)> {
        self.children_by_tag(tag).filter_map(move |c| {
            c.label()
                .and_then(|l| l.strip_prefix(prefix))
                .map(|name| (name, c))
        })
    }
}
