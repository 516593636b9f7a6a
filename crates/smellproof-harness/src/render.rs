#![forbid(unsafe_code)]

//! Render trees produced by fixture variants.
//!
//! A [`RenderTree`] is a small, owned stand-in for what a UI framework would
//! hand to its reconciler: text, numbers, elements with attributes, and
//! transparent fragments. Variants build one per invocation; the oracle
//! validates and normalizes it, then drops it.

use serde::Serialize;

use crate::error::{InvocationError, InvocationResult};

/// Attribute payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AttrValue {
    Text(String),
    /// Opaque event handler label (`onClick` and friends).
    Handler(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attr {
    pub name: String,
    pub value: AttrValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<Attr>,
    pub children: Vec<RenderNode>,
}

impl Element {
    /// Add a text attribute.
    #[must_use]
    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attrs.push(Attr {
            name: name.to_string(),
            value: AttrValue::Text(value.into()),
        });
        self
    }

    /// Add a reconciliation key.
    #[must_use]
    pub fn key(self, key: impl Into<String>) -> Self {
        self.attr("key", key)
    }

    /// Attach an event handler.
    #[must_use]
    pub fn on(mut self, event: &str, handler: impl Into<String>) -> Self {
        self.attrs.push(Attr {
            name: event.to_string(),
            value: AttrValue::Handler(handler.into()),
        });
        self
    }

    #[must_use]
    pub fn child(mut self, child: impl Into<RenderNode>) -> Self {
        self.children.push(child.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum RenderNode {
    Text { text: String },
    Number { value: f64 },
    /// Exact integer; printed from the `i64` itself.
    Integer { value: i64 },
    Element(Element),
    Fragment { children: Vec<RenderNode> },
    Empty,
}

impl From<Element> for RenderNode {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

impl From<&str> for RenderNode {
    fn from(value: &str) -> Self {
        text(value)
    }
}

impl From<String> for RenderNode {
    fn from(value: String) -> Self {
        Self::Text { text: value }
    }
}

impl From<f64> for RenderNode {
    fn from(value: f64) -> Self {
        Self::Number { value }
    }
}

impl From<i64> for RenderNode {
    fn from(value: i64) -> Self {
        Self::Integer { value }
    }
}

impl From<Option<RenderNode>> for RenderNode {
    fn from(value: Option<RenderNode>) -> Self {
        value.unwrap_or(Self::Empty)
    }
}

#[must_use]
pub fn el(tag: &str) -> Element {
    Element {
        tag: tag.to_string(),
        attrs: Vec::new(),
        children: Vec::new(),
    }
}

#[must_use]
pub fn text(value: impl Into<String>) -> RenderNode {
    RenderNode::Text {
        text: value.into(),
    }
}

#[must_use]
pub fn number(value: f64) -> RenderNode {
    RenderNode::Number { value }
}

#[must_use]
pub fn fragment(children: impl IntoIterator<Item = RenderNode>) -> RenderNode {
    RenderNode::Fragment {
        children: children.into_iter().collect(),
    }
}

/// Format a number the way a JavaScript engine prints it: integral values
/// lose the fractional part, `-0` prints as `0`, and magnitudes at or above
/// `1e21` or below `1e-6` switch to exponent form (`1e+21`, `1.5e-7`).
#[must_use]
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let magnitude = value.abs();
    if !(1e-6..1e21).contains(&magnitude) {
        let exponent_form = format!("{value:e}");
        return match exponent_form.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{mantissa}e+{exponent}")
            }
            _ => exponent_form,
        };
    }
    format!("{value}")
}

/// Output of one variant invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderTree {
    root: RenderNode,
}

impl RenderTree {
    #[must_use]
    pub fn new(root: impl Into<RenderNode>) -> Self {
        Self { root: root.into() }
    }

    /// A tree that renders nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            root: RenderNode::Empty,
        }
    }

    pub fn root(&self) -> &RenderNode {
        &self.root
    }

    /// Reject trees a display could not faithfully show.
    ///
    /// Non-finite numbers are treated as invocation failures rather than as
    /// renderable text, so a `NaN` on both sides never compares equal.
    pub fn validate(&self) -> InvocationResult<()> {
        validate_node(&self.root)
    }
}

impl From<RenderNode> for RenderTree {
    fn from(root: RenderNode) -> Self {
        Self { root }
    }
}

impl From<Element> for RenderTree {
    fn from(element: Element) -> Self {
        Self {
            root: RenderNode::Element(element),
        }
    }
}

fn validate_node(node: &RenderNode) -> InvocationResult<()> {
    match node {
        RenderNode::Number { value } if !value.is_finite() => {
            Err(InvocationError::NonFiniteNumber {
                value: format_number(*value),
            })
        }
        RenderNode::Element(element) => {
            if element.tag.trim().is_empty() {
                return Err(InvocationError::InvalidTree {
                    reason: "element with empty tag".to_string(),
                });
            }
            element.children.iter().try_for_each(validate_node)
        }
        RenderNode::Fragment { children } => children.iter().try_for_each(validate_node),
        RenderNode::Text { .. }
        | RenderNode::Number { .. }
        | RenderNode::Integer { .. }
        | RenderNode::Empty => Ok(()),
    }
}
