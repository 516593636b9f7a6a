#![forbid(unsafe_code)]

//! Reduce a [`RenderTree`] to a [`CanonicalValue`].
//!
//! The canonical value keeps only what a viewer could observe:
//!
//! | Component | Rule |
//! |-----------|------|
//! | `text` | visible text in document order, whitespace runs collapsed, trimmed |
//! | `element_count` | number of element nodes (fragments and empties are transparent) |
//! | `max_depth` | deepest element nesting, 0 for text-only output |
//! | `outline` | pre-order tag signature such as `div(p,p)` |
//! | `visible_attrs` | allowlisted attributes as `tag.name=value` |
//!
//! Keys, refs, ids, styling hooks and event handlers never reach the
//! canonical value, so two variants that differ only in reconciliation
//! identity compare equal.

use serde::{Deserialize, Serialize};

use crate::render::{AttrValue, Element, RenderNode, RenderTree, format_number};

/// Attributes whose value is shown to the user.
pub const VISIBLE_ATTRS: &[&str] = &["alt", "title", "placeholder", "value", "label", "aria-label"];

const FINGERPRINT_PREFIX: &str = "blake3:";

/// Comparable reduction of a render tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanonicalValue {
    pub text: String,
    pub element_count: usize,
    pub max_depth: usize,
    pub outline: String,
    pub visible_attrs: Vec<String>,
}

impl CanonicalValue {
    /// Canonical value of a bare piece of text (no structure).
    #[must_use]
    pub fn text_only(text: &str) -> Self {
        Self {
            text: collapse_whitespace(text),
            ..Self::default()
        }
    }

    /// Stable BLAKE3 digest of the value.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.text.as_bytes());
        hasher.update(&[0]);
        hasher.update(&(self.element_count as u64).to_le_bytes());
        hasher.update(&(self.max_depth as u64).to_le_bytes());
        hasher.update(self.outline.as_bytes());
        for attr in &self.visible_attrs {
            hasher.update(&[0]);
            hasher.update(attr.as_bytes());
        }
        let hex = hasher.finalize().to_hex();
        format!("{FINGERPRINT_PREFIX}{}", &hex.as_str()[..16])
    }

    /// First component that differs from `other`, if any.
    #[must_use]
    pub fn diff(&self, other: &Self) -> Option<CanonicalDiff> {
        if self.text != other.text {
            let offset = self
                .text
                .chars()
                .zip(other.text.chars())
                .take_while(|(a, b)| a == b)
                .count();
            return Some(CanonicalDiff::Text {
                offset,
                expected: self.text.clone(),
                actual: other.text.clone(),
            });
        }
        if self.element_count != other.element_count || self.max_depth != other.max_depth {
            return Some(CanonicalDiff::Shape {
                expected: (self.element_count, self.max_depth),
                actual: (other.element_count, other.max_depth),
            });
        }
        if self.outline != other.outline {
            return Some(CanonicalDiff::Outline {
                expected: self.outline.clone(),
                actual: other.outline.clone(),
            });
        }
        if self.visible_attrs != other.visible_attrs {
            return Some(CanonicalDiff::Attributes {
                expected: self.visible_attrs.clone(),
                actual: other.visible_attrs.clone(),
            });
        }
        None
    }
}

/// Where two canonical values part ways.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "component", rename_all = "snake_case")]
pub enum CanonicalDiff {
    Text {
        /// Character offset of the first difference.
        offset: usize,
        expected: String,
        actual: String,
    },
    Shape {
        /// `(element_count, max_depth)`.
        expected: (usize, usize),
        actual: (usize, usize),
    },
    Outline {
        expected: String,
        actual: String,
    },
    Attributes {
        expected: Vec<String>,
        actual: Vec<String>,
    },
    /// Variants consumed the pinned sources differently (strict lockstep).
    SourceUsage {
        expected: (u64, u64),
        actual: (u64, u64),
    },
}

impl CanonicalDiff {
    /// One-line description for reports.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::Text {
                offset,
                expected,
                actual,
            } => format!("text differs at char {offset}: {expected:?} vs {actual:?}"),
            Self::Shape { expected, actual } => format!(
                "shape differs: {} elements/depth {} vs {} elements/depth {}",
                expected.0, expected.1, actual.0, actual.1
            ),
            Self::Outline { expected, actual } => {
                format!("outline differs: {expected} vs {actual}")
            }
            Self::Attributes { expected, actual } => {
                format!("visible attributes differ: {expected:?} vs {actual:?}")
            }
            Self::SourceUsage { expected, actual } => format!(
                "source usage differs: {} draws/{} clock reads vs {} draws/{} clock reads",
                expected.0, expected.1, actual.0, actual.1
            ),
        }
    }
}

/// Normalize a render tree.
#[must_use]
pub fn normalize(tree: &RenderTree) -> CanonicalValue {
    let mut walker = Walker::default();
    walker.visit(tree.root(), 0);
    CanonicalValue {
        text: collapse_whitespace(&walker.text),
        element_count: walker.element_count,
        max_depth: walker.max_depth,
        outline: walker.outline,
        visible_attrs: walker.visible_attrs,
    }
}

#[derive(Default)]
struct Walker {
    text: String,
    element_count: usize,
    max_depth: usize,
    outline: String,
    visible_attrs: Vec<String>,
}

impl Walker {
    fn visit(&mut self, node: &RenderNode, depth: usize) {
        match node {
            RenderNode::Text { text } => self.text.push_str(text),
            RenderNode::Number { value } => self.text.push_str(&format_number(*value)),
            RenderNode::Integer { value } => self.text.push_str(&value.to_string()),
            RenderNode::Element(element) => self.visit_element(element, depth + 1),
            RenderNode::Fragment { children } => {
                for child in children {
                    self.visit(child, depth);
                }
            }
            RenderNode::Empty => {}
        }
    }

    fn visit_element(&mut self, element: &Element, depth: usize) {
        self.element_count += 1;
        self.max_depth = self.max_depth.max(depth);

        if !self.outline.is_empty() && !self.outline.ends_with('(') {
            self.outline.push(',');
        }
        self.outline.push_str(&element.tag);

        for attr in &element.attrs {
            if let AttrValue::Text(value) = &attr.value
                && VISIBLE_ATTRS.contains(&attr.name.as_str())
            {
                self.visible_attrs
                    .push(format!("{}.{}={}", element.tag, attr.name, value));
            }
        }

        let outline_mark = self.outline.len();
        self.outline.push('(');
        for child in &element.children {
            self.visit(child, depth);
        }
        if self.outline.len() == outline_mark + 1 {
            // No element children: drop the empty parens.
            self.outline.truncate(outline_mark);
        } else {
            self.outline.push(')');
        }
    }
}

/// Collapse whitespace runs to a single space and trim both ends.
#[must_use]
pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{el, fragment, number, text};

    #[test]
    fn concatenates_text_in_document_order() {
        let tree = RenderTree::new(
            el("p")
                .child(number(5_445_000.0))
                .child(text(" milliseconds")),
        );
        let value = normalize(&tree);
        assert_eq!(value.text, "5445000 milliseconds");
        assert_eq!(value.element_count, 1);
        assert_eq!(value.max_depth, 1);
        assert_eq!(value.outline, "p");
    }

    #[test]
    fn fragments_are_transparent() {
        let wrapped = RenderTree::new(fragment([
            el("p").child("a").into(),
            fragment([el("p").child("b").into()]),
        ]));
        let flat = RenderTree::new(fragment([
            el("p").child("a").into(),
            el("p").child("b").into(),
        ]));
        assert_eq!(normalize(&wrapped), normalize(&flat));
        assert_eq!(normalize(&flat).outline, "p,p");
    }

    #[test]
    fn outline_and_depth_track_nesting() {
        let tree = RenderTree::new(
            el("div")
                .child(el("p").child(el("span").child("x")))
                .child(el("p")),
        );
        let value = normalize(&tree);
        assert_eq!(value.outline, "div(p(span),p)");
        assert_eq!(value.element_count, 4);
        assert_eq!(value.max_depth, 3);
    }

    #[test]
    fn keys_and_handlers_are_erased() {
        let keyed = RenderTree::new(
            el("span")
                .key("may")
                .attr("id", "row-1")
                .on("onClick", "select")
                .child("In may"),
        );
        let bare = RenderTree::new(el("span").child("In may"));
        assert_eq!(normalize(&keyed), normalize(&bare));
    }

    #[test]
    fn visible_attributes_are_kept() {
        let tree = RenderTree::new(el("img").attr("alt", "a fish").key("k"));
        let value = normalize(&tree);
        assert_eq!(value.visible_attrs, vec!["img.alt=a fish".to_string()]);
        let other = RenderTree::new(el("img").attr("alt", "a horse"));
        assert!(matches!(
            value.diff(&normalize(&other)),
            Some(CanonicalDiff::Attributes { .. })
        ));
    }

    #[test]
    fn whitespace_collapses_like_jsx_text() {
        let tree = RenderTree::new(fragment([
            text("\n  In the month of may "),
            text("  we like gardening.\n"),
        ]));
        assert_eq!(normalize(&tree).text, "In the month of may we like gardening.");
    }

    #[test]
    fn empty_output_is_default() {
        assert_eq!(normalize(&RenderTree::empty()), CanonicalValue::default());
    }

    #[test]
    fn diff_reports_first_text_offset() {
        let a = CanonicalValue::text_only("0,1,2");
        let b = CanonicalValue::text_only("0,13");
        match a.diff(&b) {
            Some(CanonicalDiff::Text { offset, .. }) => assert_eq!(offset, 3),
            other => panic!("expected text diff, got {other:?}"),
        }
        assert_eq!(a.diff(&a.clone()), None);
    }

    #[test]
    fn diff_reports_shape_before_outline() {
        let one = normalize(&RenderTree::new(el("div")));
        let two = normalize(&RenderTree::new(el("div").child(el("p"))));
        assert!(matches!(one.diff(&two), Some(CanonicalDiff::Shape { .. })));

        let div = normalize(&RenderTree::new(el("div")));
        let p = normalize(&RenderTree::new(el("p")));
        assert!(matches!(div.diff(&p), Some(CanonicalDiff::Outline { .. })));
    }

    #[test]
    fn fingerprint_is_stable_and_discriminating() {
        let a = CanonicalValue::text_only("4");
        assert_eq!(a.fingerprint(), a.clone().fingerprint());
        assert!(a.fingerprint().starts_with("blake3:"));
        assert_ne!(a.fingerprint(), CanonicalValue::text_only("5").fingerprint());
    }
}
