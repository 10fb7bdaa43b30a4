use std::fmt::Debug;
use std::hash::Hash;

use serde_derive::{Deserialize, Serialize};

use crate::error::Result;
use crate::Rect;

/// Marks every element the presentation layer adds to the page.
pub const UI_ATTRIBUTE: &str = "data-fontscope-ui";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PseudoElement {
    Before,
    After,
}

impl PseudoElement {
    pub const ALL: [PseudoElement; 2] = [PseudoElement::Before, PseudoElement::After];

    pub fn selector(&self) -> &'static str {
        match self {
            Self::Before => "::before",
            Self::After => "::after",
        }
    }
}

/// The subset of an element's resolved style the overlay cares about. Values
/// are the serialised CSS values as the browser reports them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ComputedStyle {
    pub font_family: String,
    pub font_weight: String,
    pub font_style: String,
    pub font_size: String,
    pub color: String,
    pub line_height: String,
    pub letter_spacing: String,
    pub display: String,
    pub visibility: String,
    pub opacity: String,
    pub outline: String,
    pub background_color: String,

    /// Generated content, only meaningful for pseudo-elements.
    pub content: String,
}

/// Everything the overlay needs from the page. The browser implementation
/// lives in the client; tests use an in-memory tree.
///
/// Mutating methods take `&self` because the page is shared, mutable state
/// owned by the browser, not by us.
pub trait Dom {
    /// Handle to an element. Equality must be element identity.
    type Node: Clone + Debug + Eq + Hash;

    /// Lower case tag name.
    fn tag_name(&self, node: &Self::Node) -> String;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Element children, in document order.
    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    /// Whether the element has a direct text node child containing anything
    /// other than whitespace.
    fn has_own_text(&self, node: &Self::Node) -> bool;

    /// Whether the element's text content, descendants included, contains
    /// anything other than whitespace.
    fn has_text_content(&self, node: &Self::Node) -> bool;

    fn computed_style(
        &self,
        node: &Self::Node,
        pseudo: Option<PseudoElement>,
    ) -> Result<ComputedStyle>;

    /// Layout box relative to the viewport.
    fn bounding_box(&self, node: &Self::Node) -> Rect;

    fn is_connected(&self, node: &Self::Node) -> bool;

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

    fn set_attribute(&self, node: &Self::Node, name: &str, value: &str) -> Result<()>;

    fn remove_attribute(&self, node: &Self::Node, name: &str) -> Result<()>;

    /// The element's own inline declaration for a property, empty if unset.
    fn inline_style(&self, node: &Self::Node, property: &str) -> String;

    /// Set an inline declaration. An empty value removes the declaration.
    fn set_inline_style(&self, node: &Self::Node, property: &str, value: &str) -> Result<()>;

    /// A string that is stable for the lifetime of the element and unique
    /// among live elements.
    fn node_key(&self, node: &Self::Node) -> String;

    /// Milliseconds since some fixed epoch.
    fn now_ms(&self) -> f64;

    fn viewport(&self) -> Rect;
}
