use std::cell::Cell;
use std::hash::{Hash, Hasher};

use inspect::dom::{ComputedStyle, Dom, PseudoElement};
use inspect::{Error, Rect};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CssStyleDeclaration, HtmlElement, Window};

use super::{get_body, window};
use crate::Res;

/// An element on the page together with the key identifying it.
#[derive(Clone, Debug)]
pub struct NodeRef {
    element: web_sys::Element,
    key: u32,
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for NodeRef {}

impl Hash for NodeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

/// The live page.
pub struct WebDom {
    window: Window,

    // Element to key. Weak so the page can still drop elements we've seen.
    keys: js_sys::WeakMap,
    next_key: Cell<u32>,
}

impl WebDom {
    pub fn new() -> Res<Self> {
        Ok(Self {
            window: window()?,
            keys: js_sys::WeakMap::new(),
            next_key: Cell::new(1),
        })
    }

    /// Handle for an element. The same element always gets the same key.
    pub fn node(&self, element: web_sys::Element) -> NodeRef {
        let object: &js_sys::Object = element.as_ref();
        let key = match self.keys.get(object).as_f64() {
            Some(key) => key as u32,
            None => {
                let key = self.next_key.get();
                self.next_key.set(key + 1);
                self.keys.set(object, &JsValue::from(key));
                key
            }
        };

        NodeRef { element, key }
    }

    /// Handle for an event target, if it's an element.
    pub fn target(&self, target: Option<web_sys::EventTarget>) -> Option<NodeRef> {
        target
            .and_then(|t| t.dyn_into::<web_sys::Element>().ok())
            .map(|e| self.node(e))
    }

    pub fn body(&self) -> Res<NodeRef> {
        Ok(self.node(get_body()?.unchecked_into::<web_sys::Element>()))
    }

    fn declaration(
        &self,
        element: &web_sys::Element,
        pseudo: Option<PseudoElement>,
    ) -> inspect::Result<CssStyleDeclaration> {
        let declaration = match pseudo {
            Some(pseudo) => self
                .window
                .get_computed_style_with_pseudo_elt(element, pseudo.selector()),
            None => self.window.get_computed_style(element),
        };

        match declaration {
            Ok(Some(declaration)) => Ok(declaration),
            Ok(None) => Err(Error::Dom(format!("no computed style for <{}>", element.local_name()))),
            Err(e) => Err(Error::Dom(format!("{e:?}"))),
        }
    }

    fn inline(element: &web_sys::Element) -> Option<CssStyleDeclaration> {
        element.dyn_ref::<HtmlElement>().map(HtmlElement::style)
    }
}

impl Dom for WebDom {
    type Node = NodeRef;

    fn tag_name(&self, node: &NodeRef) -> String {
        node.element.local_name()
    }

    fn parent(&self, node: &NodeRef) -> Option<NodeRef> {
        node.element.parent_element().map(|e| self.node(e))
    }

    fn children(&self, node: &NodeRef) -> Vec<NodeRef> {
        let children = node.element.children();
        (0..children.length())
            .filter_map(|i| children.item(i))
            .map(|e| self.node(e))
            .collect()
    }

    fn has_own_text(&self, node: &NodeRef) -> bool {
        let nodes = node.element.child_nodes();
        (0..nodes.length()).filter_map(|i| nodes.item(i)).any(|n| {
            n.node_type() == web_sys::Node::TEXT_NODE
                && n.text_content().is_some_and(|t| !t.trim().is_empty())
        })
    }

    fn has_text_content(&self, node: &NodeRef) -> bool {
        node.element
            .text_content()
            .is_some_and(|t| !t.trim().is_empty())
    }

    fn computed_style(
        &self,
        node: &NodeRef,
        pseudo: Option<PseudoElement>,
    ) -> inspect::Result<ComputedStyle> {
        let declaration = self.declaration(&node.element, pseudo)?;
        let get = |property: &str| declaration.get_property_value(property).unwrap_or_default();

        Ok(ComputedStyle {
            font_family: get("font-family"),
            font_weight: get("font-weight"),
            font_style: get("font-style"),
            font_size: get("font-size"),
            color: get("color"),
            line_height: get("line-height"),
            letter_spacing: get("letter-spacing"),
            display: get("display"),
            visibility: get("visibility"),
            opacity: get("opacity"),
            outline: get("outline"),
            background_color: get("background-color"),
            content: get("content"),
        })
    }

    fn bounding_box(&self, node: &NodeRef) -> Rect {
        let rect = node.element.get_bounding_client_rect();
        Rect::new(
            rect.x() as f32,
            rect.y() as f32,
            rect.width() as f32,
            rect.height() as f32,
        )
    }

    fn is_connected(&self, node: &NodeRef) -> bool {
        node.element.is_connected()
    }

    fn attribute(&self, node: &NodeRef, name: &str) -> Option<String> {
        node.element.get_attribute(name)
    }

    fn set_attribute(&self, node: &NodeRef, name: &str, value: &str) -> inspect::Result<()> {
        node.element
            .set_attribute(name, value)
            .map_err(|e| Error::Dom(format!("Failed to set {name}: {e:?}")))
    }

    fn remove_attribute(&self, node: &NodeRef, name: &str) -> inspect::Result<()> {
        node.element
            .remove_attribute(name)
            .map_err(|e| Error::Dom(format!("Failed to remove {name}: {e:?}")))
    }

    fn inline_style(&self, node: &NodeRef, property: &str) -> String {
        Self::inline(&node.element)
            .and_then(|style| style.get_property_value(property).ok())
            .unwrap_or_default()
    }

    fn set_inline_style(&self, node: &NodeRef, property: &str, value: &str) -> inspect::Result<()> {
        let Some(style) = Self::inline(&node.element) else {
            return Err(Error::Dom(format!(
                "<{}> has no inline style",
                node.element.local_name()
            )));
        };

        let result = if value.is_empty() {
            style.remove_property(property).map(|_| ())
        } else {
            style.set_property(property, value)
        };
        result.map_err(|e| Error::Dom(format!("Failed to set {property}: {e:?}")))
    }

    fn node_key(&self, node: &NodeRef) -> String {
        node.key.to_string()
    }

    fn now_ms(&self) -> f64 {
        js_sys::Date::now()
    }

    fn viewport(&self) -> Rect {
        let dimension = |value: Result<JsValue, JsValue>| {
            value.ok().and_then(|v| v.as_f64()).unwrap_or_default() as f32
        };
        Rect::sized(
            dimension(self.window.inner_width()),
            dimension(self.window.inner_height()),
        )
    }
}
