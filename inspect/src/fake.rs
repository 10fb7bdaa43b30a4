//! In-memory page used by the tests in this crate.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::dom::{ComputedStyle, Dom, PseudoElement};
use crate::error::{Error, Result};
use crate::Rect;

pub type FakeNode = usize;

struct FakeElement {
    tag: String,
    parent: Option<FakeNode>,
    children: Vec<FakeNode>,
    text: bool,
    style: ComputedStyle,
    pseudo: HashMap<PseudoElement, ComputedStyle>,
    bbox: Rect,
    attributes: BTreeMap<String, String>,
    connected: bool,
}

impl FakeElement {
    /// Inline declarations, in order, parsed from the `style` attribute.
    fn declarations(&self) -> Vec<(String, String)> {
        self.attributes
            .get("style")
            .map(|style| {
                style
                    .split(';')
                    .filter_map(|d| d.split_once(':'))
                    .map(|(p, v)| (p.trim().to_string(), v.trim().to_string()))
                    .filter(|(p, _)| !p.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn inline(&self, property: &str) -> Option<String> {
        self.declarations()
            .into_iter()
            .rev()
            .find(|(p, _)| p == property)
            .map(|(_, v)| v)
    }
}

pub struct FakeDom {
    elements: RefCell<Vec<FakeElement>>,
    broken: RefCell<HashSet<FakeNode>>,
    clock: Cell<f64>,
    viewport: Cell<Rect>,
}

fn default_style(family: &str) -> ComputedStyle {
    ComputedStyle {
        font_family: family.to_string(),
        font_weight: "400".into(),
        font_style: "normal".into(),
        font_size: "16px".into(),
        color: "rgb(0, 0, 0)".into(),
        line_height: "normal".into(),
        letter_spacing: "normal".into(),
        display: "block".into(),
        visibility: "visible".into(),
        opacity: "1".into(),
        outline: "rgb(0, 0, 0) none 0px".into(),
        background_color: "rgba(0, 0, 0, 0)".into(),
        content: "normal".into(),
    }
}

impl FakeDom {
    pub fn new() -> Self {
        let body = FakeElement {
            tag: "body".into(),
            parent: None,
            children: Vec::new(),
            text: false,
            style: default_style("Times New Roman"),
            pseudo: HashMap::new(),
            bbox: Rect::sized(1280.0, 2000.0),
            attributes: BTreeMap::new(),
            connected: true,
        };

        Self {
            elements: RefCell::new(vec![body]),
            broken: RefCell::new(HashSet::new()),
            clock: Cell::new(1_000.0),
            viewport: Cell::new(Rect::sized(1280.0, 800.0)),
        }
    }

    pub fn root(&self) -> FakeNode {
        0
    }

    /// A visible element without text of its own.
    pub fn element(&self, parent: FakeNode, tag: &str, family: &str) -> FakeNode {
        let mut elements = self.elements.borrow_mut();
        let id = elements.len();
        let connected = elements[parent].connected;
        elements.push(FakeElement {
            tag: tag.to_string(),
            parent: Some(parent),
            children: Vec::new(),
            text: false,
            style: default_style(family),
            pseudo: HashMap::new(),
            bbox: Rect::new(0.0, 20.0 * id as f32, 200.0, 20.0),
            attributes: BTreeMap::new(),
            connected,
        });
        elements[parent].children.push(id);
        id
    }

    /// A visible element with a text node child.
    pub fn text_element(&self, parent: FakeNode, tag: &str, family: &str) -> FakeNode {
        let id = self.element(parent, tag, family);
        self.elements.borrow_mut()[id].text = true;
        id
    }

    pub fn style_mut<F: FnOnce(&mut ComputedStyle)>(&self, node: FakeNode, f: F) {
        f(&mut self.elements.borrow_mut()[node].style);
    }

    pub fn pseudo_mut<F: FnOnce(&mut ComputedStyle)>(
        &self,
        node: FakeNode,
        pseudo: PseudoElement,
        f: F,
    ) {
        let mut elements = self.elements.borrow_mut();
        let element = &mut elements[node];
        let base = element.style.clone();
        f(element.pseudo.entry(pseudo).or_insert_with(|| ComputedStyle {
            content: "none".into(),
            ..base
        }));
    }

    pub fn set_box(&self, node: FakeNode, bbox: Rect) {
        self.elements.borrow_mut()[node].bbox = bbox;
    }

    /// Make style reads for this element fail, as a detached or cross-origin
    /// element might.
    pub fn break_style(&self, node: FakeNode) {
        self.broken.borrow_mut().insert(node);
    }

    /// Remove an element and its subtree from the document.
    pub fn detach(&self, node: FakeNode) {
        let mut elements = self.elements.borrow_mut();
        if let Some(parent) = elements[node].parent.take() {
            elements[parent].children.retain(|&c| c != node);
        }

        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            elements[n].connected = false;
            stack.extend(elements[n].children.iter().copied());
        }
    }

    pub fn advance(&self, ms: f64) {
        self.clock.set(self.clock.get() + ms);
    }

    pub fn set_viewport(&self, viewport: Rect) {
        self.viewport.set(viewport);
    }

    /// Number of elements in the document carrying this attribute.
    pub fn attribute_count(&self, name: &str) -> usize {
        self.elements
            .borrow()
            .iter()
            .filter(|e| e.connected && e.attributes.contains_key(name))
            .count()
    }

    pub fn inline_declarations(&self, node: FakeNode) -> BTreeMap<String, String> {
        self.elements.borrow()[node].declarations().into_iter().collect()
    }

    pub fn attributes(&self, node: FakeNode) -> BTreeMap<String, String> {
        self.elements.borrow()[node].attributes.clone()
    }
}

impl Dom for FakeDom {
    type Node = FakeNode;

    fn tag_name(&self, node: &FakeNode) -> String {
        self.elements.borrow()[*node].tag.clone()
    }

    fn parent(&self, node: &FakeNode) -> Option<FakeNode> {
        self.elements.borrow()[*node].parent
    }

    fn children(&self, node: &FakeNode) -> Vec<FakeNode> {
        self.elements.borrow()[*node].children.clone()
    }

    fn has_own_text(&self, node: &FakeNode) -> bool {
        self.elements.borrow()[*node].text
    }

    fn has_text_content(&self, node: &FakeNode) -> bool {
        let elements = self.elements.borrow();
        let mut stack = vec![*node];
        while let Some(n) = stack.pop() {
            if elements[n].text {
                return true;
            }
            stack.extend(elements[n].children.iter().copied());
        }
        false
    }

    fn computed_style(
        &self,
        node: &FakeNode,
        pseudo: Option<PseudoElement>,
    ) -> Result<ComputedStyle> {
        if self.broken.borrow().contains(node) {
            return Err(Error::Dom(format!("style unavailable for {node}")));
        }

        let elements = self.elements.borrow();
        let element = &elements[*node];
        match pseudo {
            Some(p) => Ok(element.pseudo.get(&p).cloned().unwrap_or_else(|| ComputedStyle {
                content: "none".into(),
                ..element.style.clone()
            })),
            None => {
                let mut style = element.style.clone();
                if let Some(outline) = element.inline("outline") {
                    style.outline = outline;
                }
                if let Some(background) = element.inline("background-color") {
                    style.background_color = background;
                }
                Ok(style)
            }
        }
    }

    fn bounding_box(&self, node: &FakeNode) -> Rect {
        self.elements.borrow()[*node].bbox
    }

    fn is_connected(&self, node: &FakeNode) -> bool {
        self.elements.borrow()[*node].connected
    }

    fn attribute(&self, node: &FakeNode, name: &str) -> Option<String> {
        self.elements.borrow()[*node].attributes.get(name).cloned()
    }

    fn set_attribute(&self, node: &FakeNode, name: &str, value: &str) -> Result<()> {
        self.elements.borrow_mut()[*node]
            .attributes
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove_attribute(&self, node: &FakeNode, name: &str) -> Result<()> {
        self.elements.borrow_mut()[*node].attributes.remove(name);
        Ok(())
    }

    fn inline_style(&self, node: &FakeNode, property: &str) -> String {
        self.elements.borrow()[*node]
            .inline(property)
            .unwrap_or_default()
    }

    // Like the CSSOM: every change re-serialises the whole `style` attribute,
    // which is left in place (possibly empty) once it exists.
    fn set_inline_style(&self, node: &FakeNode, property: &str, value: &str) -> Result<()> {
        let mut elements = self.elements.borrow_mut();
        let element = &mut elements[*node];
        let mut declarations = element.declarations();
        let present = declarations.iter().any(|(p, _)| p == property);

        if value.is_empty() {
            if !present {
                return Ok(());
            }
            declarations.retain(|(p, _)| p != property);
        } else if present {
            for (_, v) in declarations.iter_mut().filter(|(p, _)| p == property) {
                *v = value.to_string();
            }
        } else {
            declarations.push((property.to_string(), value.to_string()));
        }

        let serialised: Vec<String> = declarations
            .iter()
            .map(|(p, v)| format!("{p}: {v};"))
            .collect();
        element
            .attributes
            .insert("style".to_string(), serialised.join(" "));
        Ok(())
    }

    fn node_key(&self, node: &FakeNode) -> String {
        node.to_string()
    }

    fn now_ms(&self) -> f64 {
        self.clock.get()
    }

    fn viewport(&self) -> Rect {
        self.viewport.get()
    }
}
