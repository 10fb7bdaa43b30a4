use inspect::Point;
use wasm_bindgen::JsCast;
use web_sys::HtmlElement;

use crate::bridge::{get_body, get_document};
use crate::Res;

#[derive(Clone)]
pub struct Element {
    element: HtmlElement,
}

impl Element {
    pub fn new(name: &str) -> Res<Element> {
        let element = get_document()?
            .create_element(name)
            .map(|e| e.unchecked_into::<HtmlElement>())
            .map_err(|e| format!("Element creation failed: {e:?}."))?;

        Ok(Element { element })
    }

    pub fn node(&self) -> &web_sys::Node {
        self.element.unchecked_ref::<web_sys::Node>()
    }

    pub fn add_to_page(&self) -> Res<()> {
        get_body()?
            .append_child(self.node())
            .map(|_| ())
            .map_err(|e| format!("Failed to add element to page: {e:?}."))
    }

    pub fn is_on_page(&self) -> bool {
        self.element.is_connected()
    }

    pub fn remove(&self) {
        self.element.remove();
    }

    pub fn set_css(&self, property: &str, value: &str) {
        self.try_set_css(property, value).ok();
    }

    pub fn with_css(self, declarations: &[(&str, &str)]) -> Self {
        for (property, value) in declarations {
            self.set_css(property, value);
        }
        self
    }

    pub fn hide(&self) {
        self.set_css("display", "none");
    }

    pub fn show(&self) {
        self.element.style().remove_property("display").ok();
    }

    pub fn set_attr(&self, name: &str, value: &str) {
        self.try_set_attr(name, value).ok();
    }

    pub fn with_attr(self, name: &str, value: &str) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn set_text(&self, text: &str) {
        self.element.set_text_content(Some(text));
    }

    pub fn with_text(self, text: &str) -> Self {
        self.set_text(text);
        self
    }

    pub fn append_child(&self, child: &Element) {
        self.element.append_child(child.node()).ok();
    }

    pub fn child(&self, name: &str) -> Res<Element> {
        let el = Element::new(name)?;
        self.append_child(&el);
        Ok(el)
    }

    pub fn set_pos(&self, pos: Point) {
        let pos = pos.round();
        self.set_css("left", &format!("{}px", pos.x));
        self.set_css("top", &format!("{}px", pos.y));
    }

    fn try_set_css(&self, property: &str, value: &str) -> Res<()> {
        self.element
            .style()
            .set_property(property, value)
            .map_err(|e| format!("Failed to set element CSS: {e:?}."))
    }

    fn try_set_attr(&self, name: &str, value: &str) -> Res<()> {
        self.element
            .set_attribute(name, value)
            .map_err(|e| format!("Failed to set element attribute: {e:?}."))
    }
}
