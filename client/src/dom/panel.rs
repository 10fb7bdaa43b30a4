use inspect::controller::{PanelView, CLOSE_ATTRIBUTE, HEADER_ATTRIBUTE, HIGHLIGHT_ATTRIBUTE, PANEL_ATTRIBUTE};
use inspect::metrics::FontMetrics;

use super::element::Element;
use super::{BUTTON_CSS, TEXT_CSS};
use crate::Res;

const PANEL_CSS: &[(&str, &str)] = &[
    ("position", "fixed"),
    ("width", "320px"),
    ("max-height", "280px"),
    ("overflow", "auto"),
    ("box-sizing", "border-box"),
    ("background", "#ffffff"),
    ("border", "1px solid #d0d0d0"),
    ("border-radius", "6px"),
    ("box-shadow", "0 4px 16px rgba(0, 0, 0, 0.2)"),
    ("pointer-events", "auto"),
];

const HEADER_CSS: &[(&str, &str)] = &[
    ("display", "flex"),
    ("justify-content", "space-between"),
    ("align-items", "center"),
    ("padding", "6px 10px"),
    ("background", "#f3f3f3"),
    ("border-bottom", "1px solid #d0d0d0"),
    ("cursor", "move"),
    ("user-select", "none"),
];

/// Label and value pairs shown for a font.
pub fn rows(metrics: &FontMetrics) -> Vec<(&'static str, String)> {
    let mut rows = vec![
        ("Weight", metrics.weight.to_string()),
        ("Style", metrics.style.clone()),
        ("Size", metrics.size.clone()),
        ("Line height", metrics.line_height.clone()),
        ("Letter spacing", metrics.letter_spacing.clone()),
        ("Colour", metrics.color.clone()),
    ];

    if let Some(category) = metrics.category {
        rows.push(("Category", category.label().to_string()));
    }
    if !metrics.alternative_fonts.is_empty() {
        rows.push(("Fallbacks", metrics.alternative_fonts.join(", ")));
    }
    if let Some(pseudo) = metrics.pseudo_type {
        rows.push(("Pseudo-element", pseudo.selector().to_string()));
    }

    rows
}

/// A comparison panel on the page. Controls carry marker attributes; the
/// controller works out what was clicked from those.
pub struct PanelElement {
    root: Element,
    highlight: Element,
    view: PanelView,
}

impl PanelElement {
    pub fn new(parent: &Element, view: &PanelView) -> Res<Self> {
        let id = view.id.as_str();
        let root = parent
            .child("div")?
            .with_attr(PANEL_ATTRIBUTE, id)
            .with_css(PANEL_CSS)
            .with_css(TEXT_CSS);

        let header = root
            .child("div")?
            .with_attr(HEADER_ATTRIBUTE, id)
            .with_css(HEADER_CSS);
        header.child("strong")?.with_text(&view.metrics.name);
        header
            .child("button")?
            .with_attr(CLOSE_ATTRIBUTE, id)
            .with_attr("title", "Close")
            .with_css(BUTTON_CSS)
            .with_text("\u{d7}");

        let list = root
            .child("dl")?
            .with_css(&[("margin", "0"), ("padding", "8px 10px")]);
        for (label, value) in rows(&view.metrics) {
            list.child("dt")?
                .with_css(&[("font-weight", "600"), ("color", "#555555")])
                .with_text(label);
            list.child("dd")?
                .with_css(&[("margin", "0 0 4px 0")])
                .with_text(&value);
        }

        let highlight = root
            .child("button")?
            .with_attr(HIGHLIGHT_ATTRIBUTE, id)
            .with_css(BUTTON_CSS)
            .with_css(&[("margin", "0 10px 10px 10px")]);

        let panel = PanelElement {
            root,
            highlight,
            view: view.clone(),
        };
        panel.apply();
        Ok(panel)
    }

    pub fn update(&mut self, view: &PanelView) {
        if &self.view != view {
            self.view = view.clone();
            self.apply();
        }
    }

    fn apply(&self) {
        self.root.set_pos(self.view.position);
        self.root.set_css("z-index", &self.view.z_index.to_string());
        self.highlight.set_text(if self.view.is_highlighted {
            "Remove highlight"
        } else {
            "Highlight element"
        });
    }

    pub fn remove(&self) {
        self.root.remove();
    }
}
