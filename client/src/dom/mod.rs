use std::collections::HashMap;

use inspect::controller::{
    DebugSnapshot, OverlaySnapshot, Presenter, TooltipView, EXIT_ATTRIBUTE, UI_ATTRIBUTE,
};
use inspect::panels::PanelId;

use self::element::Element;
use self::panel::PanelElement;
use crate::Res;

pub mod element;
mod panel;

const TEXT_CSS: &[(&str, &str)] = &[
    ("font-family", "system-ui, sans-serif"),
    ("font-size", "13px"),
    ("font-weight", "400"),
    ("font-style", "normal"),
    ("line-height", "1.4"),
    ("letter-spacing", "normal"),
    ("color", "#222222"),
    ("text-align", "left"),
];

const BUTTON_CSS: &[(&str, &str)] = &[
    ("font", "inherit"),
    ("cursor", "pointer"),
    ("border", "1px solid #c0c0c0"),
    ("border-radius", "4px"),
    ("background", "#ffffff"),
    ("padding", "2px 8px"),
];

const TOOLTIP_CSS: &[(&str, &str)] = &[
    ("position", "fixed"),
    ("max-width", "240px"),
    ("padding", "6px 8px"),
    ("background", "rgba(34, 34, 34, 0.92)"),
    ("border-radius", "4px"),
    ("pointer-events", "none"),
    ("z-index", "2147483647"),
    ("white-space", "pre-line"),
];

/// Draws the overlay with plain DOM elements under a single fixed container
/// marked as presentation UI.
pub struct DomPresenter {
    root: Element,
    tooltip: Element,
    debug: Element,
    panels: HashMap<PanelId, PanelElement>,
}

impl DomPresenter {
    pub fn new() -> Res<Self> {
        let root = Element::new("div")?
            .with_attr(UI_ATTRIBUTE, "")
            .with_css(&[
                ("position", "fixed"),
                ("inset", "0"),
                ("pointer-events", "none"),
                ("z-index", "2147483000"),
            ]);

        root.child("button")?
            .with_attr(EXIT_ATTRIBUTE, "")
            .with_css(TEXT_CSS)
            .with_css(BUTTON_CSS)
            .with_css(&[
                ("position", "fixed"),
                ("top", "10px"),
                ("right", "10px"),
                ("pointer-events", "auto"),
                ("z-index", "2147483647"),
            ])
            .with_text("Exit font inspector");

        let tooltip = root
            .child("div")?
            .with_css(TEXT_CSS)
            .with_css(TOOLTIP_CSS)
            .with_css(&[("color", "#ffffff")]);
        tooltip.hide();

        let debug = root
            .child("pre")?
            .with_css(TEXT_CSS)
            .with_css(&[
                ("position", "fixed"),
                ("left", "10px"),
                ("bottom", "10px"),
                ("max-width", "420px"),
                ("max-height", "40vh"),
                ("overflow", "auto"),
                ("margin", "0"),
                ("padding", "8px"),
                ("font-family", "ui-monospace, monospace"),
                ("font-size", "11px"),
                ("background", "rgba(255, 255, 255, 0.95)"),
                ("border", "1px solid #d0d0d0"),
                ("pointer-events", "auto"),
            ]);
        debug.hide();

        Ok(DomPresenter {
            root,
            tooltip,
            debug,
            panels: HashMap::new(),
        })
    }

    fn unmount(&mut self) {
        for (_, panel) in self.panels.drain() {
            panel.remove();
        }
        self.tooltip.hide();
        self.debug.hide();
        self.root.remove();
    }

    fn render_tooltip(&self, tooltip: Option<&TooltipView>) {
        let Some(tooltip) = tooltip else {
            self.tooltip.hide();
            return;
        };

        let metrics = &tooltip.metrics;
        let mut text = metrics.name.clone();
        if let Some(pseudo) = metrics.pseudo_type {
            text.push_str(pseudo.selector());
        }
        text.push_str(&format!("\n{} {} {}", metrics.weight, metrics.style, metrics.size));

        self.tooltip.set_text(&text);
        self.tooltip.set_pos(tooltip.position);
        self.tooltip.show();
    }

    fn render_panels(&mut self, snapshot: &OverlaySnapshot) -> Res<()> {
        self.panels.retain(|id, panel| {
            let open = snapshot.panels.iter().any(|p| &p.id == id);
            if !open {
                panel.remove();
            }
            open
        });

        for view in &snapshot.panels {
            match self.panels.get_mut(&view.id) {
                Some(panel) => panel.update(view),
                None => {
                    let panel = PanelElement::new(&self.root, view)?;
                    self.panels.insert(view.id.clone(), panel);
                }
            }
        }

        Ok(())
    }
}

impl Presenter for DomPresenter {
    fn render(&mut self, snapshot: &OverlaySnapshot) {
        if !snapshot.active {
            self.unmount();
            return;
        }

        if !self.root.is_on_page() {
            if let Err(e) = self.root.add_to_page() {
                log::error!("{e}");
                return;
            }
        }

        self.render_tooltip(snapshot.tooltip.as_ref());
        if let Err(e) = self.render_panels(snapshot) {
            log::error!("Failed to draw panels: {e}");
        }
    }

    fn render_debug(&mut self, snapshot: Option<&DebugSnapshot>) {
        match snapshot.map(serde_json::to_string_pretty) {
            Some(Ok(json)) => {
                self.debug.set_text(&json);
                self.debug.show();
            }
            Some(Err(e)) => log::warn!("Failed to serialise debug snapshot: {e}"),
            None => self.debug.hide(),
        }
    }
}
