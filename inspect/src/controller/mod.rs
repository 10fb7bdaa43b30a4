use crate::config::DebugConfig;
use crate::dom::{Dom, PseudoElement};
use crate::error::{Error, Result};
use crate::hierarchy::{AnalysisReport, FontHierarchyAnalyzer};
use crate::metrics::{FontMetrics, FontMetricsExtractor};
use crate::panels::{PanelId, PanelRegistry, Placement};
use crate::tracking::ElementTrackingStore;
use crate::Point;

pub use self::view::{DebugSnapshot, OverlaySnapshot, PanelView, State, TooltipView};

mod view;

#[cfg(test)]
mod test;

pub use crate::dom::UI_ATTRIBUTE;

/// Root of a panel. The value is the panel's id, as are the values of the
/// control attributes below.
pub const PANEL_ATTRIBUTE: &str = "data-fontscope-panel";
pub const CLOSE_ATTRIBUTE: &str = "data-fontscope-close";
pub const HIGHLIGHT_ATTRIBUTE: &str = "data-fontscope-highlight";

/// Drag handle of a panel.
pub const HEADER_ATTRIBUTE: &str = "data-fontscope-header";

pub const EXIT_ATTRIBUTE: &str = "data-fontscope-exit";

/// Page listeners feeding the controller. Cancelling must detach everything
/// synchronously: event listeners, observers and timers.
pub trait Subscription {
    fn cancel(&mut self);
}

/// Draws the overlay. Receives a fresh snapshot after every state change.
pub trait Presenter {
    fn render(&mut self, snapshot: &OverlaySnapshot);

    /// Refresh the debug panel; `None` removes it.
    fn render_debug(&mut self, _snapshot: Option<&DebugSnapshot>) {}
}

/// User intents raised by the presentation layer.
pub trait OverlayHandlers {
    type Node;

    fn on_exit(&mut self);
    fn on_close_modal(&mut self, id: &PanelId) -> Result<()>;
    fn on_bring_modal_to_front(&mut self, id: &PanelId) -> Result<()>;

    /// Set the highlight of `element` through the panel inspecting it.
    fn on_highlight_element(
        &mut self,
        element: &Self::Node,
        id: &PanelId,
        highlighting: bool,
    ) -> Result<bool>;
}

/// What a pointer event landed on.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Hit {
    Page,
    Overlay,
    Exit,
    Panel(PanelId),
    Close(PanelId),
    Highlight(PanelId),
    Header(PanelId),
}

#[derive(Clone, Debug)]
struct Drag {
    panel: PanelId,

    /// Pointer position relative to the panel's top left.
    grab: Point,
}

pub struct InteractionController<D: Dom> {
    dom: D,
    state: State,
    analyzer: FontHierarchyAnalyzer<D::Node>,
    extractor: FontMetricsExtractor<D::Node>,
    tracking: ElementTrackingStore<D::Node>,
    panels: PanelRegistry<D::Node>,
    tooltip: Option<TooltipView>,
    drag: Option<Drag>,

    /// Highlight toggles are ignored until this time.
    toggle_guard: Option<f64>,
    subscription: Option<Box<dyn Subscription>>,
    presenter: Option<Box<dyn Presenter>>,
    debug: DebugConfig,
}

impl<D: Dom> InteractionController<D> {
    pub const TOGGLE_GUARD_MS: f64 = 300.0;

    pub fn new(dom: D) -> Self {
        Self {
            dom,
            state: State::Inactive,
            analyzer: FontHierarchyAnalyzer::new(),
            extractor: FontMetricsExtractor::new(),
            tracking: ElementTrackingStore::new(),
            panels: PanelRegistry::new(),
            tooltip: None,
            drag: None,
            toggle_guard: None,
            subscription: None,
            presenter: None,
            debug: DebugConfig::default(),
        }
    }

    pub fn set_presenter(&mut self, presenter: Box<dyn Presenter>) {
        self.presenter = Some(presenter);
        self.render();
    }

    pub fn dom(&self) -> &D {
        &self.dom
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == State::Active
    }

    pub fn panels(&self) -> &PanelRegistry<D::Node> {
        &self.panels
    }

    pub fn tracking(&self) -> &ElementTrackingStore<D::Node> {
        &self.tracking
    }

    pub fn analyzer(&self) -> &FontHierarchyAnalyzer<D::Node> {
        &self.analyzer
    }

    pub fn debug_config(&self) -> &DebugConfig {
        &self.debug
    }

    pub fn set_debug_config(&mut self, config: DebugConfig) {
        self.debug = config;
        if !self.debug.wants_panel() {
            if let Some(presenter) = self.presenter.as_mut() {
                presenter.render_debug(None);
            }
        }
    }

    /// Analyse the page under `root` and start responding to events from
    /// `subscription`. Activating while active restarts the overlay.
    pub fn activate(&mut self, root: &D::Node, subscription: Box<dyn Subscription>) {
        if self.is_active() {
            log::info!("Restarting font overlay.");
            self.deactivate();
        }

        self.analyzer.reset();
        self.analyzer.analyze_hierarchy(&self.dom, root);
        self.subscription = Some(subscription);
        self.state = State::Active;

        log::info!(
            "Font overlay active: {} elements analysed, primary font {}.",
            self.analyzer.len(),
            self.analyzer.primary_font().unwrap_or("unknown")
        );
        self.render();
    }

    /// Close every panel, restore every highlighted element and detach from
    /// the page. Safe to call in any state, any number of times.
    pub fn deactivate(&mut self) {
        let was_active = self.is_active();

        self.panels.close_all(&mut self.tracking, &self.dom);
        self.tracking.cleanup_all(&self.dom);
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
        }

        self.panels.reset();
        self.tooltip = None;
        self.drag = None;
        self.toggle_guard = None;
        self.state = State::Inactive;

        self.render();
        if let Some(presenter) = self.presenter.as_mut() {
            presenter.render_debug(None);
        }

        if was_active {
            log::info!("Font overlay deactivated.");
        }
    }

    /// Full analysis of the most recent pass.
    pub fn report(&self) -> AnalysisReport {
        self.analyzer.report()
    }

    /// `target` is the element under the pointer, if any; `at` is in
    /// viewport coordinates.
    pub fn pointer_move(&mut self, target: Option<&D::Node>, at: Point) {
        if !self.is_active() {
            return;
        }

        if let Some(drag) = &self.drag {
            let viewport = self.dom.viewport();
            if let Err(e) = self.panels.move_to(&drag.panel, at - drag.grab, viewport) {
                log::warn!("Dropping drag: {e}");
                self.drag = None;
            }
            self.render();
            return;
        }

        let tooltip = target.and_then(|target| self.tooltip_for(target, at));
        if tooltip != self.tooltip {
            self.tooltip = tooltip;
            self.render();
        }
    }

    /// Start dragging if the pointer went down on a panel's header. Returns
    /// whether the event was consumed.
    pub fn pointer_down(&mut self, target: &D::Node, at: Point) -> bool {
        if !self.is_active() {
            return false;
        }

        let Hit::Header(id) = self.hit(target) else {
            return false;
        };

        let Some(panel) = self.panels.get(&id) else {
            log::warn!("Header of {id} has no open panel.");
            return false;
        };
        let grab = at - panel.position;

        if let Err(e) = self.panels.bring_to_front(&id) {
            log::warn!("{e}");
        }
        self.drag = Some(Drag { panel: id, grab });
        self.render();
        true
    }

    pub fn pointer_up(&mut self) {
        if let Some(drag) = self.drag.take() {
            log::debug!("Finished dragging {}.", drag.panel);
        }
    }

    /// Handle a click. While active every click is consumed so the page
    /// doesn't react to it.
    pub fn click(&mut self, target: &D::Node, at: Point) -> bool {
        if !self.is_active() {
            return false;
        }

        let result = match self.hit(target) {
            Hit::Close(id) => self.panels.close(&id, &mut self.tracking, &self.dom),
            Hit::Highlight(id) => self.toggle_highlight(&id, None).map(|_| ()),
            Hit::Panel(id) | Hit::Header(id) => self.panels.bring_to_front(&id).map(|_| ()),
            Hit::Exit => {
                self.deactivate();
                return true;
            }
            Hit::Overlay => Ok(()),
            Hit::Page => {
                self.open_panel(target, at);
                Ok(())
            }
        };

        if let Err(e) = result {
            log::warn!("{e}");
        }
        self.render();
        true
    }

    /// Analyse elements the page inserted since activation. Presentation
    /// elements are ignored.
    pub fn nodes_added(&mut self, nodes: &[D::Node]) {
        if !self.is_active() {
            return;
        }

        let page: Vec<D::Node> = nodes
            .iter()
            .filter(|node| self.dom.is_connected(node) && self.hit(node) == Hit::Page)
            .cloned()
            .collect();

        let before = self.analyzer.len();
        self.analyzer.analyze_added_batch(&self.dom, &page);

        let added = self.analyzer.len() - before;
        if added > 0 {
            log::debug!("Analysed {added} elements added to the page.");
        }
    }

    /// The viewport was resized or scrolled.
    pub fn viewport_changed(&mut self) {
        if !self.is_active() {
            return;
        }

        self.panels.reclamp(self.dom.viewport());
        self.tooltip = None;
        self.render();
    }

    /// Periodic refresh of the debug panel.
    pub fn debug_tick(&mut self) {
        if !self.is_active() || !self.debug.wants_panel() {
            return;
        }

        let snapshot = self.debug_snapshot();
        if let Some(presenter) = self.presenter.as_mut() {
            presenter.render_debug(Some(&snapshot));
        }
    }

    pub fn snapshot(&self) -> OverlaySnapshot {
        OverlaySnapshot {
            active: self.is_active(),
            tooltip: self.tooltip.clone(),
            panels: self.panel_views(),
        }
    }

    pub fn debug_snapshot(&self) -> DebugSnapshot {
        let mut tracked_elements: Vec<String> = self.tracking.track_ids().cloned().collect();
        tracked_elements.sort();

        DebugSnapshot {
            state: self.state,
            panels: self.panel_views(),
            tracked_elements,
            analyzed_elements: self.analyzer.len(),
            cached_metrics: self.analyzer.cached_metrics(),
            primary_font: self.analyzer.primary_font().map(str::to_string),
            font_usage_stats: self.analyzer.font_usage_stats(),
            dragging: self.drag.as_ref().map(|drag| drag.panel.clone()),
            timestamp: self.dom.now_ms(),
        }
    }

    fn panel_views(&self) -> Vec<PanelView> {
        self.panels
            .iter()
            .map(|(id, panel)| PanelView::new(id, panel))
            .collect()
    }

    fn render(&mut self) {
        let snapshot = self.snapshot();
        if let Some(presenter) = self.presenter.as_mut() {
            presenter.render(&snapshot);
        }
    }

    fn hit(&self, target: &D::Node) -> Hit {
        let mut current = Some(target.clone());
        while let Some(node) = current {
            let attribute = |name| self.dom.attribute(&node, name).map(PanelId::new);

            if let Some(id) = attribute(CLOSE_ATTRIBUTE) {
                return Hit::Close(id);
            } else if let Some(id) = attribute(HIGHLIGHT_ATTRIBUTE) {
                return Hit::Highlight(id);
            } else if let Some(id) = attribute(HEADER_ATTRIBUTE) {
                return Hit::Header(id);
            } else if let Some(id) = attribute(PANEL_ATTRIBUTE) {
                return Hit::Panel(id);
            } else if attribute(EXIT_ATTRIBUTE).is_some() {
                return Hit::Exit;
            } else if attribute(UI_ATTRIBUTE).is_some() {
                return Hit::Overlay;
            }

            current = self.dom.parent(&node);
        }
        Hit::Page
    }

    fn tooltip_for(&self, target: &D::Node, at: Point) -> Option<TooltipView> {
        let viewport = self.dom.viewport();
        if !viewport.contains_point(at) || self.hit(target) != Hit::Page {
            return None;
        }

        Some(TooltipView {
            metrics: self.inspect(target, at)?,
            position: Placement::TOOLTIP.place(at, viewport),
        })
    }

    /// Metrics for whatever is under the pointer, preferring a pseudo-element
    /// when the pointer is over the part of the box it likely occupies.
    fn inspect(&self, target: &D::Node, at: Point) -> Option<FontMetrics> {
        match self.pseudo_at(target, at) {
            Some(pseudo) => self
                .extractor
                .extract(&self.dom, target, Some(pseudo))
                .or_else(|| self.extractor.extract(&self.dom, target, None)),
            None => self.extractor.extract(&self.dom, target, None),
        }
    }

    // Pseudo-elements have no boxes of their own, so this is a guess: the top
    // of the box is ::before, the bottom ::after. Elements with text only
    // yield the outer quarters to their pseudo-elements.
    fn pseudo_at(&self, target: &D::Node, at: Point) -> Option<PseudoElement> {
        let generated = FontMetricsExtractor::generated_pseudo_elements(&self.dom, target);
        if generated.is_empty() {
            return None;
        }

        let bbox = self.dom.bounding_box(target);
        let has_text = self.dom.has_text_content(target);
        let band = if has_text { bbox.h / 4.0 } else { bbox.h / 2.0 };

        if at.y < bbox.y + band && generated.contains(&PseudoElement::Before) {
            Some(PseudoElement::Before)
        } else if at.y >= bbox.y + bbox.h - band && generated.contains(&PseudoElement::After) {
            Some(PseudoElement::After)
        } else if !has_text {
            generated.first().copied()
        } else {
            None
        }
    }

    fn open_panel(&mut self, target: &D::Node, at: Point) {
        let Some(metrics) = self.inspect(target, at) else {
            log::debug!("No font information for <{}>.", self.dom.tag_name(target));
            return;
        };

        let name = metrics.name.clone();
        let id = self.panels.open(&self.dom, target, metrics, at);
        log::info!("Opened {id} for <{}> ({name}).", self.dom.tag_name(target));
    }

    /// Toggle, or set when `highlighting` is given, a panel's highlight.
    /// Requests arriving within the guard window of the last change are
    /// ignored. Returns the panel's highlight state afterwards.
    fn toggle_highlight(&mut self, id: &PanelId, highlighting: Option<bool>) -> Result<bool> {
        let now = self.dom.now_ms();
        if self.toggle_guard.is_some_and(|until| now < until) {
            log::debug!("Ignoring repeated highlight toggle for {id}.");
            return self
                .panels
                .get(id)
                .map(|panel| panel.is_highlighted)
                .ok_or_else(|| Error::UnknownPanel(id.to_string()));
        }

        let highlighted = match highlighting {
            Some(on) => self
                .panels
                .set_highlight(id, on, &mut self.tracking, &self.dom)?,
            None => self
                .panels
                .toggle_highlight(id, &mut self.tracking, &self.dom)?,
        };
        self.toggle_guard = Some(now + Self::TOGGLE_GUARD_MS);
        Ok(highlighted)
    }
}

impl<D: Dom> OverlayHandlers for InteractionController<D> {
    type Node = D::Node;

    fn on_exit(&mut self) {
        self.deactivate();
    }

    fn on_close_modal(&mut self, id: &PanelId) -> Result<()> {
        self.panels.close(id, &mut self.tracking, &self.dom)?;
        self.render();
        Ok(())
    }

    fn on_bring_modal_to_front(&mut self, id: &PanelId) -> Result<()> {
        if self.panels.bring_to_front(id)? {
            self.render();
        }
        Ok(())
    }

    fn on_highlight_element(
        &mut self,
        element: &D::Node,
        id: &PanelId,
        highlighting: bool,
    ) -> Result<bool> {
        let panel = self
            .panels
            .get(id)
            .ok_or_else(|| Error::UnknownPanel(id.to_string()))?;
        if &panel.target_element != element {
            return Err(Error::WrongTarget(id.to_string()));
        }

        let highlighted = self.toggle_highlight(id, Some(highlighting))?;
        self.render();
        Ok(highlighted)
    }
}
