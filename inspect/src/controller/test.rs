use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::*;
use crate::config::LogLevel;
use crate::fake::{FakeDom, FakeNode};
use crate::panels::Z_INDEX_BASE;
use crate::tracking::{HIGHLIGHT_OUTLINE, TRACK_ATTRIBUTE};
use crate::Rect;

fn centre(rect: Rect) -> Point {
    Point::new(rect.x + rect.w / 2.0, rect.y + rect.h / 2.0)
}

#[derive(Clone, Default)]
struct Recorder {
    frames: Rc<RefCell<Vec<OverlaySnapshot>>>,
    debug: Rc<RefCell<Vec<Option<DebugSnapshot>>>>,
}

impl Recorder {
    fn last(&self) -> OverlaySnapshot {
        self.frames.borrow().last().cloned().unwrap_or_default()
    }
}

impl Presenter for Recorder {
    fn render(&mut self, snapshot: &OverlaySnapshot) {
        self.frames.borrow_mut().push(snapshot.clone());
    }

    fn render_debug(&mut self, snapshot: Option<&DebugSnapshot>) {
        self.debug.borrow_mut().push(snapshot.cloned());
    }
}

struct Listening(Rc<Cell<u32>>);

impl Subscription for Listening {
    fn cancel(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

struct Page {
    div: FakeNode,
    h1: FakeNode,
    p: FakeNode,
}

struct Harness {
    ctl: InteractionController<FakeDom>,
    recorder: Recorder,
    cancelled: Rc<Cell<u32>>,
}

impl Harness {
    fn dom(&self) -> &FakeDom {
        self.ctl.dom()
    }

    fn activate(&mut self) {
        let root = self.dom().root();
        self.ctl
            .activate(&root, Box::new(Listening(self.cancelled.clone())));
    }

    fn click_on(&mut self, node: FakeNode) -> bool {
        let at = centre(self.dom().bounding_box(&node));
        self.ctl.click(&node, at)
    }

    /// The most recently opened panel.
    fn newest_panel(&self) -> PanelId {
        self.ctl
            .panels()
            .iter()
            .last()
            .map(|(id, _)| id.clone())
            .unwrap()
    }

    fn z_index(&self, id: &PanelId) -> i32 {
        self.ctl.panels().get(id).unwrap().z_index
    }

    /// Build the elements a presenter would draw for a panel.
    fn panel_ui(&self, id: &PanelId) -> PanelUi {
        let dom = self.dom();
        let root = dom.element(dom.root(), "div", "Inter");
        dom.set_attribute(&root, UI_ATTRIBUTE, "").unwrap();
        dom.set_attribute(&root, PANEL_ATTRIBUTE, id.as_str()).unwrap();

        let header = dom.text_element(root, "header", "Inter");
        dom.set_attribute(&header, HEADER_ATTRIBUTE, id.as_str()).unwrap();
        let close = dom.text_element(header, "button", "Inter");
        dom.set_attribute(&close, CLOSE_ATTRIBUTE, id.as_str()).unwrap();
        let body = dom.text_element(root, "dl", "Inter");
        let highlight = dom.text_element(root, "button", "Inter");
        dom.set_attribute(&highlight, HIGHLIGHT_ATTRIBUTE, id.as_str())
            .unwrap();

        PanelUi {
            header,
            close,
            body,
            highlight,
        }
    }
}

struct PanelUi {
    header: FakeNode,
    close: FakeNode,
    body: FakeNode,
    highlight: FakeNode,
}

/// body > div > (h1 in Arial, p in Georgia)
fn setup() -> (Harness, Page) {
    let dom = FakeDom::new();
    let div = dom.element(dom.root(), "div", "Arial");
    let h1 = dom.text_element(div, "h1", "Arial");
    let p = dom.text_element(div, "p", "Georgia");

    let recorder = Recorder::default();
    let mut ctl = InteractionController::new(dom);
    ctl.set_presenter(Box::new(recorder.clone()));

    let harness = Harness {
        ctl,
        recorder,
        cancelled: Rc::new(Cell::new(0)),
    };
    (harness, Page { div, h1, p })
}

#[test]
fn test_activate_analyses_page() {
    let (mut h, _) = setup();
    h.activate();

    assert!(h.ctl.is_active());
    assert!(h.recorder.last().active);

    let report = h.ctl.report();
    assert_eq!(report.font_usage_stats.get("Arial"), Some(&1));
    assert_eq!(report.font_usage_stats.get("Georgia"), Some(&1));
    assert_eq!(report.primary_font.as_deref(), Some("Arial"));
}

#[test]
fn test_clicks_open_and_stack_panels() {
    let (mut h, page) = setup();
    h.activate();

    assert!(h.click_on(page.h1));
    let p1 = h.newest_panel();
    assert!(h.click_on(page.p));
    let p2 = h.newest_panel();
    assert_eq!(h.z_index(&p1), Z_INDEX_BASE + 1);
    assert_eq!(h.z_index(&p2), Z_INDEX_BASE + 2);

    let ui = h.panel_ui(&p1);
    assert!(h.click_on(ui.body));
    assert_eq!(h.z_index(&p1), Z_INDEX_BASE + 3);
    assert_eq!(h.z_index(&p2), Z_INDEX_BASE + 2);

    let frame = h.recorder.last();
    assert_eq!(frame.panels.len(), 2);
    assert_eq!(frame.panels[0].id, p2);
    assert_eq!(frame.panels[1].id, p1);
    assert_eq!(frame.panels[1].metrics.name, "Arial");
}

#[test]
fn test_clicking_panel_ui_opens_nothing() {
    let (mut h, page) = setup();
    h.activate();
    h.click_on(page.h1);
    let id = h.newest_panel();
    let ui = h.panel_ui(&id);

    h.click_on(ui.header);
    h.click_on(ui.body);
    assert_eq!(h.ctl.panels().len(), 1);
}

#[test]
fn test_close_control() {
    let (mut h, page) = setup();
    h.activate();
    h.click_on(page.h1);
    let id = h.newest_panel();
    let ui = h.panel_ui(&id);

    // The close control doesn't raise the panel first.
    h.click_on(page.p);
    h.click_on(ui.close);
    assert!(h.ctl.panels().get(&id).is_none());
    assert_eq!(h.ctl.panels().len(), 1);
    assert_eq!(h.recorder.last().panels.len(), 1);
}

#[test]
fn test_highlight_toggle_is_debounced() {
    let (mut h, page) = setup();
    h.dom()
        .set_inline_style(&page.p, "background-color", "yellow")
        .unwrap();
    h.activate();
    h.click_on(page.p);
    let id = h.newest_panel();
    let ui = h.panel_ui(&id);

    h.click_on(ui.highlight);
    assert!(h.ctl.panels().get(&id).unwrap().is_highlighted);
    assert_eq!(h.dom().inline_style(&page.p, "outline"), HIGHLIGHT_OUTLINE);

    // A double click lands inside the guard window.
    h.dom().advance(50.0);
    h.click_on(ui.highlight);
    assert!(h.ctl.panels().get(&id).unwrap().is_highlighted);

    h.dom().advance(InteractionController::<FakeDom>::TOGGLE_GUARD_MS);
    h.click_on(ui.highlight);
    assert!(!h.ctl.panels().get(&id).unwrap().is_highlighted);
    assert_eq!(h.dom().inline_style(&page.p, "outline"), "");
    assert_eq!(
        h.dom().inline_style(&page.p, "background-color"),
        "yellow"
    );
    assert!(!h.recorder.last().panels[0].is_highlighted);
}

#[test]
fn test_deactivate_restores_page() {
    let (mut h, page) = setup();
    h.activate();
    h.click_on(page.h1);
    let a = h.newest_panel();
    h.click_on(page.p);
    let b = h.newest_panel();

    assert!(h.ctl.on_highlight_element(&page.h1, &a, true).unwrap());
    h.dom().advance(InteractionController::<FakeDom>::TOGGLE_GUARD_MS);
    assert!(h.ctl.on_highlight_element(&page.p, &b, true).unwrap());
    assert_eq!(h.dom().attribute_count(TRACK_ATTRIBUTE), 2);

    h.ctl.deactivate();
    assert_eq!(h.dom().attribute_count(TRACK_ATTRIBUTE), 0);
    assert!(h.dom().inline_declarations(page.h1).is_empty());
    assert!(h.dom().inline_declarations(page.p).is_empty());
    assert!(h.ctl.panels().is_empty());
    assert!(h.ctl.tracking().is_empty());
    assert_eq!(h.cancelled.get(), 1);
    assert_eq!(h.recorder.last(), OverlaySnapshot::default());

    // Again, harmlessly.
    h.ctl.deactivate();
    assert_eq!(h.cancelled.get(), 1);
    assert_eq!(h.ctl.state(), State::Inactive);
}

#[test]
fn test_restart_resets_z_index() {
    let (mut h, page) = setup();
    h.activate();
    h.click_on(page.h1);
    h.click_on(page.p);
    h.ctl.deactivate();

    h.activate();
    h.click_on(page.p);
    let id = h.newest_panel();
    assert_eq!(h.z_index(&id), Z_INDEX_BASE + 1);
}

#[test]
fn test_activate_twice_restarts() {
    let (mut h, page) = setup();
    h.activate();
    h.click_on(page.h1);
    h.activate();

    assert_eq!(h.cancelled.get(), 1);
    assert!(h.ctl.is_active());
    assert!(h.ctl.panels().is_empty());
    assert_eq!(h.ctl.analyzer().font_usage_stats().get("Arial"), Some(&1));
}

#[test]
fn test_exit_control() {
    let (mut h, page) = setup();
    h.activate();
    h.click_on(page.h1);

    let exit = h.dom().text_element(h.dom().root(), "button", "Inter");
    h.dom().set_attribute(&exit, UI_ATTRIBUTE, "").unwrap();
    h.dom().set_attribute(&exit, EXIT_ATTRIBUTE, "").unwrap();

    assert!(h.click_on(exit));
    assert!(!h.ctl.is_active());
    assert!(h.ctl.panels().is_empty());
    assert_eq!(h.cancelled.get(), 1);
}

#[test]
fn test_inactive_ignores_events() {
    let (mut h, page) = setup();
    assert!(!h.click_on(page.h1));
    h.ctl.pointer_move(Some(&page.h1), Point::new(10.0, 50.0));
    assert!(h.ctl.panels().is_empty());
    assert_eq!(h.ctl.snapshot(), OverlaySnapshot::default());
}

#[test]
fn test_tooltip_follows_pointer() {
    let (mut h, page) = setup();
    h.activate();

    let over_p = centre(h.dom().bounding_box(&page.p));
    h.ctl.pointer_move(Some(&page.p), over_p);
    let tooltip = h.recorder.last().tooltip.unwrap();
    assert_eq!(tooltip.metrics.name, "Georgia");
    assert_eq!(tooltip.position, Point::new(over_p.x + 15.0, over_p.y + 15.0));

    // Outside the viewport.
    h.ctl.pointer_move(Some(&page.p), Point::new(-5.0, over_p.y));
    assert_eq!(h.recorder.last().tooltip, None);

    h.ctl.pointer_move(Some(&page.p), over_p);
    assert!(h.recorder.last().tooltip.is_some());
    h.ctl.pointer_move(None, over_p);
    assert_eq!(h.recorder.last().tooltip, None);
}

#[test]
fn test_no_tooltip_over_overlay() {
    let (mut h, page) = setup();
    h.activate();
    h.click_on(page.h1);
    let id = h.newest_panel();
    let ui = h.panel_ui(&id);

    let at = centre(h.dom().bounding_box(&ui.body));
    h.ctl.pointer_move(Some(&ui.body), at);
    assert_eq!(h.ctl.snapshot().tooltip, None);
}

#[test]
fn test_no_tooltip_without_text() {
    let (mut h, page) = setup();
    let empty = h.dom().element(page.div, "span", "Arial");
    h.activate();

    let at = centre(h.dom().bounding_box(&empty));
    h.ctl.pointer_move(Some(&empty), at);
    assert_eq!(h.ctl.snapshot().tooltip, None);
}

#[test]
fn test_pseudo_element_under_pointer() {
    let (mut h, page) = setup();
    let icon = h.dom().element(page.div, "i", "Arial");
    h.dom().pseudo_mut(icon, PseudoElement::Before, |style| {
        style.content = "\"\\f000\"".into();
        style.font_family = "FontAwesome".into();
    });
    h.activate();

    let bbox = h.dom().bounding_box(&icon);
    h.ctl
        .pointer_move(Some(&icon), Point::new(bbox.x + 5.0, bbox.y + 2.0));
    let metrics = h.ctl.snapshot().tooltip.unwrap().metrics;
    assert!(metrics.is_pseudo_element);
    assert_eq!(metrics.pseudo_type, Some(PseudoElement::Before));
    assert_eq!(metrics.name, "Fontawesome");

    // Text elements keep their own font away from the edges.
    h.dom().pseudo_mut(page.p, PseudoElement::After, |style| {
        style.content = "\"*\"".into();
        style.font_family = "Symbol".into();
    });
    let bbox = h.dom().bounding_box(&page.p);
    h.ctl.pointer_move(Some(&page.p), centre(bbox));
    assert_eq!(h.ctl.snapshot().tooltip.unwrap().metrics.name, "Georgia");
    h.ctl
        .pointer_move(Some(&page.p), Point::new(bbox.x + 5.0, bbox.y + bbox.h - 1.0));
    assert_eq!(h.ctl.snapshot().tooltip.unwrap().metrics.name, "Symbol");
}

#[test]
fn test_added_nodes_analysed() {
    let (mut h, page) = setup();
    h.activate();

    let added = h.dom().text_element(page.div, "p", "Roboto");
    let ui = h.dom().text_element(h.dom().root(), "div", "Comic Sans MS");
    h.dom().set_attribute(&ui, UI_ATTRIBUTE, "").unwrap();
    let detached = h.dom().text_element(page.div, "p", "Courier New");
    h.dom().detach(detached);

    h.ctl.nodes_added(&[added, ui, detached]);
    let stats = h.ctl.analyzer().font_usage_stats();
    assert_eq!(stats.get("Roboto"), Some(&1));
    assert_eq!(stats.get("Comic Sans MS"), None);
    assert_eq!(stats.get("Courier New"), None);

    let hierarchy = h.ctl.analyzer().hierarchy();
    let div = &hierarchy[0].children[0];
    assert_eq!(div.children.len(), 3);
}

#[test]
fn test_added_container_and_children_counted_once() {
    let (mut h, page) = setup();
    h.activate();

    let section = h.dom().element(page.div, "section", "Inter");
    let first = h.dom().text_element(section, "p", "Inter");
    let second = h.dom().text_element(section, "p", "Inter");
    let third = h.dom().text_element(section, "p", "Inter");
    h.ctl.nodes_added(&[section, first, second, third]);

    let stats = h.ctl.analyzer().font_usage_stats();
    assert_eq!(stats.get("Inter"), Some(&3));
    assert_eq!(h.ctl.analyzer().primary_font(), Some("Inter"));

    let hierarchy = h.ctl.analyzer().hierarchy();
    let section = &hierarchy[0].children[0].children[2];
    assert_eq!(section.children.len(), 3);
    assert!(section.children.iter().all(|c| c.frequency == 1));
}

#[test]
fn test_added_nodes_ignored_when_inactive() {
    let (mut h, page) = setup();
    let added = h.dom().text_element(page.div, "p", "Roboto");
    h.ctl.nodes_added(&[added]);
    assert!(h.ctl.analyzer().is_empty());
}

#[test]
fn test_drag_panel_by_header() {
    let (mut h, page) = setup();
    h.activate();
    h.click_on(page.h1);
    h.click_on(page.p);
    let first = h.ctl.panels().iter().next().map(|(id, _)| id.clone()).unwrap();
    let ui = h.panel_ui(&first);

    let start = h.ctl.panels().get(&first).unwrap().position;
    assert!(h.ctl.pointer_down(&ui.header, Point::new(start.x + 5.0, start.y + 5.0)));
    assert_eq!(h.z_index(&first), Z_INDEX_BASE + 3);

    h.ctl.pointer_move(None, Point::new(300.0, 300.0));
    assert_eq!(
        h.ctl.panels().get(&first).unwrap().position,
        Point::new(295.0, 295.0)
    );
    assert_eq!(h.ctl.debug_snapshot().dragging, Some(first.clone()));

    h.ctl.pointer_up();
    h.ctl.pointer_move(None, Point::new(500.0, 500.0));
    assert_eq!(
        h.ctl.panels().get(&first).unwrap().position,
        Point::new(295.0, 295.0)
    );

    // Only headers start drags.
    assert!(!h.ctl.pointer_down(&ui.body, start));
    assert!(!h.ctl.pointer_down(&page.p, start));
}

#[test]
fn test_viewport_change_reclamps() {
    let (mut h, page) = setup();
    h.activate();
    h.ctl.click(&page.p, Point::new(900.0, 500.0));
    let id = h.newest_panel();

    h.dom().set_viewport(Rect::sized(600.0, 400.0));
    h.ctl.viewport_changed();
    assert_eq!(
        h.ctl.panels().get(&id).unwrap().position,
        Point::new(270.0, 110.0)
    );
    assert_eq!(h.recorder.last().panels[0].position, Point::new(270.0, 110.0));
}

#[test]
fn test_handlers() {
    let (mut h, page) = setup();
    h.activate();
    h.click_on(page.h1);
    let a = h.newest_panel();
    h.click_on(page.p);
    let b = h.newest_panel();

    h.ctl.on_bring_modal_to_front(&a).unwrap();
    assert_eq!(h.z_index(&a), Z_INDEX_BASE + 3);

    assert!(matches!(
        h.ctl.on_highlight_element(&page.h1, &b, true),
        Err(Error::WrongTarget(..))
    ));
    assert!(h.ctl.tracking().is_empty());
    assert!(h.ctl.on_highlight_element(&page.p, &b, true).unwrap());
    assert!(h.ctl.tracking().is_tracked(&page.p));

    h.ctl.on_close_modal(&b).unwrap();
    assert!(!h.ctl.tracking().is_tracked(&page.p));
    assert!(matches!(
        h.ctl.on_close_modal(&b),
        Err(Error::UnknownPanel(..))
    ));

    h.ctl.on_exit();
    assert!(!h.ctl.is_active());
    assert!(h.ctl.panels().is_empty());
}

#[test]
fn test_debug_panel_refresh() {
    let (mut h, page) = setup();
    h.activate();

    h.ctl.debug_tick();
    assert!(h.recorder.debug.borrow().is_empty());

    h.ctl.set_debug_config(DebugConfig {
        enabled: true,
        log_level: LogLevel::Debug,
        show_debug_panel: true,
    });
    h.click_on(page.h1);
    h.ctl.debug_tick();

    let debug = h.recorder.debug.borrow().last().cloned().flatten().unwrap();
    assert_eq!(debug.state, State::Active);
    assert_eq!(debug.panels.len(), 1);
    assert_eq!(debug.primary_font.as_deref(), Some("Arial"));
    assert!(debug.analyzed_elements >= 3);

    h.ctl.deactivate();
    assert_eq!(h.recorder.debug.borrow().last(), Some(&None));
}
