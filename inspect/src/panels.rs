use std::fmt;
use std::hash::Hash;

use indexmap::IndexMap;
use serde_derive::{Deserialize, Serialize};

use crate::dom::Dom;
use crate::error::{Error, Result};
use crate::metrics::FontMetrics;
use crate::tracking::ElementTrackingStore;
use crate::{Point, Rect};

/// Panels stack above this z-index; the first panel opened gets one more.
pub const Z_INDEX_BASE: i32 = 10_000;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct PanelId(String);

impl PanelId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How floating boxes (panels, the tooltip) are positioned relative to the
/// point that spawned them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Gap between the anchor point and the box.
    pub offset: f32,

    /// Minimum distance kept from the viewport edges.
    pub padding: f32,

    /// Expected dimensions of the box.
    pub size: Point,
}

impl Placement {
    pub const PANEL: Placement = Placement {
        offset: 15.0,
        padding: 10.0,
        size: Point::new(320.0, 280.0),
    };

    pub const TOOLTIP: Placement = Placement {
        offset: 15.0,
        padding: 10.0,
        size: Point::new(240.0, 120.0),
    };

    /// Place the box below and to the right of `anchor`, flipping to the side
    /// with more room on any axis where that would overflow, then clamping
    /// into the viewport.
    pub fn place(&self, anchor: Point, viewport: Rect) -> Point {
        Point::new(
            self.place_axis(anchor.x, self.size.x, viewport.x, viewport.w),
            self.place_axis(anchor.y, self.size.y, viewport.y, viewport.h),
        )
    }

    fn place_axis(&self, anchor: f32, size: f32, start: f32, extent: f32) -> f32 {
        let end = start + extent;
        let mut position = anchor + self.offset;
        if position + size > end - self.padding && anchor - start > end - anchor {
            position = anchor - self.offset - size;
        }
        self.clamp_axis(position, size, start, extent)
    }

    fn clamp_axis(&self, position: f32, size: f32, start: f32, extent: f32) -> f32 {
        let min = start + self.padding;
        let max = start + extent - self.padding - size;

        // Larger than the viewport: pin to the leading edge.
        if max < min {
            min
        } else {
            position.clamp(min, max)
        }
    }

    /// Keep a box at `position` inside the viewport without flipping it.
    pub fn clamp(&self, position: Point, viewport: Rect) -> Point {
        Point::new(
            self.clamp_axis(position.x, self.size.x, viewport.x, viewport.w),
            self.clamp_axis(position.y, self.size.y, viewport.y, viewport.h),
        )
    }
}

#[derive(Clone, Debug)]
pub struct PanelInfo<N> {
    pub target_element: N,
    pub metrics: FontMetrics,
    pub position: Point,
    pub is_highlighted: bool,
    pub z_index: i32,
}

/// Open comparison panels and their stacking order.
pub struct PanelRegistry<N> {
    panels: IndexMap<PanelId, PanelInfo<N>>,

    // Highest z-index handed out this session.
    z_counter: i32,
    placement: Placement,
}

impl<N: Clone + Eq + Hash> PanelRegistry<N> {
    pub fn new() -> Self {
        Self::with_placement(Placement::PANEL)
    }

    pub fn with_placement(placement: Placement) -> Self {
        Self {
            panels: IndexMap::new(),
            z_counter: Z_INDEX_BASE,
            placement,
        }
    }

    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    pub fn get(&self, id: &PanelId) -> Option<&PanelInfo<N>> {
        self.panels.get(id)
    }

    /// Open panels, bottom of the stack first.
    pub fn iter(&self) -> impl Iterator<Item = (&PanelId, &PanelInfo<N>)> {
        let mut panels: Vec<(&PanelId, &PanelInfo<N>)> = self.panels.iter().collect();
        panels.sort_by_key(|(_, panel)| panel.z_index);
        panels.into_iter()
    }

    pub fn max_z_index(&self) -> Option<i32> {
        self.panels.values().map(|p| p.z_index).max()
    }

    /// The next z-index to assign. Never below anything handed out before nor
    /// anything currently open.
    fn next_z_index(&mut self) -> i32 {
        let top = self.max_z_index().unwrap_or(Z_INDEX_BASE);
        self.z_counter = self.z_counter.max(top) + 1;
        self.z_counter
    }

    pub fn open<D: Dom<Node = N>>(
        &mut self,
        dom: &D,
        target: &N,
        metrics: FontMetrics,
        click: Point,
    ) -> PanelId {
        let base = format!("panel-{}-{}", dom.node_key(target), dom.now_ms() as u64);
        let mut id = PanelId::new(base.clone());
        let mut n = 1;
        while self.panels.contains_key(&id) {
            id = PanelId::new(format!("{base}-{n}"));
            n += 1;
        }

        let position = self.placement.place(click, dom.viewport());
        let z_index = self.next_z_index();
        self.panels.insert(
            id.clone(),
            PanelInfo {
                target_element: target.clone(),
                metrics,
                position,
                is_highlighted: false,
                z_index,
            },
        );

        log::debug!("Opened {id} at z-index {z_index}.");
        id
    }

    // Whether some other open panel keeps this element highlighted.
    fn highlighted_elsewhere(&self, id: &PanelId, target: &N) -> bool {
        self.panels
            .iter()
            .any(|(other, p)| other != id && p.is_highlighted && &p.target_element == target)
    }

    /// Close a panel, restoring its element first if it's highlighted.
    pub fn close<D: Dom<Node = N>>(
        &mut self,
        id: &PanelId,
        tracking: &mut ElementTrackingStore<N>,
        dom: &D,
    ) -> Result<()> {
        let panel = self
            .panels
            .get(id)
            .ok_or_else(|| Error::UnknownPanel(id.to_string()))?;

        if panel.is_highlighted && !self.highlighted_elsewhere(id, &panel.target_element) {
            tracking.set_highlight(dom, &panel.target_element, false)?;
        }

        self.panels.shift_remove(id);
        log::debug!("Closed {id}.");
        Ok(())
    }

    /// Close everything. Panels whose element can't be restored are dropped
    /// anyway; the tracking store cleans those up.
    pub fn close_all<D: Dom<Node = N>>(&mut self, tracking: &mut ElementTrackingStore<N>, dom: &D) {
        let ids: Vec<PanelId> = self.iter().map(|(id, _)| id.clone()).collect();
        for id in ids.into_iter().rev() {
            if let Err(e) = self.close(&id, tracking, dom) {
                log::warn!("Failed to close {id} cleanly: {e}");
                self.panels.shift_remove(&id);
            }
        }
    }

    /// Raise a panel above all others. Returns whether anything changed.
    pub fn bring_to_front(&mut self, id: &PanelId) -> Result<bool> {
        let current = self
            .panels
            .get(id)
            .ok_or_else(|| Error::UnknownPanel(id.to_string()))?
            .z_index;

        if Some(current) == self.max_z_index() {
            return Ok(false);
        }

        let z_index = self.next_z_index();
        if let Some(panel) = self.panels.get_mut(id) {
            panel.z_index = z_index;
        }
        Ok(true)
    }

    /// Flip a panel's highlight. Returns the new state.
    pub fn toggle_highlight<D: Dom<Node = N>>(
        &mut self,
        id: &PanelId,
        tracking: &mut ElementTrackingStore<N>,
        dom: &D,
    ) -> Result<bool> {
        let panel = self
            .panels
            .get(id)
            .ok_or_else(|| Error::UnknownPanel(id.to_string()))?;
        let highlighting = !panel.is_highlighted;

        if highlighting || !self.highlighted_elsewhere(id, &panel.target_element) {
            tracking.set_highlight(dom, &panel.target_element, highlighting)?;
        }

        if let Some(panel) = self.panels.get_mut(id) {
            panel.is_highlighted = highlighting;
        }
        Ok(highlighting)
    }

    /// Set a highlight to a specific state.
    pub fn set_highlight<D: Dom<Node = N>>(
        &mut self,
        id: &PanelId,
        highlighting: bool,
        tracking: &mut ElementTrackingStore<N>,
        dom: &D,
    ) -> Result<bool> {
        match self.panels.get(id) {
            Some(panel) if panel.is_highlighted == highlighting => Ok(highlighting),
            Some(_) => self.toggle_highlight(id, tracking, dom),
            None => Err(Error::UnknownPanel(id.to_string())),
        }
    }

    /// Drag a panel so its top left sits at `position`, kept in the viewport.
    pub fn move_to(&mut self, id: &PanelId, position: Point, viewport: Rect) -> Result<()> {
        let placement = self.placement;
        let panel = self
            .panels
            .get_mut(id)
            .ok_or_else(|| Error::UnknownPanel(id.to_string()))?;
        panel.position = placement.clamp(position, viewport);
        Ok(())
    }

    /// Pull every panel back inside a resized or scrolled viewport.
    pub fn reclamp(&mut self, viewport: Rect) {
        let placement = self.placement;
        for panel in self.panels.values_mut() {
            panel.position = placement.clamp(panel.position, viewport);
        }
    }

    /// Forget all panels and restart z-index assignment. Callers must close
    /// panels first for highlights to be restored.
    pub fn reset(&mut self) {
        self.panels.clear();
        self.z_counter = Z_INDEX_BASE;
    }
}

impl<N: Clone + Eq + Hash> Default for PanelRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}
