use indexmap::IndexMap;
use serde_derive::Serialize;

use crate::metrics::FontMetrics;
use crate::panels::{PanelId, PanelInfo};
use crate::Point;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    #[default]
    Inactive,
    Active,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TooltipView {
    pub metrics: FontMetrics,
    pub position: Point,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelView {
    pub id: PanelId,
    pub metrics: FontMetrics,
    pub position: Point,
    pub is_highlighted: bool,
    pub z_index: i32,
}

impl PanelView {
    pub fn new<N>(id: &PanelId, panel: &PanelInfo<N>) -> Self {
        Self {
            id: id.clone(),
            metrics: panel.metrics.clone(),
            position: panel.position,
            is_highlighted: panel.is_highlighted,
            z_index: panel.z_index,
        }
    }
}

/// Everything a presenter needs to draw the overlay. Panels are ordered
/// bottom of the stack first.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlaySnapshot {
    pub active: bool,
    pub tooltip: Option<TooltipView>,
    pub panels: Vec<PanelView>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugSnapshot {
    pub state: State,
    pub panels: Vec<PanelView>,
    pub tracked_elements: Vec<String>,
    pub analyzed_elements: usize,
    pub cached_metrics: usize,
    pub primary_font: Option<String>,
    pub font_usage_stats: IndexMap<String, u32>,
    pub dragging: Option<PanelId>,
    pub timestamp: f64,
}
