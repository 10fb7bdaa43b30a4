use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use indexmap::IndexMap;
use serde_derive::{Deserialize, Serialize};

use crate::dom::{Dom, PseudoElement, UI_ATTRIBUTE};
use crate::error::Error;
use crate::metrics::{FontMetrics, FontMetricsExtractor};

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyNode {
    pub tag: String,
    pub font_metrics: FontMetrics,

    /// Times this element was analysed during the current pass.
    pub frequency: u32,
    pub children: Vec<HierarchyNode>,
}

/// Result of a full, side-effect free pass over a document.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub hierarchy: Vec<HierarchyNode>,
    pub font_usage_stats: IndexMap<String, u32>,
    pub primary_font: Option<String>,
}

struct Entry {
    tag: String,
    metrics: FontMetrics,
    frequency: u32,
    children: Vec<usize>,
}

type Key<N> = (N, Option<PseudoElement>);

pub struct FontHierarchyAnalyzer<N> {
    extractor: FontMetricsExtractor<N>,

    // Arena of recorded elements; `roots` and `Entry::children` index into it.
    entries: Vec<Entry>,
    roots: Vec<usize>,
    index: HashMap<Key<N>, usize>,

    usage: IndexMap<String, u32>,
    primary: Option<String>,
    skip_svg: bool,
}

impl<N: Clone + Eq + Hash> FontHierarchyAnalyzer<N> {
    /// Tags that never carry readable content. Their subtrees are skipped.
    const EXCLUDED_TAGS: &'static [&'static str] = &[
        "embed", "head", "iframe", "link", "meta", "noscript", "object", "param", "script",
        "source", "style", "template", "title", "track",
    ];

    const SVG_TAGS: &'static [&'static str] = &[
        "circle", "clippath", "defs", "ellipse", "g", "line", "mask", "path", "polygon",
        "polyline", "rect", "svg", "symbol", "use",
    ];

    pub fn new() -> Self {
        Self {
            extractor: FontMetricsExtractor::new(),
            entries: Vec::new(),
            roots: Vec::new(),
            index: HashMap::new(),
            usage: IndexMap::new(),
            primary: None,
            skip_svg: true,
        }
    }

    /// Whether SVG primitives are skipped along with the other non-content
    /// tags. On by default.
    #[must_use]
    pub fn skipping_svg(mut self, skip: bool) -> Self {
        self.skip_svg = skip;
        self
    }

    fn excluded_tag(&self, tag: &str) -> bool {
        Self::EXCLUDED_TAGS.contains(&tag) || (self.skip_svg && Self::SVG_TAGS.contains(&tag))
    }

    /// Whether the subtree at `node` is left out: non-content tags and the
    /// overlay's own elements.
    fn excluded<D: Dom<Node = N>>(&self, dom: &D, node: &N) -> bool {
        self.excluded_tag(&dom.tag_name(node)) || dom.attribute(node, UI_ATTRIBUTE).is_some()
    }

    /// Walk the subtree at `root`, adding every element with usable font
    /// metrics to the hierarchy. Call `reset` first for a fresh pass.
    pub fn analyze_hierarchy<D: Dom<Node = N>>(&mut self, dom: &D, root: &N) {
        let parent = self.nearest_recorded_ancestor(dom, root);
        self.visit(dom, root, parent);
    }

    /// Analyse a subtree inserted into an already analysed document. The
    /// subtree is attached beneath its closest analysed ancestor.
    pub fn analyze_added<D: Dom<Node = N>>(&mut self, dom: &D, node: &N) {
        let mut ancestor = dom.parent(node);
        while let Some(a) = ancestor {
            if self.excluded(dom, &a) {
                return;
            }
            ancestor = dom.parent(&a);
        }

        self.analyze_hierarchy(dom, node);
    }

    /// Analyse one batch of inserted nodes. A batch may report a container
    /// along with nodes appended inside it; those are covered by the
    /// container's walk and skipped.
    pub fn analyze_added_batch<D: Dom<Node = N>>(&mut self, dom: &D, nodes: &[N]) {
        let batch: HashSet<&N> = nodes.iter().collect();
        for node in nodes {
            let covered =
                std::iter::successors(dom.parent(node), |a| dom.parent(a)).any(|a| batch.contains(&a));
            if !covered {
                self.analyze_added(dom, node);
            }
        }
    }

    fn nearest_recorded_ancestor<D: Dom<Node = N>>(&self, dom: &D, node: &N) -> Option<usize> {
        let mut ancestor = dom.parent(node);
        while let Some(a) = ancestor {
            if let Some(&i) = self.index.get(&(a.clone(), None)) {
                return Some(i);
            }
            ancestor = dom.parent(&a);
        }
        None
    }

    fn visit<D: Dom<Node = N>>(&mut self, dom: &D, node: &N, parent: Option<usize>) {
        if self.excluded(dom, node) {
            return;
        }
        let tag = dom.tag_name(node);

        let mut attach_to = parent;
        match self.extractor.extract_cached(dom, node, None) {
            Ok(metrics) => {
                let counted = dom.has_own_text(node);
                let i = self.record(node.clone(), None, tag.clone(), metrics, parent, counted);
                attach_to = Some(i);

                for pseudo in FontMetricsExtractor::generated_pseudo_elements(dom, node) {
                    if let Ok(metrics) = self.extractor.extract_cached(dom, node, Some(pseudo)) {
                        let pseudo_tag = format!("{tag}{}", pseudo.selector());
                        self.record(node.clone(), Some(pseudo), pseudo_tag, metrics, Some(i), true);
                    }
                }
            }
            Err(e @ Error::Extraction { .. }) => log::trace!("{e}"),
            Err(e) => log::warn!("Skipping <{tag}> during font analysis: {e}"),
        }

        for child in dom.children(node) {
            self.visit(dom, &child, attach_to);
        }
    }

    /// Add an element to the hierarchy, or bump its frequency if it's already
    /// present. `counted` elements contribute to the usage statistics the
    /// first time they're recorded.
    fn record(
        &mut self,
        node: N,
        pseudo: Option<PseudoElement>,
        tag: String,
        metrics: FontMetrics,
        parent: Option<usize>,
        counted: bool,
    ) -> usize {
        if let Some(&i) = self.index.get(&(node.clone(), pseudo)) {
            self.entries[i].frequency += 1;
            return i;
        }

        let name = metrics.name.clone();
        let i = self.entries.len();
        self.entries.push(Entry {
            tag,
            metrics,
            frequency: 1,
            children: Vec::new(),
        });
        match parent {
            Some(p) => self.entries[p].children.push(i),
            None => self.roots.push(i),
        }
        self.index.insert((node, pseudo), i);

        if counted {
            self.count_usage(name);
        }

        i
    }

    fn count_usage(&mut self, name: String) {
        let count = {
            let count = self.usage.entry(name.clone()).or_insert(0);
            *count += 1;
            *count
        };

        // First seen wins ties.
        let leader = self
            .primary
            .as_ref()
            .and_then(|p| self.usage.get(p))
            .copied()
            .unwrap_or(0);
        if count > leader {
            self.primary = Some(name);
        }
    }

    /// The analysed forest, one tree per top level analysed element.
    pub fn hierarchy(&self) -> Vec<HierarchyNode> {
        self.roots.iter().map(|&i| self.build(i)).collect()
    }

    fn build(&self, i: usize) -> HierarchyNode {
        let entry = &self.entries[i];
        HierarchyNode {
            tag: entry.tag.clone(),
            font_metrics: entry.metrics.clone(),
            frequency: entry.frequency,
            children: entry.children.iter().map(|&c| self.build(c)).collect(),
        }
    }

    /// Usage counts by standardised font name, most used first. Ties keep the
    /// order in which the fonts were first seen.
    pub fn font_usage_stats(&self) -> IndexMap<String, u32> {
        let mut stats: Vec<(String, u32)> =
            self.usage.iter().map(|(k, v)| (k.clone(), *v)).collect();
        stats.sort_by(|a, b| b.1.cmp(&a.1));
        stats.into_iter().collect()
    }

    pub fn primary_font(&self) -> Option<&str> {
        self.primary.as_deref()
    }

    /// Number of elements recorded in the current pass.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cached_metrics(&self) -> usize {
        self.extractor.cached()
    }

    pub fn report(&self) -> AnalysisReport {
        AnalysisReport {
            hierarchy: self.hierarchy(),
            font_usage_stats: self.font_usage_stats(),
            primary_font: self.primary.clone(),
        }
    }

    pub fn reset(&mut self) {
        self.extractor.reset();
        self.entries.clear();
        self.roots.clear();
        self.index.clear();
        self.usage.clear();
        self.primary = None;
    }
}

impl<N: Clone + Eq + Hash> Default for FontHierarchyAnalyzer<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Analyse a whole document in one pass without touching the page.
pub fn analyze_headless<D: Dom>(dom: &D, root: &D::Node) -> AnalysisReport {
    let mut analyzer = FontHierarchyAnalyzer::new();
    analyzer.analyze_hierarchy(dom, root);
    analyzer.report()
}
