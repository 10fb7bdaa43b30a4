use std::collections::HashMap;
use std::hash::Hash;

use serde_derive::{Deserialize, Serialize};

use crate::dom::{ComputedStyle, Dom, PseudoElement};
use crate::error::{Error, Result};

/// Name given to elements whose family list standardises to nothing.
pub const SYSTEM_DEFAULT: &str = "System Default";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontCategory {
    Serif,
    SansSerif,
    Monospace,
    Cursive,
    Fantasy,
    System,
    Custom,
}

impl FontCategory {
    // Fonts shipped with the common desktop and mobile platforms.
    const SYSTEM_FONTS: &'static [&'static str] = &[
        "arial",
        "blinkmacsystemfont",
        "calibri",
        "cantarell",
        "consolas",
        "courier",
        "courier new",
        "georgia",
        "helvetica",
        "helvetica neue",
        "lucida console",
        "lucida grande",
        "menlo",
        "monaco",
        "noto sans",
        "roboto",
        "san francisco",
        "segoe ui",
        "sf pro display",
        "sf pro text",
        "system default",
        "tahoma",
        "times",
        "times new roman",
        "trebuchet ms",
        "ubuntu",
        "verdana",
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Serif => "Serif",
            Self::SansSerif => "Sans-serif",
            Self::Monospace => "Monospace",
            Self::Cursive => "Cursive",
            Self::Fantasy => "Fantasy",
            Self::System => "System",
            Self::Custom => "Custom",
        }
    }

    /// Classify a standardised font name.
    pub fn of(name: &str) -> Self {
        let lower = name.to_lowercase();
        match lower.as_str() {
            "serif" => Self::Serif,
            "sans-serif" => Self::SansSerif,
            "monospace" => Self::Monospace,
            "cursive" => Self::Cursive,
            "fantasy" => Self::Fantasy,
            "system-ui" | "-apple-system" => Self::System,
            _ if lower.starts_with("ui-") => Self::System,
            _ if Self::SYSTEM_FONTS.contains(&lower.as_str()) => Self::System,
            _ => Self::Custom,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FontMetrics {
    pub name: String,
    pub weight: u32,
    pub style: String,
    pub size: String,
    pub color: String,
    pub line_height: String,
    pub letter_spacing: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub category: Option<FontCategory>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub alternative_fonts: Vec<String>,
    #[serde(default)]
    pub is_pseudo_element: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pseudo_type: Option<PseudoElement>,
}

impl FontMetrics {
    /// Build metrics from a resolved style. Fails if the style has no font
    /// family at all.
    pub fn from_style(style: &ComputedStyle, pseudo: Option<PseudoElement>) -> Option<Self> {
        let mut stack = font_stack(&style.font_family).into_iter();
        let name = stack.next()?;

        Some(FontMetrics {
            category: Some(FontCategory::of(&name)),
            name,
            weight: parse_weight(&style.font_weight),
            style: or_default(&style.font_style, "normal"),
            size: style.font_size.trim().to_string(),
            color: style.color.trim().to_string(),
            line_height: or_default(&style.line_height, "normal"),
            letter_spacing: or_default(&style.letter_spacing, "normal"),
            alternative_fonts: stack.collect(),
            is_pseudo_element: pseudo.is_some(),
            pseudo_type: pseudo,
        })
    }
}

fn or_default(value: &str, default: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

/// Normalise a single `font-family` entry into a human readable name.
pub fn standardize_font_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '"' | '\'') && (c.is_whitespace() || !c.is_control()))
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<&str>>().join(" ");

    match collapsed.to_lowercase().as_str() {
        "" => SYSTEM_DEFAULT.to_string(),
        "monospace" => "Monospace".to_string(),
        "sans-serif" => "Sans-Serif".to_string(),
        "serif" => "Serif".to_string(),
        _ => collapsed
            .split(' ')
            .map(title_case)
            .collect::<Vec<String>>()
            .join(" "),
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Split a `font-family` value into standardised names, respecting quoted
/// family names containing commas. Returns nothing if the value holds no
/// family at all.
pub fn font_stack(raw: &str) -> Vec<String> {
    let mut entries = Vec::new();
    let mut current = String::new();
    let mut quote = None;

    for c in raw.chars() {
        match (c, quote) {
            ('"' | '\'', None) => quote = Some(c),
            (c, Some(q)) if c == q => quote = None,
            (',', None) => entries.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    entries.push(current);

    if entries.iter().all(|e| e.trim().is_empty()) {
        return Vec::new();
    }

    entries
        .iter()
        .filter(|e| !e.trim().is_empty())
        .map(|e| standardize_font_name(e))
        .collect()
}

pub fn parse_weight(raw: &str) -> u32 {
    const NORMAL: u32 = 400;

    match raw.trim() {
        "normal" | "" => NORMAL,
        "bold" | "bolder" => 700,
        "lighter" => 300,
        value => value
            .parse::<f32>()
            .map(|w| w.round().clamp(1.0, 1000.0) as u32)
            .unwrap_or(NORMAL),
    }
}

fn has_generated_content(style: &ComputedStyle) -> bool {
    !matches!(style.content.trim(), "" | "none" | "normal")
}

fn is_hidden(style: &ComputedStyle) -> bool {
    style.display.trim() == "none"
        || matches!(style.visibility.trim(), "hidden" | "collapse")
        || style
            .opacity
            .trim()
            .parse::<f32>()
            .is_ok_and(|opacity| opacity <= 0.0)
}

/// Reads standardised font metrics from elements. Holds a cache valid for a
/// single analysis pass.
pub struct FontMetricsExtractor<N> {
    cache: HashMap<(N, Option<PseudoElement>), FontMetrics>,
}

impl<N: Clone + Eq + Hash> FontMetricsExtractor<N> {
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
        }
    }

    /// Uncached extraction, for interactive use where the page may have
    /// restyled the element since the last pass. `None` if the element can't
    /// be analysed.
    pub fn extract<D: Dom<Node = N>>(
        &self,
        dom: &D,
        node: &N,
        pseudo: Option<PseudoElement>,
    ) -> Option<FontMetrics> {
        match Self::try_extract(dom, node, pseudo) {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                log::debug!("{e}");
                None
            }
        }
    }

    /// Extraction through the per-pass cache. Failures are not cached.
    pub fn extract_cached<D: Dom<Node = N>>(
        &mut self,
        dom: &D,
        node: &N,
        pseudo: Option<PseudoElement>,
    ) -> Result<FontMetrics> {
        let key = (node.clone(), pseudo);
        if let Some(metrics) = self.cache.get(&key) {
            return Ok(metrics.clone());
        }

        let metrics = Self::try_extract(dom, node, pseudo)?;
        self.cache.insert(key, metrics.clone());
        Ok(metrics)
    }

    pub fn try_extract<D: Dom<Node = N>>(
        dom: &D,
        node: &N,
        pseudo: Option<PseudoElement>,
    ) -> Result<FontMetrics> {
        let tag = || dom.tag_name(node);

        let style = dom.computed_style(node, pseudo)?;
        if is_hidden(&style) {
            return Err(Error::extraction(&tag(), "not visible"));
        }

        // Pseudo-elements have no box of their own; their style alone decides.
        match pseudo {
            Some(_) => {
                if !has_generated_content(&style) {
                    return Err(Error::extraction(&tag(), "no generated content"));
                }
            }
            None => {
                if dom.bounding_box(node).is_empty() {
                    return Err(Error::extraction(&tag(), "empty layout box"));
                }
                if !dom.has_text_content(node) && !Self::has_pseudo_content(dom, node) {
                    return Err(Error::extraction(&tag(), "no text content"));
                }
            }
        }

        FontMetrics::from_style(&style, pseudo)
            .ok_or_else(|| Error::extraction(&tag(), "no font family"))
    }

    /// Pseudo-elements of this element that carry generated content.
    pub fn generated_pseudo_elements<D: Dom<Node = N>>(dom: &D, node: &N) -> Vec<PseudoElement> {
        PseudoElement::ALL
            .into_iter()
            .filter(|&pseudo| {
                dom.computed_style(node, Some(pseudo))
                    .is_ok_and(|style| has_generated_content(&style) && !is_hidden(&style))
            })
            .collect()
    }

    fn has_pseudo_content<D: Dom<Node = N>>(dom: &D, node: &N) -> bool {
        !Self::generated_pseudo_elements(dom, node).is_empty()
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    pub fn reset(&mut self) {
        self.cache.clear();
    }
}

impl<N: Clone + Eq + Hash> Default for FontMetricsExtractor<N> {
    fn default() -> Self {
        Self::new()
    }
}
