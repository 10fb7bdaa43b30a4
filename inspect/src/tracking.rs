use std::collections::HashMap;
use std::hash::Hash;

use uuid::Uuid;

use crate::dom::Dom;
use crate::error::{Error, Result};

/// Attribute mirroring an element's track identifier onto the page.
pub const TRACK_ATTRIBUTE: &str = "data-fontscope-track";

const STYLE_ATTRIBUTE: &str = "style";

pub const HIGHLIGHT_OUTLINE: &str = "2px solid #ff6b6b";
pub const HIGHLIGHT_BACKGROUND: &str = "rgba(255, 107, 107, 0.1)";

/// The two properties a highlight overwrites.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OriginalStyles {
    pub outline: String,
    pub background_color: String,
}

#[derive(Clone, Debug)]
pub struct TrackedElement<N> {
    pub element: N,

    /// Inline declarations before highlighting; empty means no declaration.
    pub original_styles: OriginalStyles,

    /// The `style` attribute before highlighting. Restoring writes this back
    /// verbatim, so priorities, longhands and ordering survive.
    pub style_attribute: Option<String>,

    /// Resolved values before highlighting, for diagnostics.
    pub computed_styles: OriginalStyles,
}

/// Elements currently highlighted by the overlay.
///
/// The map is authoritative; the attribute is a mirror that lets the page
/// (and anyone debugging it) see which elements are tracked. Whenever the two
/// are found to disagree the attribute is repaired to match the map.
pub struct ElementTrackingStore<N> {
    tracked: HashMap<String, TrackedElement<N>>,
    ids: HashMap<N, String>,
}

impl<N: Clone + Eq + Hash> ElementTrackingStore<N> {
    pub fn new() -> Self {
        Self {
            tracked: HashMap::new(),
            ids: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    pub fn is_tracked(&self, element: &N) -> bool {
        self.ids.contains_key(element)
    }

    pub fn get(&self, track_id: &str) -> Option<&TrackedElement<N>> {
        self.tracked.get(track_id)
    }

    pub fn track_ids(&self) -> impl Iterator<Item = &String> {
        self.tracked.keys()
    }

    pub fn set_highlight<D: Dom<Node = N>>(
        &mut self,
        dom: &D,
        element: &N,
        highlighting: bool,
    ) -> Result<()> {
        if highlighting {
            self.highlight(dom, element)
        } else {
            self.unhighlight(dom, element)
        }
    }

    /// The element's track identifier, reconciling the attribute with the map.
    pub fn track_id<D: Dom<Node = N>>(&self, dom: &D, element: &N) -> Result<Option<String>> {
        let attribute = dom.attribute(element, TRACK_ATTRIBUTE);
        let known = self.ids.get(element);

        match (attribute, known) {
            (Some(attribute), Some(known)) if &attribute == known => Ok(Some(attribute)),
            (_, Some(known)) => {
                log::warn!("{}", Error::InvariantViolation {
                    track_id: known.clone(),
                    detail: "attribute missing or overwritten, restoring it",
                });
                dom.set_attribute(element, TRACK_ATTRIBUTE, known)?;
                Ok(Some(known.clone()))
            }
            (Some(stray), None) => {
                // Typically an element cloned from a tracked one.
                log::warn!("{}", Error::InvariantViolation {
                    track_id: stray,
                    detail: "attribute on untracked element, removing it",
                });
                dom.remove_attribute(element, TRACK_ATTRIBUTE)?;
                Ok(None)
            }
            (None, None) => Ok(None),
        }
    }

    fn highlight<D: Dom<Node = N>>(&mut self, dom: &D, element: &N) -> Result<()> {
        if self.track_id(dom, element)?.is_some() {
            return Ok(());
        }

        let original_styles = OriginalStyles {
            outline: dom.inline_style(element, "outline"),
            background_color: dom.inline_style(element, "background-color"),
        };
        let style_attribute = dom.attribute(element, STYLE_ATTRIBUTE);
        let computed_styles = dom
            .computed_style(element, None)
            .map(|style| OriginalStyles {
                outline: style.outline,
                background_color: style.background_color,
            })
            .unwrap_or_default();

        let track_id = Uuid::now_v7().to_string();
        dom.set_attribute(element, TRACK_ATTRIBUTE, &track_id)?;

        let applied = dom
            .set_inline_style(element, "outline", HIGHLIGHT_OUTLINE)
            .and_then(|()| dom.set_inline_style(element, "background-color", HIGHLIGHT_BACKGROUND));
        if let Err(e) = applied {
            // Leave the element exactly as we found it.
            Self::restore(dom, element, style_attribute.as_deref()).ok();
            dom.remove_attribute(element, TRACK_ATTRIBUTE).ok();
            return Err(e);
        }

        self.ids.insert(element.clone(), track_id.clone());
        self.tracked.insert(
            track_id,
            TrackedElement {
                element: element.clone(),
                original_styles,
                style_attribute,
                computed_styles,
            },
        );

        Ok(())
    }

    fn unhighlight<D: Dom<Node = N>>(&mut self, dom: &D, element: &N) -> Result<()> {
        let Some(track_id) = self.track_id(dom, element)? else {
            return Ok(());
        };

        if let Some(tracked) = self.tracked.get(&track_id) {
            Self::restore(dom, element, tracked.style_attribute.as_deref())?;
        }
        dom.remove_attribute(element, TRACK_ATTRIBUTE)?;
        self.tracked.remove(&track_id);
        self.ids.remove(element);

        Ok(())
    }

    fn restore<D: Dom<Node = N>>(dom: &D, element: &N, style: Option<&str>) -> Result<()> {
        match style {
            Some(style) => dom.set_attribute(element, STYLE_ATTRIBUTE, style),
            None => dom.remove_attribute(element, STYLE_ATTRIBUTE),
        }
    }

    /// Restore every tracked element still in the document and forget all of
    /// them. Elements the page has removed are left alone.
    pub fn cleanup_all<D: Dom<Node = N>>(&mut self, dom: &D) {
        for (track_id, tracked) in self.tracked.drain() {
            if !dom.is_connected(&tracked.element) {
                log::debug!("Tracked element {track_id} left the document; not restoring.");
                continue;
            }

            let style = tracked.style_attribute.as_deref();
            if let Err(e) = Self::restore(dom, &tracked.element, style) {
                log::warn!("Failed to restore styles for {track_id}: {e}");
            }

            if dom.attribute(&tracked.element, TRACK_ATTRIBUTE).as_deref() == Some(&track_id) {
                if let Err(e) = dom.remove_attribute(&tracked.element, TRACK_ATTRIBUTE) {
                    log::warn!("Failed to remove track attribute for {track_id}: {e}");
                }
            }
        }
        self.ids.clear();
    }
}

impl<N: Clone + Eq + Hash> Default for ElementTrackingStore<N> {
    fn default() -> Self {
        Self::new()
    }
}
