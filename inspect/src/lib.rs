//! Font inspection core: extracting font metrics from a page, analysing how
//! fonts are used across it and managing the state of the inspection overlay.
//!
//! Nothing here touches a browser directly. All access to the page goes
//! through the [`Dom`] trait, implemented by the client for the real DOM.

pub mod config;
pub mod controller;
pub mod dom;
pub mod error;
pub mod hierarchy;
pub mod metrics;
pub mod panels;
pub mod tracking;

mod point;
mod rect;

#[cfg(test)]
mod fake;

pub use config::DebugConfig;
pub use controller::InteractionController;
pub use dom::Dom;
pub use error::{Error, Result};
pub use hierarchy::{analyze_headless, AnalysisReport};
pub use point::Point;
pub use rect::Rect;
