use log::LevelFilter;
use serde_derive::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Info,
    Debug,
    Verbose,
}

impl LogLevel {
    pub fn filter(&self) -> LevelFilter {
        match self {
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Verbose => LevelFilter::Trace,
        }
    }
}

/// Diagnostics settings. Purely observational: nothing here changes how the
/// overlay behaves, only what it reports.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DebugConfig {
    pub enabled: bool,
    pub log_level: LogLevel,
    pub show_debug_panel: bool,
}

impl DebugConfig {
    /// How often the debug panel is refreshed while the overlay is active.
    pub const REFRESH_INTERVAL_MS: i32 = 1000;

    /// Logging threshold. Warnings always get through.
    pub fn level_filter(&self) -> LevelFilter {
        if self.enabled {
            self.log_level.filter()
        } else {
            LevelFilter::Warn
        }
    }

    pub fn wants_panel(&self) -> bool {
        self.enabled && self.show_debug_panel
    }
}
