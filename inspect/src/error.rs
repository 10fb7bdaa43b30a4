use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The element's resolved style can't produce usable font metrics. Never
    /// shown to the user; the element is skipped.
    #[error("no font metrics for <{tag}>: {reason}")]
    Extraction { tag: String, reason: &'static str },

    /// The tracking attribute and the tracking map disagree about an element.
    #[error("tracking state diverged for {track_id}: {detail}")]
    InvariantViolation { track_id: String, detail: &'static str },

    #[error("no open panel with id {0}")]
    UnknownPanel(String),

    #[error("panel {0} inspects a different element")]
    WrongTarget(String),

    /// The host page refused an operation (style read, attribute write).
    #[error("DOM operation failed: {0}")]
    Dom(String),
}

impl Error {
    pub fn extraction(tag: &str, reason: &'static str) -> Self {
        Self::Extraction {
            tag: tag.to_string(),
            reason,
        }
    }
}
