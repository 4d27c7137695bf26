use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures that end a run. Every variant maps to a non-zero exit code.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("navigation to {url} failed or did not settle within {waited:?}")]
    Navigation {
        url: String,
        waited: Duration,
        #[source]
        source: Option<chromiumoxide::error::CdpError>,
    },

    #[error("frame `{selector}` not found within {waited:?}")]
    FrameNotFound { selector: String, waited: Duration },

    #[error("could not read frame text: {0}")]
    Extraction(String),

    #[error("no `Select Row` blocks found in report text (layout changed or report failed to render)")]
    NoRows,

    #[error("stored snapshot {path:?} is not valid JSON: {source}")]
    CorruptSnapshot {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("browser protocol error: {0}")]
    Browser(#[from] chromiumoxide::error::CdpError),
}
