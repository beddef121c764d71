use thiserror::Error;

/// Recoverable failures surfaced by the analysis pipeline.
///
/// Every variant carries a message meant for display; the caller shows it and
/// keeps accepting requests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// The input bytes are not a well-formed spreadsheet.
    #[error("Failed to read spreadsheet: {0}")]
    Parse(String),

    /// Selection or type mismatch (unknown column, non-numeric target, ...).
    #[error("{0}")]
    Validation(String),

    /// The chart kind cannot be drawn with the axes that were supplied.
    #[error("{0}")]
    UnsupportedChart(String),

    /// A single chart could not be turned into an image.
    #[error("Error exporting chart to image: {0}")]
    Render(String),
}

impl AnalysisError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AnalysisError::Validation(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        AnalysisError::UnsupportedChart(msg.into())
    }

    /// Flatten an `anyhow` context chain into a parse error.
    pub fn parse(err: anyhow::Error) -> Self {
        AnalysisError::Parse(format!("{err:#}"))
    }
}

pub type Result<T, E = AnalysisError> = std::result::Result<T, E>;
