use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unrecognized-format: no line matched the chat export grammar ({skipped_lines} lines skipped)")]
    UnrecognizedFormat { skipped_lines: usize },

    #[error("unrecognized-format: CSV header is missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

impl ParseError {
    /// Stable machine-readable reason
    pub fn reason(&self) -> &'static str {
        "unrecognized-format"
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;
