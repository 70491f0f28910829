//! Error types for the meeting pack library

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::pdf::stamp::StampMode;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline step that was running when an error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Numbering the agenda document itself
    Agenda,
    /// Stamping and numbering an enclosure's cover document
    Cover,
    /// Numbering an extra attachment of an enclosure
    Attachment,
    /// Writing the finished pack
    Save,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Agenda => "agenda",
            Step::Cover => "cover",
            Step::Attachment => "attachment",
            Step::Save => "save",
        };
        f.write_str(name)
    }
}

/// Main error type for the meeting pack library
#[derive(Error, Debug)]
pub enum Error {
    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Meeting configuration could not be parsed as YAML
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Unknown stamp correspondence mode
    #[error("Unknown stamping mode '{0}'")]
    InvalidStampMode(String),

    /// Item number text that does not parse
    #[error("Invalid item number: {0}")]
    InvalidItemNumber(String),

    /// Meeting configuration is structurally wrong
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required metadata key is missing from the meeting configuration
    #[error("Missing metadata key: {0}")]
    MissingMetadata(String),

    /// Overlay pages cannot be paired with the target pages
    #[error("Cannot stamp in '{mode}' mode: overlay has {overlay} pages, target has {target} pages")]
    PageCountMismatch {
        mode: StampMode,
        overlay: usize,
        target: usize,
    },

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Invalid PDF (no pages)
    #[error("PDF has no pages: {0}")]
    EmptyPdf(String),

    /// Page has no usable MediaBox, so no overlay size can be derived
    #[error("Page has no usable MediaBox")]
    MissingMediaBox,

    /// Failure of one pipeline step on one document
    #[error("{step} step failed for {}: {source}", .path.display())]
    Step {
        step: Step,
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Attach the failing pipeline step and document to an error
    pub fn at(self, step: Step, path: impl Into<PathBuf>) -> Self {
        Error::Step {
            step,
            path: path.into(),
            source: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_error_names_document() {
        let err = Error::EmptyPdf("report.pdf".to_string()).at(Step::Attachment, "report.pdf");
        let message = err.to_string();
        assert!(message.starts_with("attachment step failed for report.pdf"));
        assert!(message.contains("no pages"));
    }

    #[test]
    fn test_mismatch_message() {
        let err = Error::PageCountMismatch {
            mode: StampMode::Match,
            overlay: 1,
            target: 3,
        };
        assert_eq!(
            err.to_string(),
            "Cannot stamp in 'match' mode: overlay has 1 pages, target has 3 pages"
        );
    }
}
