//! Error types for pathways-import
//!
//! Two layers:
//! - [`ParseError`]: one tagged error kind shared by every dialect. Raised while
//!   building a single bundle and isolated to that bundle by the driver.
//! - [`ImportError`]: run-level error. Only [`ImportError::Bundle`] is
//!   recoverable; everything else aborts the run.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for import operations
pub type Result<T> = std::result::Result<T, ImportError>;

/// Discriminator for [`ParseError`] variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    MissingRequiredField,
    InvalidFieldShape,
    InvalidPhoneNumber,
}

/// Structural problem in one source bundle
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// A field with no tolerable default is absent or empty
    #[error("Missing required field '{field}' ({context})")]
    MissingRequiredField { field: String, context: String },

    /// A value is present but structurally wrong
    #[error("Invalid value '{value}' for field '{field}' ({context})")]
    InvalidFieldShape {
        field: String,
        value: String,
        context: String,
    },

    /// Phone number fails international-format validation (tree dialect)
    #[error("Invalid phone number '{value}' ({context})")]
    InvalidPhoneNumber { value: String, context: String },
}

impl ParseError {
    pub fn missing(field: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MissingRequiredField {
            field: field.into(),
            context: context.into(),
        }
    }

    pub fn invalid_shape(
        field: impl Into<String>,
        value: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self::InvalidFieldShape {
            field: field.into(),
            value: value.into(),
            context: context.into(),
        }
    }

    pub fn invalid_phone(value: impl Into<String>, context: impl Into<String>) -> Self {
        Self::InvalidPhoneNumber {
            value: value.into(),
            context: context.into(),
        }
    }

    pub fn kind(&self) -> ParseErrorKind {
        match self {
            Self::MissingRequiredField { .. } => ParseErrorKind::MissingRequiredField,
            Self::InvalidFieldShape { .. } => ParseErrorKind::InvalidFieldShape,
            Self::InvalidPhoneNumber { .. } => ParseErrorKind::InvalidPhoneNumber,
        }
    }

    /// Source line or node the error refers to
    pub fn context(&self) -> &str {
        match self {
            Self::MissingRequiredField { context, .. }
            | Self::InvalidFieldShape { context, .. }
            | Self::InvalidPhoneNumber { context, .. } => context,
        }
    }
}

/// Run-level import error
#[derive(Error, Debug)]
pub enum ImportError {
    /// One bundle could not be built (isolated by the driver)
    #[error("Bundle error: {0}")]
    Bundle(#[from] ParseError),

    /// Header row does not match the dialect (wrong file)
    #[error("Header mismatch in {file}: expected [{}], found [{}]", .expected.join(","), .found.join(","))]
    HeaderMismatch {
        file: String,
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// Required input file does not exist
    #[error("Missing input file: {}", .0.display())]
    MissingFile(PathBuf),

    /// Delimited-text read/write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// XML read error
    #[error("XML error: {0}")]
    Xml(String),

    /// I/O operation error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid import settings
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ImportError {
    /// True when the driver may log the error and continue with the next bundle
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Bundle(_))
    }

    /// Classify an error raised while reading one delimited record
    ///
    /// Undecodable or misshapen rows become a recoverable [`ParseError`]
    /// carrying the line; I/O failures stay fatal.
    pub fn from_csv_record(e: csv::Error, file: Option<&str>) -> Self {
        let row_level = matches!(
            e.kind(),
            csv::ErrorKind::Utf8 { .. }
                | csv::ErrorKind::UnequalLengths { .. }
                | csv::ErrorKind::Deserialize { .. }
        );
        if !row_level {
            return Self::Csv(e);
        }

        let line = e.position().map(|p| p.line());
        let context = match (file, line) {
            (Some(file), Some(line)) => format!("{} line {}", file, line),
            (Some(file), None) => file.to_string(),
            (None, Some(line)) => format!("line {}", line),
            (None, None) => "line ?".to_string(),
        };
        ParseError::invalid_shape("record", e.to_string(), context).into()
    }
}

impl From<quick_xml::Error> for ImportError {
    fn from(e: quick_xml::Error) -> Self {
        Self::Xml(e.to_string())
    }
}

impl From<pathways_common::Error> for ImportError {
    fn from(e: pathways_common::Error) -> Self {
        match e {
            pathways_common::Error::Io(io) => Self::Io(io),
            other => Self::Config(other.to_string()),
        }
    }
}
