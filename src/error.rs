//! @ai:module:intent Define fatal error types for schema compilation, configuration and scanning
//! @ai:module:layer domain
//! @ai:module:public_api Error, Result
//! @ai:module:stateless true

use std::path::PathBuf;
use thiserror::Error;

/// @ai:intent Unified error type for every fatal code-annotations failure
///
/// Annotation problems found while linting are not represented here; they are
/// accumulated as [`crate::validator::ValidationError`] records instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} is configured more than once, tokens must be unique.")]
    DuplicateToken(String),

    #[error("Annotation tokens must not be blank, found {0:?}.")]
    BlankToken(String),

    #[error("Group \"{0}\" must have more than one annotation.")]
    GroupTooSmall(String),

    #[error("{0} is an unknown annotation type.")]
    UnknownAnnotationShape(String),

    #[error("Group \"{group}\" has a malformed member: {detail}")]
    MalformedGroupMember { group: String, detail: String },

    #[error("\"{0}\" declares an empty list of choices.")]
    EmptyChoices(String),

    #[error("The following required keys are missing from the configuration file: \n{}", .0.join("\n"))]
    MissingConfigKeys(Vec<String>),

    #[error("Coverage target must be a number between 0 and 100 not \"{0}\".")]
    CoverageNotANumber(String),

    #[error("Invalid coverage target. {0:?} is not between 0 and 100.")]
    CoverageOutOfRange(f64),

    #[error("Please add 'coverage_target' to your configuration before running coverage checks")]
    CoverageTargetMissing,

    #[error("Not all configured extensions could be loaded! Unknown extractors: {}", .0.join(", "))]
    UnknownExtractor(Vec<String>),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{location}: annotation match is missing the '{group}' capture group")]
    MalformedMatch { location: String, group: &'static str },

    #[error("Failed to build annotation regex: {0}")]
    Regex(#[from] regex::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// @ai:intent Report whether this error belongs to the configuration category
    /// @ai:effects pure
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::DuplicateToken(_)
                | Error::BlankToken(_)
                | Error::GroupTooSmall(_)
                | Error::UnknownAnnotationShape(_)
                | Error::MalformedGroupMember { .. }
                | Error::EmptyChoices(_)
                | Error::MissingConfigKeys(_)
                | Error::CoverageNotANumber(_)
                | Error::CoverageOutOfRange(_)
                | Error::CoverageTargetMissing
                | Error::UnknownExtractor(_)
                | Error::InvalidConfig(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
