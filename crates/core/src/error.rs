use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Unknown issue type: {0}")]
    UnknownIssueType(String),

    #[error("Unknown severity: {0}")]
    UnknownSeverity(String),

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Validation error: {0}")]
    Validation(String),
}
