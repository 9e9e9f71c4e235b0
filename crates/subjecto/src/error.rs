use thiserror::Error;

pub type Result<T> = std::result::Result<T, SubjectError>;

/// Synchronous, caller-recoverable failures.
///
/// A failing call is rejected before any mutation or notification, so the
/// subject keeps its previous value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubjectError {
    #[error("value must be an object")]
    ValueNotObject,

    #[error("value must be an array")]
    ValueNotArray,

    #[error("value contains a circular reference")]
    CircularValue,
}
