//! Fatal error types for the parsing and expansion pipeline.

use thiserror::Error;

use crate::model::Score;

/// Structural problems that abort parsing outright. Everything else is
/// recorded on the score as a recoverable diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("document has no part-list element")]
    MissingPartList,
    #[error("part-list declares no parts")]
    NoParts,
}

/// Errors returned by the string entry point.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("xml parse error: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error(transparent)]
    Structure(#[from] StructuralError),
}

/// Repeat expansion exceeded the configured measure bound.
///
/// Carries whatever partial expanded score was produced before the limit
/// was hit.
#[derive(Debug, Error)]
#[error("repeat expansion emitted {emitted} measures, exceeding the limit of {limit}")]
pub struct ResourceLimitError {
    pub emitted: usize,
    pub limit: usize,
    pub partial: Box<Score>,
}
