//! Error types with rich diagnostics using miette
//!
//! Only caller mistakes are errors. Geometry that cannot be resolved during
//! live editing (a ray that misses a boundary, a zero-length direction) falls
//! back to a well-defined point instead and never shows up here.

use miette::Diagnostic;
use thiserror::Error;

use crate::types::{CellId, NumericError};

// ============================================================================
// Geometry Errors
// ============================================================================

/// Malformed input to a geometry or routing operation
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("expected at least {needed} points, got {got}")]
    #[diagnostic(
        code(nodelink::geometry::too_few_points),
        help("a path needs a start and an end point")
    )]
    TooFewPoints { needed: usize, got: usize },

    #[error("non-finite coordinate in {what}")]
    #[diagnostic(code(nodelink::geometry::non_finite))]
    NonFinite { what: &'static str },

    #[error("invalid path data at `{token}`")]
    #[diagnostic(
        code(nodelink::geometry::invalid_path_data),
        help("only absolute M, L, C and Z commands are understood")
    )]
    InvalidPathData { token: String },
}

// ============================================================================
// Model Errors
// ============================================================================

/// Rejected graph mutations
#[derive(Error, Diagnostic, Debug)]
pub enum ModelError {
    #[error("a cell with id `{0}` already exists")]
    #[diagnostic(code(nodelink::model::duplicate_id))]
    DuplicateId(CellId),

    #[error("no cell with id `{0}`")]
    #[diagnostic(code(nodelink::model::unknown_cell))]
    UnknownCell(CellId),

    #[error("cell `{0}` is not an element")]
    #[diagnostic(code(nodelink::model::not_an_element))]
    NotAnElement(CellId),

    #[error("cell `{0}` is not a link")]
    #[diagnostic(code(nodelink::model::not_a_link))]
    NotALink(CellId),

    #[error("recursive embedding not allowed: `{parent}` cannot embed `{child}`")]
    #[diagnostic(
        code(nodelink::model::recursive_embedding),
        help("a cell may not embed itself or one of its ancestors")
    )]
    RecursiveEmbedding { parent: CellId, child: CellId },

    #[error("vertex index {index} out of range for link `{link}` with {len} vertices")]
    #[diagnostic(code(nodelink::model::vertex_out_of_range))]
    VertexOutOfRange {
        link: CellId,
        index: usize,
        len: usize,
    },

    #[error("label index {index} out of range for link `{link}` with {len} labels")]
    #[diagnostic(code(nodelink::model::label_out_of_range))]
    LabelOutOfRange {
        link: CellId,
        index: usize,
        len: usize,
    },

    #[error("invalid size: {0}")]
    #[diagnostic(code(nodelink::model::invalid_size))]
    InvalidSize(NumericError),

    #[error("invalid cell json: {0}")]
    #[diagnostic(code(nodelink::model::invalid_json))]
    InvalidJson(#[from] serde_json::Error),

    #[error("graph json has no `cells` array")]
    #[diagnostic(
        code(nodelink::model::missing_cells),
        help("expected a document of the form {{\"cells\": [...]}}")
    )]
    MissingCells,
}

// ============================================================================
// View Errors
// ============================================================================

/// Errors raised by the paper when driving views
#[derive(Error, Diagnostic, Debug)]
pub enum ViewError {
    #[error("no view for cell `{0}`")]
    #[diagnostic(code(nodelink::view::unknown_view))]
    UnknownView(CellId),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Model(#[from] ModelError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = ModelError::RecursiveEmbedding {
            parent: CellId::new("a"),
            child: CellId::new("b"),
        };
        assert_eq!(
            err.to_string(),
            "recursive embedding not allowed: `a` cannot embed `b`"
        );
        let err = GeometryError::TooFewPoints { needed: 2, got: 1 };
        assert_eq!(err.to_string(), "expected at least 2 points, got 1");
    }

    #[test]
    fn test_diagnostic_codes() {
        let err = ModelError::UnknownCell(CellId::new("x"));
        let code = err.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("nodelink::model::unknown_cell"));
    }
}
