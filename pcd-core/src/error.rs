use thiserror::Error;

use crate::pointcloud::scan::ChanField;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("chunk size must be a positive integer, got {0}")]
    InvalidChunkSize(usize),

    #[error("points per scan must be a positive integer")]
    EmptyGeometry,

    #[error("scan geometry mismatch: expected {expected} cells, got {actual}")]
    GeometryMismatch { expected: usize, actual: usize },

    #[error("scan is missing the {0} channel")]
    MissingChannel(ChanField),

    #[error("{field} value {value} does not fit into a point record")]
    ValueOutOfRange { field: &'static str, value: u64 },
}
