use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("'{0}' is not a valid format. Only 'las' or 'laz' accepted.")]
    InvalidFormat(String),

    #[error("{field} value {value} cannot be stored in the output file")]
    ValueOutOfRange { field: &'static str, value: f64 },

    #[error(transparent)]
    Las(#[from] las::Error),
}
