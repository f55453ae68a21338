pub mod error;
pub mod runner;

pub use error::ConvertError;
pub use runner::{ConvertOptions, ConvertSummary, Converter, ScanProgress, DEFAULT_CHUNK_SIZE};
