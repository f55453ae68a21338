pub mod error;
pub mod extra_bytes;
pub mod writer;

pub use error::ExportError;
pub use writer::{output_path, OutputFormat, OutputGeometry, PointCloudWriter, COORDINATE_SCALE};
