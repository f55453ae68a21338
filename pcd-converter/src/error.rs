use thiserror::Error;

use pcd_core::CoreError;
use pcd_exporter::ExportError;
use pcd_parser::ParseError;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Export(#[from] ExportError),
}
