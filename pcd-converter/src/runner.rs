use std::path::{Path, PathBuf};

use pcd_core::{decode_scan, PointBuffer, PointTable, ScanGeometry};
use pcd_exporter::{output_path, OutputFormat, PointCloudWriter};
use pcd_parser::{ScanIterator, ScanReader};

use crate::error::ConvertError;

/// Scans reserved per growth step of the point buffer.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOptions {
    pub chunk_size: usize,
    pub format: OutputFormat,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            format: OutputFormat::Laz,
        }
    }
}

/// Reported once per extracted scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanProgress {
    /// Zero-based position of the scan in the capture.
    pub index: usize,
    pub frame_id: u16,
    /// Rows currently reserved in the point buffer.
    pub capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertSummary {
    pub scans: usize,
    pub points: usize,
    pub output: PathBuf,
}

/// Runs extraction and export. The first error from any stage ends the run.
pub struct Converter<'a> {
    options: ConvertOptions,
    progress: Option<Box<dyn FnMut(ScanProgress) + 'a>>,
}

impl<'a> Converter<'a> {
    pub fn new(options: ConvertOptions) -> Self {
        Self {
            options,
            progress: None,
        }
    }

    pub fn with_progress<F>(mut self, progress: F) -> Self
    where
        F: FnMut(ScanProgress) + 'a,
    {
        self.progress = Some(Box::new(progress));
        self
    }

    /// Collects every scan of `reader` into a padding-free table.
    pub fn extract<R, G>(&mut self, reader: R, geometry: &G) -> Result<PointTable, ConvertError>
    where
        R: ScanReader,
        G: ScanGeometry + ?Sized,
    {
        self.extract_scans(reader, geometry).map(|(table, _)| table)
    }

    fn extract_scans<R, G>(&mut self, reader: R, geometry: &G) -> Result<(PointTable, usize), ConvertError>
    where
        R: ScanReader,
        G: ScanGeometry + ?Sized,
    {
        let points_per_scan = geometry.rows() * geometry.columns();
        let mut buffer = PointBuffer::new(points_per_scan, self.options.chunk_size)?;

        let mut scans = 0;
        for (index, scan) in ScanIterator::new(reader).enumerate() {
            let scan = scan?;
            buffer.reserve_chunk(index);
            let rows = decode_scan(&scan, geometry)?;
            buffer.write_scan(index, &rows)?;
            scans += 1;

            if let Some(progress) = self.progress.as_mut() {
                progress(ScanProgress {
                    index,
                    frame_id: scan.frame_id,
                    capacity: buffer.capacity(),
                });
            }
        }

        let table = buffer.finalize();
        log::info!("extracted {} points from {} scans", table.len(), scans);
        Ok((table, scans))
    }

    /// Converts the scans of `reader` into a LAS/LAZ file next to `capture_path`.
    pub fn convert<R, G, P>(
        &mut self,
        reader: R,
        geometry: &G,
        capture_path: P,
    ) -> Result<ConvertSummary, ConvertError>
    where
        R: ScanReader,
        G: ScanGeometry + ?Sized,
        P: AsRef<Path>,
    {
        let (table, scans) = self.extract_scans(reader, geometry)?;

        let output = output_path(capture_path, self.options.format);
        let writer = PointCloudWriter::new(&table)?;
        writer.write(&table, &output)?;

        Ok(ConvertSummary {
            scans,
            points: table.len(),
            output,
        })
    }
}
