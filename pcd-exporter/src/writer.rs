use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use las::{point::Format, Builder, Header, Transform, Vector, Writer};
use pcd_core::{millimeters_to_meters, PointRecord, PointTable};

use crate::{
    error::ExportError,
    extra_bytes::{extra_bytes_vlr, record_len, LidarExtraBytes, LIDAR_FIELDS},
};

/// Meters per stored coordinate unit on every axis.
pub const COORDINATE_SCALE: f64 = 0.01;

const LAS_VERSION: (u8, u8) = (1, 4);
// Format 1 carries GPS time and no color.
const POINT_FORMAT: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    Las,
    #[default]
    Laz,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Las => "las",
            OutputFormat::Laz => "laz",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "las" => Ok(OutputFormat::Las),
            "laz" => Ok(OutputFormat::Laz),
            other => Err(ExportError::InvalidFormat(other.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// The capture path with its extension replaced by `.las` or `.laz`.
pub fn output_path<P: AsRef<Path>>(capture_path: P, format: OutputFormat) -> PathBuf {
    capture_path.as_ref().with_extension(format.extension())
}

/// Scale and offset that map meter coordinates to stored integers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputGeometry {
    pub offset: [f64; 3],
    pub scale: [f64; 3],
}

impl OutputGeometry {
    /// Offsets each axis by its minimum, so stored values start at zero.
    pub fn from_table(table: &PointTable) -> Self {
        Self {
            offset: table.min_coordinates_m().unwrap_or([0.0; 3]),
            scale: [COORDINATE_SCALE; 3],
        }
    }

    pub fn transforms(&self) -> Vector<Transform> {
        let axis = |i: usize| Transform {
            scale: self.scale[i],
            offset: self.offset[i],
        };
        Vector {
            x: axis(0),
            y: axis(1),
            z: axis(2),
        }
    }

    fn check_stored(&self, field: &'static str, axis: usize, meters: f64) -> Result<(), ExportError> {
        let stored = ((meters - self.offset[axis]) / self.scale[axis]).round();
        if !stored.is_finite() || stored < i32::MIN as f64 || stored > i32::MAX as f64 {
            return Err(ExportError::ValueOutOfRange {
                field,
                value: meters,
            });
        }
        Ok(())
    }
}

fn channel(field: &'static str, value: i64) -> Result<u16, ExportError> {
    u16::try_from(value).map_err(|_| ExportError::ValueOutOfRange {
        field,
        value: value as f64,
    })
}

pub struct PointCloudWriter {
    header: Header,
    geometry: OutputGeometry,
}

impl PointCloudWriter {
    /// Builds a LAS 1.4 header declaring the lidar extra fields, with
    /// transforms fitted to `table`.
    pub fn new(table: &PointTable) -> Result<Self, ExportError> {
        log::info!("Prepping lidar data for export...");

        let geometry = OutputGeometry::from_table(table);

        let mut builder = Builder::from(LAS_VERSION);
        builder.point_format = Format::new(POINT_FORMAT)?;
        builder.point_format.extra_bytes = record_len(&LIDAR_FIELDS) as u16;
        builder.transforms = geometry.transforms();
        builder.generating_software = format!("pcap2las {}", env!("CARGO_PKG_VERSION"));
        builder.vlrs.push(extra_bytes_vlr(&LIDAR_FIELDS));
        let header = builder.into_header()?;

        log::debug!(
            "header offsets {:?}, scale {}",
            geometry.offset,
            COORDINATE_SCALE
        );

        Ok(Self { header, geometry })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn geometry(&self) -> &OutputGeometry {
        &self.geometry
    }

    pub fn encode_point(&self, record: &PointRecord) -> Result<las::Point, ExportError> {
        let nanoseconds =
            u64::try_from(record.timestamp_ns).map_err(|_| ExportError::ValueOutOfRange {
                field: "nanoseconds",
                value: record.timestamp_ns as f64,
            })?;
        let extra = LidarExtraBytes {
            nanoseconds,
            range: millimeters_to_meters(record.range_mm),
            signal: channel("signal", record.signal)?,
            near_ir: channel("near_ir", record.near_ir)?,
            reflectivity: channel("reflectivity", record.reflectivity)?,
        };

        let [x, y, z] = record.coordinates_m();
        self.geometry.check_stored("x", 0, x)?;
        self.geometry.check_stored("y", 1, y)?;
        self.geometry.check_stored("z", 2, z)?;

        Ok(las::Point {
            x,
            y,
            z,
            gps_time: Some(0.0),
            extra_bytes: extra.to_bytes(),
            ..Default::default()
        })
    }

    /// Writes every record of `table`. A `.laz` path is compressed.
    pub fn write<P: AsRef<Path>>(&self, table: &PointTable, path: P) -> Result<(), ExportError> {
        log::info!("Writing lidar data to {}...", path.as_ref().display());

        let mut writer = Writer::from_path(path.as_ref(), self.header.clone())?;
        for record in table.iter() {
            writer.write_point(self.encode_point(record)?)?;
        }
        writer.close()?;

        log::debug!("wrote {} points", table.len());
        Ok(())
    }
}
