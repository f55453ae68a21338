use std::f64::consts::PI;

use pcd_core::{ChanField, CoreError, LidarScan, ScanGeometry};

use super::SensorInfo;

/// Meters per raw range unit (the sensor reports millimeters).
pub const RANGE_UNIT: f64 = 0.001;

/// Per-pixel unit direction and beam-origin offset, already scaled to meters.
///
/// A point is `direction * range + offset`; a zero range stays at the origin.
#[derive(Debug, Clone)]
pub struct XyzLut {
    direction: Vec<[f64; 3]>,
    offset: Vec<[f64; 3]>,
}

fn rotate(transform: &[f64; 16], v: [f64; 3]) -> [f64; 3] {
    let mut out = [0.0; 3];
    for (i, o) in out.iter_mut().enumerate() {
        *o = transform[4 * i] * v[0] + transform[4 * i + 1] * v[1] + transform[4 * i + 2] * v[2];
    }
    out
}

impl XyzLut {
    pub fn new(info: &SensorInfo) -> Self {
        let (height, width) = (info.rows(), info.columns());
        let beam_to_lidar = &info.beam_to_lidar_transform;
        let lidar_to_sensor = &info.lidar_to_sensor_transform;
        let beam_x = beam_to_lidar[3];
        let beam_z = beam_to_lidar[11];
        let n = (beam_x * beam_x + beam_z * beam_z).sqrt();
        let translation = [lidar_to_sensor[3], lidar_to_sensor[7], lidar_to_sensor[11]];

        let mut direction = Vec::with_capacity(height * width);
        let mut offset = Vec::with_capacity(height * width);
        for row in 0..height {
            let azimuth = -info.beam_azimuth_angles[row].to_radians();
            let altitude = info.beam_altitude_angles[row].to_radians();
            for col in 0..width {
                let encoder = 2.0 * PI - (col as f64 * 2.0 * PI / width as f64);

                let d = [
                    (encoder + azimuth).cos() * altitude.cos(),
                    (encoder + azimuth).sin() * altitude.cos(),
                    altitude.sin(),
                ];
                let o = [
                    encoder.cos() * beam_x - d[0] * n,
                    encoder.sin() * beam_x - d[1] * n,
                    beam_z - d[2] * n,
                ];

                let d = rotate(lidar_to_sensor, d);
                let o = rotate(lidar_to_sensor, o);
                direction.push(d.map(|v| v * RANGE_UNIT));
                offset.push([
                    (o[0] + translation[0]) * RANGE_UNIT,
                    (o[1] + translation[1]) * RANGE_UNIT,
                    (o[2] + translation[2]) * RANGE_UNIT,
                ]);
            }
        }

        Self { direction, offset }
    }

    pub fn len(&self) -> usize {
        self.direction.len()
    }

    pub fn is_empty(&self) -> bool {
        self.direction.is_empty()
    }

    /// Coordinates in meters for a row-major range image in millimeters.
    pub fn cartesian(&self, range: &[u32]) -> Result<Vec<[f64; 3]>, CoreError> {
        if range.len() != self.len() {
            return Err(CoreError::GeometryMismatch {
                expected: self.len(),
                actual: range.len(),
            });
        }

        Ok(range
            .iter()
            .zip(self.direction.iter().zip(&self.offset))
            .map(|(r, (d, o))| {
                if *r == 0 {
                    return [0.0; 3];
                }
                let r = *r as f64;
                [d[0] * r + o[0], d[1] * r + o[1], d[2] * r + o[2]]
            })
            .collect())
    }
}

/// [`ScanGeometry`] of an Ouster sensor described by its metadata.
#[derive(Debug, Clone)]
pub struct OusterGeometry {
    info: SensorInfo,
    lut: XyzLut,
}

impl OusterGeometry {
    pub fn new(info: SensorInfo) -> Self {
        let lut = XyzLut::new(&info);
        Self { info, lut }
    }

    pub fn info(&self) -> &SensorInfo {
        &self.info
    }
}

impl ScanGeometry for OusterGeometry {
    fn rows(&self) -> usize {
        self.info.rows()
    }

    fn columns(&self) -> usize {
        self.info.columns()
    }

    fn pixel_shift_by_row(&self) -> &[i32] {
        &self.info.format.pixel_shift_by_row
    }

    fn cartesian(&self, scan: &LidarScan) -> Result<Vec<[f64; 3]>, CoreError> {
        let range = scan
            .field(ChanField::Range)
            .ok_or(CoreError::MissingChannel(ChanField::Range))?;
        self.lut.cartesian(range)
    }
}
