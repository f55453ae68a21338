//! Ouster sensor metadata.
//!
//! Both metadata layouts written by Ouster tooling are accepted: the legacy
//! flat document (`beam_altitude_angles`, `data_format`, `lidar_mode` at the
//! top level) and the nested one produced by newer firmware
//! (`beam_intrinsics`, `lidar_intrinsics`, `lidar_data_format`,
//! `config_params`, `sensor_info`).

pub mod xyz;

use std::{fmt, path::Path, str::FromStr};

use serde::Deserialize;

use crate::error::ParseError;

const IDENTITY: [f64; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

pub const DEFAULT_COLUMNS_PER_PACKET: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UdpProfile {
    Legacy,
    Rng19Rfl8Sig16Nir16,
}

impl FromStr for UdpProfile {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LEGACY" => Ok(UdpProfile::Legacy),
            "RNG19_RFL8_SIG16_NIR16" => Ok(UdpProfile::Rng19Rfl8Sig16Nir16),
            other => Err(ParseError::UnsupportedProfile(other.to_string())),
        }
    }
}

impl fmt::Display for UdpProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UdpProfile::Legacy => write!(f, "LEGACY"),
            UdpProfile::Rng19Rfl8Sig16Nir16 => write!(f, "RNG19_RFL8_SIG16_NIR16"),
        }
    }
}

/// Column count and rotation rate, e.g. `1024x10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LidarMode {
    pub columns: usize,
    pub frequency: u32,
}

impl FromStr for LidarMode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidMetadata(format!("invalid lidar mode '{}'", s));
        let (columns, frequency) = s.split_once('x').ok_or_else(invalid)?;
        Ok(LidarMode {
            columns: columns.parse().map_err(|_| invalid())?,
            frequency: frequency.parse().map_err(|_| invalid())?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataFormat {
    pub pixels_per_column: usize,
    pub columns_per_packet: usize,
    pub columns_per_frame: usize,
    pub pixel_shift_by_row: Vec<i32>,
    pub udp_profile_lidar: UdpProfile,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensorInfo {
    pub prod_line: String,
    pub prod_sn: String,
    pub lidar_mode: Option<LidarMode>,
    pub udp_port_lidar: Option<u16>,
    pub format: DataFormat,
    pub beam_altitude_angles: Vec<f64>,
    pub beam_azimuth_angles: Vec<f64>,
    pub lidar_origin_to_beam_origin_mm: f64,
    /// Row-major 4x4, translation in millimeters.
    pub beam_to_lidar_transform: [f64; 16],
    /// Row-major 4x4, translation in millimeters.
    pub lidar_to_sensor_transform: [f64; 16],
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMetadata {
    prod_line: Option<String>,
    prod_sn: Option<serde_json::Value>,
    lidar_mode: Option<String>,
    udp_port_lidar: Option<u16>,
    beam_altitude_angles: Option<Vec<f64>>,
    beam_azimuth_angles: Option<Vec<f64>>,
    lidar_origin_to_beam_origin_mm: Option<f64>,
    beam_to_lidar_transform: Option<Vec<f64>>,
    lidar_to_sensor_transform: Option<Vec<f64>>,
    data_format: Option<RawDataFormat>,

    sensor_info: Option<RawProductInfo>,
    beam_intrinsics: Option<RawBeamIntrinsics>,
    lidar_intrinsics: Option<RawLidarIntrinsics>,
    lidar_data_format: Option<RawDataFormat>,
    config_params: Option<RawConfigParams>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawProductInfo {
    prod_line: Option<String>,
    prod_sn: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawBeamIntrinsics {
    beam_altitude_angles: Option<Vec<f64>>,
    beam_azimuth_angles: Option<Vec<f64>>,
    lidar_origin_to_beam_origin_mm: Option<f64>,
    beam_to_lidar_transform: Option<Vec<f64>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawLidarIntrinsics {
    lidar_to_sensor_transform: Option<Vec<f64>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDataFormat {
    pixels_per_column: Option<usize>,
    columns_per_packet: Option<usize>,
    columns_per_frame: Option<usize>,
    pixel_shift_by_row: Option<Vec<i32>>,
    udp_profile_lidar: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfigParams {
    lidar_mode: Option<String>,
    udp_port_lidar: Option<u16>,
}

fn value_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

fn to_matrix(values: Vec<f64>, name: &str) -> Result<[f64; 16], ParseError> {
    values.try_into().map_err(|values: Vec<f64>| {
        ParseError::InvalidMetadata(format!(
            "{} must have 16 elements, got {}",
            name,
            values.len()
        ))
    })
}

impl SensorInfo {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ParseError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        text.parse()
    }

    pub fn rows(&self) -> usize {
        self.format.pixels_per_column
    }

    pub fn columns(&self) -> usize {
        self.format.columns_per_frame
    }

    fn from_raw(raw: RawMetadata) -> Result<Self, ParseError> {
        let product = raw.sensor_info.unwrap_or_default();
        let beams = raw.beam_intrinsics.unwrap_or_default();
        let intrinsics = raw.lidar_intrinsics.unwrap_or_default();
        let config = raw.config_params.unwrap_or_default();
        let data_format = raw.lidar_data_format.or(raw.data_format).unwrap_or_default();

        let lidar_mode = config
            .lidar_mode
            .or(raw.lidar_mode)
            .map(|mode| mode.parse::<LidarMode>())
            .transpose()?;

        let beam_altitude_angles = beams
            .beam_altitude_angles
            .or(raw.beam_altitude_angles)
            .ok_or_else(|| ParseError::InvalidMetadata("missing beam_altitude_angles".into()))?;
        let beam_azimuth_angles = beams
            .beam_azimuth_angles
            .or(raw.beam_azimuth_angles)
            .ok_or_else(|| ParseError::InvalidMetadata("missing beam_azimuth_angles".into()))?;

        let pixels_per_column = data_format
            .pixels_per_column
            .unwrap_or(beam_altitude_angles.len());
        let columns_per_frame = data_format
            .columns_per_frame
            .or(lidar_mode.map(|mode| mode.columns))
            .ok_or_else(|| ParseError::InvalidMetadata("missing columns_per_frame".into()))?;

        let format = DataFormat {
            pixels_per_column,
            columns_per_packet: data_format
                .columns_per_packet
                .unwrap_or(DEFAULT_COLUMNS_PER_PACKET),
            columns_per_frame,
            pixel_shift_by_row: data_format
                .pixel_shift_by_row
                .unwrap_or_else(|| vec![0; pixels_per_column]),
            udp_profile_lidar: data_format
                .udp_profile_lidar
                .as_deref()
                .unwrap_or("LEGACY")
                .parse()?,
        };

        let lidar_origin_to_beam_origin_mm = beams
            .lidar_origin_to_beam_origin_mm
            .or(raw.lidar_origin_to_beam_origin_mm)
            .unwrap_or(0.0);
        let beam_to_lidar_transform = match beams
            .beam_to_lidar_transform
            .or(raw.beam_to_lidar_transform)
        {
            Some(values) => to_matrix(values, "beam_to_lidar_transform")?,
            None => {
                let mut transform = IDENTITY;
                transform[3] = lidar_origin_to_beam_origin_mm;
                transform
            }
        };
        let lidar_to_sensor_transform = match intrinsics
            .lidar_to_sensor_transform
            .or(raw.lidar_to_sensor_transform)
        {
            Some(values) => to_matrix(values, "lidar_to_sensor_transform")?,
            None => IDENTITY,
        };

        let info = SensorInfo {
            prod_line: product
                .prod_line
                .or(raw.prod_line)
                .unwrap_or_else(|| "unknown".to_string()),
            prod_sn: product
                .prod_sn
                .or(raw.prod_sn)
                .map(value_to_string)
                .unwrap_or_else(|| "unknown".to_string()),
            lidar_mode,
            udp_port_lidar: config.udp_port_lidar.or(raw.udp_port_lidar),
            format,
            beam_altitude_angles,
            beam_azimuth_angles,
            lidar_origin_to_beam_origin_mm,
            beam_to_lidar_transform,
            lidar_to_sensor_transform,
        };
        info.validate()?;
        Ok(info)
    }

    fn validate(&self) -> Result<(), ParseError> {
        let rows = self.rows();
        if rows == 0 || self.columns() == 0 {
            return Err(ParseError::InvalidMetadata(format!(
                "empty sensor grid {}x{}",
                rows,
                self.columns()
            )));
        }
        if self.format.columns_per_packet == 0 {
            return Err(ParseError::InvalidMetadata(
                "columns_per_packet must be positive".into(),
            ));
        }
        for (name, len) in [
            ("beam_altitude_angles", self.beam_altitude_angles.len()),
            ("beam_azimuth_angles", self.beam_azimuth_angles.len()),
            ("pixel_shift_by_row", self.format.pixel_shift_by_row.len()),
        ] {
            if len != rows {
                return Err(ParseError::InvalidMetadata(format!(
                    "{} has {} entries, expected {}",
                    name, len, rows
                )));
            }
        }
        Ok(())
    }
}

impl FromStr for SensorInfo {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: RawMetadata = serde_json::from_str(s)?;
        Self::from_raw(raw)
    }
}
