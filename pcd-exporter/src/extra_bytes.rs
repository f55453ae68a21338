//! Extra Bytes VLR (`LASF_Spec`, record 4) for the per-point lidar channels.

use byteorder::{ByteOrder as _, LittleEndian};
use las::Vlr;

pub const EXTRA_BYTES_USER_ID: &str = "LASF_Spec";
pub const EXTRA_BYTES_RECORD_ID: u16 = 4;
pub const DESCRIPTOR_LEN: usize = 192;

const NAME_LEN: usize = 32;
const DESCRIPTION_LEN: usize = 32;
const NAME_OFFSET: usize = 4;
const DESCRIPTION_OFFSET: usize = 160;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtraBytesType {
    U16,
    U64,
    F64,
}

impl ExtraBytesType {
    /// Data type code from the LAS 1.4 Extra Bytes table.
    pub fn code(&self) -> u8 {
        match self {
            ExtraBytesType::U16 => 3,
            ExtraBytesType::U64 => 7,
            ExtraBytesType::F64 => 10,
        }
    }

    pub fn size(&self) -> usize {
        match self {
            ExtraBytesType::U16 => 2,
            ExtraBytesType::U64 | ExtraBytesType::F64 => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtraBytesField {
    pub name: &'static str,
    pub data_type: ExtraBytesType,
    pub description: &'static str,
}

/// Extra fields in the order they are packed after each point record.
pub const LIDAR_FIELDS: [ExtraBytesField; 5] = [
    ExtraBytesField {
        name: "nanoseconds",
        data_type: ExtraBytesType::U64,
        description: "column timestamp",
    },
    ExtraBytesField {
        name: "range",
        data_type: ExtraBytesType::F64,
        description: "range in meters",
    },
    ExtraBytesField {
        name: "signal",
        data_type: ExtraBytesType::U16,
        description: "signal intensity",
    },
    ExtraBytesField {
        name: "near_ir",
        data_type: ExtraBytesType::U16,
        description: "near infrared",
    },
    ExtraBytesField {
        name: "reflectivity",
        data_type: ExtraBytesType::U16,
        description: "calibrated reflectivity",
    },
];

/// Bytes appended to every point for `fields`.
pub fn record_len(fields: &[ExtraBytesField]) -> usize {
    fields.iter().map(|field| field.data_type.size()).sum()
}

/// 192 byte descriptor with no scale, offset, min, max or no-data values set.
pub fn descriptor(field: &ExtraBytesField) -> [u8; DESCRIPTOR_LEN] {
    let mut buf = [0u8; DESCRIPTOR_LEN];
    buf[2] = field.data_type.code();

    let name = field.name.as_bytes();
    let len = name.len().min(NAME_LEN);
    buf[NAME_OFFSET..NAME_OFFSET + len].copy_from_slice(&name[..len]);

    let description = field.description.as_bytes();
    let len = description.len().min(DESCRIPTION_LEN);
    buf[DESCRIPTION_OFFSET..DESCRIPTION_OFFSET + len].copy_from_slice(&description[..len]);
    buf
}

pub fn extra_bytes_vlr(fields: &[ExtraBytesField]) -> Vlr {
    let mut data = Vec::with_capacity(fields.len() * DESCRIPTOR_LEN);
    for field in fields {
        data.extend_from_slice(&descriptor(field));
    }

    Vlr {
        user_id: EXTRA_BYTES_USER_ID.to_string(),
        record_id: EXTRA_BYTES_RECORD_ID,
        description: "Extra Bytes Record".to_string(),
        data,
    }
}

/// Values for one point, in `LIDAR_FIELDS` order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LidarExtraBytes {
    pub nanoseconds: u64,
    pub range: f64,
    pub signal: u16,
    pub near_ir: u16,
    pub reflectivity: u16,
}

impl LidarExtraBytes {
    pub const LEN: usize = 22;

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0u8; Self::LEN];
        LittleEndian::write_u64(&mut buf[0..8], self.nanoseconds);
        LittleEndian::write_f64(&mut buf[8..16], self.range);
        LittleEndian::write_u16(&mut buf[16..18], self.signal);
        LittleEndian::write_u16(&mut buf[18..20], self.near_ir);
        LittleEndian::write_u16(&mut buf[20..22], self.reflectivity);
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        if buf.len() != Self::LEN {
            return None;
        }
        Some(Self {
            nanoseconds: LittleEndian::read_u64(&buf[0..8]),
            range: LittleEndian::read_f64(&buf[8..16]),
            signal: LittleEndian::read_u16(&buf[16..18]),
            near_ir: LittleEndian::read_u16(&buf[18..20]),
            reflectivity: LittleEndian::read_u16(&buf[20..22]),
        })
    }
}

/// Field names and type codes declared by an Extra Bytes VLR payload.
pub fn declared_fields(data: &[u8]) -> Vec<(String, u8)> {
    data.chunks_exact(DESCRIPTOR_LEN)
        .map(|descriptor| {
            let name = &descriptor[NAME_OFFSET..NAME_OFFSET + NAME_LEN];
            let end = name.iter().position(|b| *b == 0).unwrap_or(NAME_LEN);
            (
                String::from_utf8_lossy(&name[..end]).into_owned(),
                descriptor[2],
            )
        })
        .collect()
}
