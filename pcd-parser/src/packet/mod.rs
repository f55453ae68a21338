//! Ouster lidar packet layouts.
//!
//! `LEGACY`: every column is a 16 byte header (timestamp, measurement id,
//! frame id, encoder count), `pixels_per_column` 12 byte pixels and a 4 byte
//! status word.
//!
//! `RNG19_RFL8_SIG16_NIR16`: a 32 byte packet header carrying the frame id,
//! columns of a 12 byte header (timestamp, measurement id, status) plus
//! 12 byte pixels, and a 32 byte packet footer.

use byteorder::{ByteOrder as _, LittleEndian};

use pcd_core::ChanField;

use crate::sensor::{DataFormat, UdpProfile};

const PIXEL_LEN: usize = 12;
const LIDAR_PACKET_TYPE: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pixel {
    pub range: u32,
    pub signal: u16,
    pub near_ir: u16,
    pub reflectivity: u16,
}

impl Pixel {
    pub fn value(&self, field: ChanField) -> u32 {
        match field {
            ChanField::Range => self.range,
            ChanField::Signal => self.signal as u32,
            ChanField::NearIr => self.near_ir as u32,
            ChanField::Reflectivity => self.reflectivity as u32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketFormat {
    pub profile: UdpProfile,
    pub pixels_per_column: usize,
    pub columns_per_packet: usize,
}

impl PacketFormat {
    pub fn new(format: &DataFormat) -> Self {
        Self {
            profile: format.udp_profile_lidar,
            pixels_per_column: format.pixels_per_column,
            columns_per_packet: format.columns_per_packet,
        }
    }

    fn packet_header_len(&self) -> usize {
        match self.profile {
            UdpProfile::Legacy => 0,
            UdpProfile::Rng19Rfl8Sig16Nir16 => 32,
        }
    }

    fn packet_footer_len(&self) -> usize {
        match self.profile {
            UdpProfile::Legacy => 0,
            UdpProfile::Rng19Rfl8Sig16Nir16 => 32,
        }
    }

    fn column_header_len(&self) -> usize {
        match self.profile {
            UdpProfile::Legacy => 16,
            UdpProfile::Rng19Rfl8Sig16Nir16 => 12,
        }
    }

    fn column_footer_len(&self) -> usize {
        match self.profile {
            UdpProfile::Legacy => 4,
            UdpProfile::Rng19Rfl8Sig16Nir16 => 0,
        }
    }

    pub fn column_len(&self) -> usize {
        self.column_header_len() + self.pixels_per_column * PIXEL_LEN + self.column_footer_len()
    }

    pub fn packet_len(&self) -> usize {
        self.packet_header_len() + self.columns_per_packet * self.column_len() + self.packet_footer_len()
    }

    /// Checks the packet size (and type for non-legacy profiles).
    pub fn accepts(&self, packet: &[u8]) -> bool {
        if packet.len() != self.packet_len() {
            return false;
        }
        match self.profile {
            UdpProfile::Legacy => true,
            UdpProfile::Rng19Rfl8Sig16Nir16 => LittleEndian::read_u16(&packet[0..2]) == LIDAR_PACKET_TYPE,
        }
    }

    /// Frame id of an accepted packet.
    pub fn frame_id(&self, packet: &[u8]) -> u16 {
        match self.profile {
            UdpProfile::Legacy => LittleEndian::read_u16(&packet[10..12]),
            UdpProfile::Rng19Rfl8Sig16Nir16 => LittleEndian::read_u16(&packet[2..4]),
        }
    }

    /// Column blocks of an accepted packet.
    pub fn columns<'a>(&'a self, packet: &'a [u8]) -> impl Iterator<Item = ColumnSlice<'a>> + 'a {
        let start = self.packet_header_len();
        let len = self.column_len();
        (0..self.columns_per_packet).map(move |i| ColumnSlice {
            format: self,
            slice: &packet[start + i * len..start + (i + 1) * len],
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnSlice<'a> {
    format: &'a PacketFormat,
    slice: &'a [u8],
}

impl ColumnSlice<'_> {
    pub fn timestamp(&self) -> u64 {
        LittleEndian::read_u64(&self.slice[0..8])
    }

    pub fn measurement_id(&self) -> u16 {
        LittleEndian::read_u16(&self.slice[8..10])
    }

    pub fn is_valid(&self) -> bool {
        match self.format.profile {
            UdpProfile::Legacy => {
                let at = self.slice.len() - 4;
                LittleEndian::read_u32(&self.slice[at..]) == 0xffff_ffff
            }
            UdpProfile::Rng19Rfl8Sig16Nir16 => LittleEndian::read_u16(&self.slice[10..12]) & 0x01 != 0,
        }
    }

    pub fn pixel(&self, row: usize) -> Pixel {
        let at = self.format.column_header_len() + row * PIXEL_LEN;
        let px = &self.slice[at..at + PIXEL_LEN];
        match self.format.profile {
            UdpProfile::Legacy => Pixel {
                range: LittleEndian::read_u32(&px[0..4]) & 0x000f_ffff,
                reflectivity: LittleEndian::read_u16(&px[4..6]),
                signal: LittleEndian::read_u16(&px[6..8]),
                near_ir: LittleEndian::read_u16(&px[8..10]),
            },
            UdpProfile::Rng19Rfl8Sig16Nir16 => Pixel {
                range: LittleEndian::read_u32(&px[0..4]) & 0x0007_ffff,
                reflectivity: px[4] as u16,
                signal: LittleEndian::read_u16(&px[6..8]),
                near_ir: LittleEndian::read_u16(&px[8..10]),
            },
        }
    }
}
