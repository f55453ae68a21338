use std::path::Path;

use pcd_core::LidarScan;

use crate::{
    error::ParseError,
    packet::PacketFormat,
    reader::{pcap::PcapReader, PacketSource, ScanReader},
    sensor::SensorInfo,
};

/// Groups lidar packets into scans by frame id.
///
/// A change of frame id closes the scan in progress. The last, possibly
/// partial, scan is returned when the packet source runs dry. Columns that
/// never arrive, or arrive with an invalid status, stay zeroed.
pub struct OusterScanReader<S: PacketSource = PcapReader> {
    source: S,
    format: PacketFormat,
    height: usize,
    width: usize,
    current: Option<LidarScan>,
    skipped_packets: usize,
    exhausted: bool,
}

impl OusterScanReader<PcapReader> {
    /// Opens a capture, filtering on `port` or else on the metadata's lidar port.
    pub fn open<P: AsRef<Path>>(
        capture: P,
        info: &SensorInfo,
        port: Option<u16>,
    ) -> Result<Self, ParseError> {
        let port = port.or(info.udp_port_lidar);
        log::debug!(
            "reading {} with udp profile {} on port {:?}",
            capture.as_ref().display(),
            info.format.udp_profile_lidar,
            port
        );
        let source = PcapReader::from_path(capture, port)?;
        Ok(Self::new(source, info))
    }
}

impl<S: PacketSource> OusterScanReader<S> {
    pub fn new(source: S, info: &SensorInfo) -> Self {
        Self {
            source,
            format: PacketFormat::new(&info.format),
            height: info.rows(),
            width: info.columns(),
            current: None,
            skipped_packets: 0,
            exhausted: false,
        }
    }

    /// Packets that did not match the lidar packet layout.
    pub fn skipped_packets(&self) -> usize {
        self.skipped_packets
    }

    /// Adds one packet to the scan in progress, returning the previous scan
    /// if this packet starts a new frame.
    fn ingest(&mut self, packet: &[u8]) -> Option<LidarScan> {
        if !self.format.accepts(packet) {
            self.skipped_packets += 1;
            log::debug!(
                "skipping packet of {} bytes, expected {}",
                packet.len(),
                self.format.packet_len()
            );
            return None;
        }

        let frame_id = self.format.frame_id(packet);
        let (mut scan, completed) = match self.current.take() {
            Some(scan) if scan.frame_id == frame_id || !scan.has_data() => (scan, None),
            previous => (LidarScan::new(self.height, self.width), previous),
        };
        scan.frame_id = frame_id;

        let (width, height) = (self.width, self.height);
        for column in self.format.columns(packet) {
            if !column.is_valid() {
                continue;
            }
            let col = column.measurement_id() as usize;
            if col >= width {
                log::debug!("skipping column with measurement id {}", col);
                continue;
            }

            scan.timestamps_mut()[col] = column.timestamp();
            for (field, values) in scan.fields_mut() {
                for row in 0..height {
                    values[row * width + col] = column.pixel(row).value(field);
                }
            }
        }
        self.current = Some(scan);

        completed
    }
}

impl<S: PacketSource> ScanReader for OusterScanReader<S> {
    fn next_scan(&mut self) -> Result<Option<LidarScan>, ParseError> {
        while !self.exhausted {
            match self.source.next_packet()? {
                Some(packet) => {
                    if let Some(scan) = self.ingest(&packet) {
                        return Ok(Some(scan));
                    }
                }
                None => {
                    self.exhausted = true;
                    if self.skipped_packets > 0 {
                        log::debug!("skipped {} non-lidar packets", self.skipped_packets);
                    }
                }
            }
        }

        Ok(self.current.take().filter(LidarScan::has_data))
    }
}
