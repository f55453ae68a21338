//! Streaming UDP payload reader for pcap and pcapng captures.

use std::{fs::File, io::Read, path::Path};

use etherparse::{SlicedPacket, TransportSlice};
use pcap_parser::{create_reader, traits::PcapReaderIterator, Block, Linktype, PcapBlockOwned, PcapError};

use crate::{error::ParseError, reader::PacketSource};

/// Large enough for any single block of an Ouster capture.
const READ_BUFFER_LEN: usize = 1 << 20;

/// Reads UDP payloads block by block, never holding the whole capture in memory.
///
/// The file handle is released when the reader is dropped.
pub struct PcapReader {
    reader: Box<dyn PcapReaderIterator>,
    port: Option<u16>,
    /// Link type per interface id; legacy captures have a single interface 0.
    linktypes: Vec<Linktype>,
    blocks_read: usize,
}

impl PcapReader {
    /// Opens a capture, keeping only UDP packets whose source or destination is `port`.
    pub fn from_path<P: AsRef<Path>>(path: P, port: Option<u16>) -> Result<Self, ParseError> {
        let file = File::open(path.as_ref())?;
        Self::new(file, port)
    }

    pub fn new<R: Read + 'static>(input: R, port: Option<u16>) -> Result<Self, ParseError> {
        let reader = create_reader(READ_BUFFER_LEN, input)
            .map_err(|e| ParseError::Pcap(format!("failed to open capture: {:?}", e)))?;
        Ok(Self {
            reader,
            port,
            linktypes: Vec::new(),
            blocks_read: 0,
        })
    }
}

impl PacketSource for PcapReader {
    fn next_packet(&mut self) -> Result<Option<Vec<u8>>, ParseError> {
        loop {
            match self.reader.next() {
                Ok((offset, block)) => {
                    let payload = match block {
                        PcapBlockOwned::LegacyHeader(header) => {
                            self.linktypes = vec![header.network];
                            None
                        }
                        PcapBlockOwned::Legacy(packet) => {
                            interface_payload(&self.linktypes, 0, packet.data, self.port)
                        }
                        PcapBlockOwned::NG(Block::SectionHeader(_)) => {
                            self.linktypes.clear();
                            None
                        }
                        PcapBlockOwned::NG(Block::InterfaceDescription(idb)) => {
                            self.linktypes.push(idb.linktype);
                            None
                        }
                        PcapBlockOwned::NG(Block::EnhancedPacket(epb)) => {
                            interface_payload(&self.linktypes, epb.if_id, epb.data, self.port)
                        }
                        PcapBlockOwned::NG(Block::SimplePacket(spb)) => {
                            interface_payload(&self.linktypes, 0, spb.data, self.port)
                        }
                        _ => None,
                    };
                    self.blocks_read += 1;
                    self.reader.consume(offset);

                    if payload.is_some() {
                        return Ok(payload);
                    }
                }
                Err(PcapError::Eof) => {
                    log::debug!("end of capture after {} blocks", self.blocks_read);
                    return Ok(None);
                }
                Err(PcapError::Incomplete(_)) => {
                    self.reader
                        .refill()
                        .map_err(|e| ParseError::Pcap(format!("{:?}", e)))?;
                }
                Err(e) => return Err(ParseError::Pcap(format!("{:?}", e))),
            }
        }
    }
}

fn interface_payload(
    linktypes: &[Linktype],
    if_id: u32,
    data: &[u8],
    port: Option<u16>,
) -> Option<Vec<u8>> {
    match linktypes.get(if_id as usize) {
        Some(linktype) => extract_udp_payload(data, *linktype, port),
        None => {
            log::debug!("skipping packet on undeclared interface {}", if_id);
            None
        }
    }
}

/// Returns the UDP payload of a captured frame, or `None` for anything else.
fn extract_udp_payload(data: &[u8], linktype: Linktype, port: Option<u16>) -> Option<Vec<u8>> {
    let packet = if linktype == Linktype::ETHERNET {
        SlicedPacket::from_ethernet(data).ok()?
    } else if linktype == Linktype::RAW || linktype == Linktype::IPV4 || linktype == Linktype::IPV6 {
        SlicedPacket::from_ip(data).ok()?
    } else {
        log::debug!("skipping frame with unsupported link type {:?}", linktype);
        return None;
    };

    let udp = match packet.transport {
        Some(TransportSlice::Udp(udp)) => udp,
        _ => return None,
    };

    if let Some(filter_port) = port {
        if udp.source_port() != filter_port && udp.destination_port() != filter_port {
            return None;
        }
    }

    let payload = udp.payload();
    if payload.is_empty() {
        return None;
    }
    Some(payload.to_vec())
}


#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::testing::*;
    use super::*;

    fn reader(data: Vec<u8>, port: Option<u16>) -> PcapReader {
        PcapReader::new(Cursor::new(data), port).unwrap()
    }

    fn drain(mut reader: PcapReader) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(payload) = reader.next_packet().unwrap() {
            out.push(payload);
        }
        out
    }

    #[test]
    fn extracts_udp_payload() {
        let frame = udp_frame(7502, 12345, b"test payload");
        let payload = extract_udp_payload(&frame, Linktype::ETHERNET, None).unwrap();
        assert_eq!(payload, b"test payload");
    }

    #[test]
    fn port_filter_matches_either_end() {
        let frame = udp_frame(7502, 12345, b"test payload");
        assert!(extract_udp_payload(&frame, Linktype::ETHERNET, Some(7502)).is_some());
        assert!(extract_udp_payload(&frame, Linktype::ETHERNET, Some(12345)).is_some());
        assert!(extract_udp_payload(&frame, Linktype::ETHERNET, Some(9999)).is_none());
    }

    #[test]
    fn raw_ip_link_type() {
        let frame = udp_frame(7502, 12345, b"raw");
        let payload = extract_udp_payload(&frame[14..], Linktype::RAW, None).unwrap();
        assert_eq!(payload, b"raw");
    }

    #[test]
    fn reads_legacy_capture_in_order() {
        let data = capture(7502, &[b"first".to_vec(), b"second".to_vec()]);
        assert_eq!(
            drain(reader(data, None)),
            vec![b"first".to_vec(), b"second".to_vec()]
        );
    }

    #[test]
    fn filters_by_port() {
        let mut data = PCAP_HEADER.to_vec();
        data.extend_from_slice(&pcap_record(&udp_frame(7502, 40_000, b"lidar")));
        data.extend_from_slice(&pcap_record(&udp_frame(7503, 40_000, b"imu")));
        assert_eq!(drain(reader(data.clone(), Some(7502))), vec![b"lidar".to_vec()]);
        assert_eq!(drain(reader(data, None)).len(), 2);
    }

    #[test]
    fn empty_capture() {
        let mut reader = reader(PCAP_HEADER.to_vec(), None);
        assert!(reader.next_packet().unwrap().is_none());
        assert!(reader.next_packet().unwrap().is_none());
    }

    fn section_header() -> Vec<u8> {
        let mut block = Vec::new();
        block.extend_from_slice(&0x0a0d_0d0au32.to_le_bytes());
        block.extend_from_slice(&28u32.to_le_bytes());
        block.extend_from_slice(&0x1a2b_3c4du32.to_le_bytes());
        block.extend_from_slice(&1u16.to_le_bytes());
        block.extend_from_slice(&0u16.to_le_bytes());
        block.extend_from_slice(&(-1i64).to_le_bytes());
        block.extend_from_slice(&28u32.to_le_bytes());
        block
    }

    fn interface(linktype: u16) -> Vec<u8> {
        let mut block = Vec::new();
        block.extend_from_slice(&1u32.to_le_bytes());
        block.extend_from_slice(&20u32.to_le_bytes());
        block.extend_from_slice(&linktype.to_le_bytes());
        block.extend_from_slice(&0u16.to_le_bytes());
        block.extend_from_slice(&65535u32.to_le_bytes());
        block.extend_from_slice(&20u32.to_le_bytes());
        block
    }

    fn enhanced_packet(if_id: u32, frame: &[u8]) -> Vec<u8> {
        let padded = (frame.len() + 3) & !3;
        let block_len = 32 + padded as u32;
        let mut block = Vec::new();
        block.extend_from_slice(&6u32.to_le_bytes());
        block.extend_from_slice(&block_len.to_le_bytes());
        block.extend_from_slice(&if_id.to_le_bytes());
        block.extend_from_slice(&0u32.to_le_bytes());
        block.extend_from_slice(&0u32.to_le_bytes());
        block.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        block.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        block.extend_from_slice(frame);
        block.resize(28 + padded, 0);
        block.extend_from_slice(&block_len.to_le_bytes());
        block
    }

    #[test]
    fn reads_pcapng_capture() {
        let mut data = section_header();
        data.extend_from_slice(&interface(1));
        data.extend_from_slice(&enhanced_packet(0, &udp_frame(7502, 40_000, b"pcapng-pay")));

        assert_eq!(drain(reader(data, Some(7502))), vec![b"pcapng-pay".to_vec()]);
    }

    #[test]
    fn pcapng_link_type_follows_interface_id() {
        let ethernet = udp_frame(7502, 40_000, b"eth");
        let raw_ip = udp_frame(7502, 40_000, b"raw-ip");

        let mut data = section_header();
        data.extend_from_slice(&interface(101));
        data.extend_from_slice(&interface(1));
        data.extend_from_slice(&enhanced_packet(1, &ethernet));
        data.extend_from_slice(&enhanced_packet(0, &raw_ip[14..]));
        data.extend_from_slice(&enhanced_packet(2, &ethernet));

        assert_eq!(
            drain(reader(data, None)),
            vec![b"eth".to_vec(), b"raw-ip".to_vec()]
        );
    }

    #[test]
    fn rejects_non_capture_input() {
        assert!(PcapReader::new(Cursor::new(b"definitely not a pcap".to_vec()), None).is_err());
    }

    #[test]
    fn from_path_missing_file() {
        assert!(matches!(
            PcapReader::from_path("does/not/exist.pcap", None),
            Err(ParseError::Io(_))
        ));
    }
}
