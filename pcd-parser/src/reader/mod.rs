pub mod ouster;
pub mod pcap;

use pcd_core::LidarScan;

use crate::error::ParseError;

/// Finite, single-pass stream of raw lidar packets.
pub trait PacketSource {
    fn next_packet(&mut self) -> Result<Option<Vec<u8>>, ParseError>;
}

/// Finite, single-pass stream of decoded scans.
pub trait ScanReader {
    fn next_scan(&mut self) -> Result<Option<LidarScan>, ParseError>;
}

/// Adapts a [`ScanReader`] into an iterator that stops after the first error.
pub struct ScanIterator<R: ScanReader> {
    reader: R,
    done: bool,
}

impl<R: ScanReader> ScanIterator<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            done: false,
        }
    }
}

impl<R: ScanReader> Iterator for ScanIterator<R> {
    type Item = Result<LidarScan, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.reader.next_scan() {
            Ok(Some(scan)) => Some(Ok(scan)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
