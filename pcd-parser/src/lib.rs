pub mod error;
pub mod packet;
pub mod reader;
pub mod sensor;

pub use error::ParseError;
pub use reader::{ouster::OusterScanReader, pcap::PcapReader, PacketSource, ScanIterator, ScanReader};
pub use sensor::{xyz::OusterGeometry, xyz::XyzLut, DataFormat, LidarMode, SensorInfo, UdpProfile};
