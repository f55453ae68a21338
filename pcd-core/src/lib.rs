pub mod error;
pub mod pointcloud;

pub use error::CoreError;
pub use pointcloud::buffer::{decode_scan, PointBuffer};
pub use pointcloud::point::{
    meters_to_millimeters, millimeters_to_meters, PointRecord, PointTable,
    MILLIMETERS_PER_METER, SCAN_POINTS,
};
pub use pointcloud::scan::{destagger, ChanField, LidarScan, ScanGeometry};
