/// Number of cells in one full scan of the supported sensor (channels x columns).
pub const SCAN_POINTS: usize = 1 << 16;

pub const MILLIMETERS_PER_METER: f64 = 1000.0;

/// Truncates toward zero, so `1.2349` m becomes `1234` mm.
pub fn meters_to_millimeters(meters: f64) -> i64 {
    (meters * MILLIMETERS_PER_METER) as i64
}

pub fn millimeters_to_meters(millimeters: i64) -> f64 {
    millimeters as f64 / MILLIMETERS_PER_METER
}

// One decoded lidar return.
// Coordinates are kept as integer millimeters while accumulating so that
// nothing is lost before the writer derives its own scale and offset:
// x = x_mm / 1000 (meters)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PointRecord {
    pub timestamp_ns: i64,
    pub range_mm: i64,
    pub signal: i64,
    pub near_ir: i64,
    pub reflectivity: i64,
    pub x_mm: i64,
    pub y_mm: i64,
    pub z_mm: i64,
}

impl PointRecord {
    /// Zero-initialized rows are reserved capacity that no scan wrote to.
    pub fn is_padding(&self) -> bool {
        *self == Self::default()
    }

    pub fn coordinates_m(&self) -> [f64; 3] {
        [
            millimeters_to_meters(self.x_mm),
            millimeters_to_meters(self.y_mm),
            millimeters_to_meters(self.z_mm),
        ]
    }
}

/// Finalized, padding-free set of points in extraction order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointTable {
    records: Vec<PointRecord>,
}

impl PointTable {
    /// Drops every padding row, keeping the relative order of the rest.
    pub fn from_records(mut records: Vec<PointRecord>) -> Self {
        records.retain(|record| !record.is_padding());
        Self { records }
    }

    pub fn records(&self) -> &[PointRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PointRecord> {
        self.records.iter()
    }

    /// Per-axis minimum of the meter-converted coordinates.
    pub fn min_coordinates_m(&self) -> Option<[f64; 3]> {
        if self.records.is_empty() {
            return None;
        }

        let mut min = [f64::MAX, f64::MAX, f64::MAX];
        for record in &self.records {
            for (axis, value) in record.coordinates_m().into_iter().enumerate() {
                min[axis] = min[axis].min(value);
            }
        }
        Some(min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(timestamp_ns: i64, x_mm: i64) -> PointRecord {
        PointRecord {
            timestamp_ns,
            x_mm,
            ..Default::default()
        }
    }

    #[test]
    fn zero_record_is_padding() {
        assert!(PointRecord::default().is_padding());
        assert!(!record(1, 0).is_padding());
        assert!(!record(0, -1).is_padding());
    }

    #[test]
    fn millimeter_round_trip() {
        for mm in [-123_456_789, -1, 0, 1, 999, 1234, 2345, 3456, 120_000] {
            assert_eq!(meters_to_millimeters(millimeters_to_meters(mm)), mm);
        }
    }

    #[test]
    fn meters_truncate_toward_zero() {
        assert_eq!(meters_to_millimeters(1.2349), 1234);
        assert_eq!(meters_to_millimeters(-1.2349), -1234);
        assert_eq!(meters_to_millimeters(1.234), 1234);
        assert_eq!(meters_to_millimeters(2.345), 2345);
        assert_eq!(meters_to_millimeters(3.456), 3456);
    }

    #[test]
    fn table_drops_padding_in_order() {
        let records = vec![
            record(3, 30),
            PointRecord::default(),
            record(1, 10),
            PointRecord::default(),
            PointRecord::default(),
            record(2, 20),
        ];
        let table = PointTable::from_records(records);
        assert_eq!(table.len(), 3);
        let timestamps: Vec<i64> = table.iter().map(|r| r.timestamp_ns).collect();
        assert_eq!(timestamps, vec![3, 1, 2]);
        assert!(table.iter().all(|r| !r.is_padding()));
    }

    #[test]
    fn min_coordinates_use_meters() {
        let table = PointTable::from_records(vec![
            PointRecord {
                timestamp_ns: 1,
                x_mm: 1500,
                y_mm: -250,
                z_mm: 10,
                ..Default::default()
            },
            PointRecord {
                timestamp_ns: 2,
                x_mm: -500,
                y_mm: 750,
                z_mm: 20,
                ..Default::default()
            },
        ]);
        assert_eq!(table.min_coordinates_m(), Some([-0.5, -0.25, 0.01]));
        assert_eq!(PointTable::default().min_coordinates_m(), None);
    }
}
