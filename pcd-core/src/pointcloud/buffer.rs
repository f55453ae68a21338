use crate::error::CoreError;
use crate::pointcloud::point::{meters_to_millimeters, PointRecord, PointTable};
use crate::pointcloud::scan::{destagger, ChanField, LidarScan, ScanGeometry};

/// Builds the point records of one scan in image order.
///
/// Every cell of a column shares that column's timestamp. Coordinates are
/// truncated to integer millimeters before the rows are de-staggered.
pub fn decode_scan<G: ScanGeometry + ?Sized>(
    scan: &LidarScan,
    geometry: &G,
) -> Result<Vec<PointRecord>, CoreError> {
    let (height, width) = (geometry.rows(), geometry.columns());
    if scan.height() != height || scan.width() != width {
        return Err(CoreError::GeometryMismatch {
            expected: height * width,
            actual: scan.len(),
        });
    }

    let channel = |name: ChanField| scan.field(name).ok_or(CoreError::MissingChannel(name));
    let range = channel(ChanField::Range)?;
    let signal = channel(ChanField::Signal)?;
    let near_ir = channel(ChanField::NearIr)?;
    let reflectivity = channel(ChanField::Reflectivity)?;

    let xyz = geometry.cartesian(scan)?;
    if xyz.len() != scan.len() {
        return Err(CoreError::GeometryMismatch {
            expected: scan.len(),
            actual: xyz.len(),
        });
    }

    let timestamps = scan
        .timestamps()
        .iter()
        .map(|ts| {
            i64::try_from(*ts).map_err(|_| CoreError::ValueOutOfRange {
                field: "timestamp",
                value: *ts,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut records = Vec::with_capacity(scan.len());
    for row in 0..height {
        for (col, timestamp_ns) in timestamps.iter().enumerate() {
            let i = row * width + col;
            let [x, y, z] = xyz[i];
            records.push(PointRecord {
                timestamp_ns: *timestamp_ns,
                range_mm: range[i] as i64,
                signal: signal[i] as i64,
                near_ir: near_ir[i] as i64,
                reflectivity: reflectivity[i] as i64,
                x_mm: meters_to_millimeters(x),
                y_mm: meters_to_millimeters(y),
                z_mm: meters_to_millimeters(z),
            });
        }
    }

    destagger(&records, height, width, geometry.pixel_shift_by_row())
}

/// Flat table of point records that grows in whole chunks of scans.
///
/// Capacity after reserving for scan `i` is
/// `points_per_scan * chunk_size * ceil((i + 1) / chunk_size)`.
#[derive(Debug)]
pub struct PointBuffer {
    points_per_scan: usize,
    chunk_size: usize,
    records: Vec<PointRecord>,
}

impl PointBuffer {
    pub fn new(points_per_scan: usize, chunk_size: usize) -> Result<Self, CoreError> {
        if chunk_size == 0 {
            return Err(CoreError::InvalidChunkSize(chunk_size));
        }
        if points_per_scan == 0 {
            return Err(CoreError::EmptyGeometry);
        }

        Ok(Self {
            points_per_scan,
            chunk_size,
            records: Vec::new(),
        })
    }

    /// Rows reserved so far, written or not.
    pub fn capacity(&self) -> usize {
        self.records.len()
    }

    /// Grows the table by one chunk of zeroed rows when `current_index` starts a new chunk.
    pub fn reserve_chunk(&mut self, current_index: usize) -> bool {
        if current_index % self.chunk_size != 0 {
            return false;
        }

        let additional = self.points_per_scan * self.chunk_size;
        log::debug!(
            "reserving {} rows for scans {}..{}",
            additional,
            current_index,
            current_index + self.chunk_size
        );
        self.records
            .resize(self.records.len() + additional, PointRecord::default());
        true
    }

    /// Copies one scan's rows to `scan_index * points_per_scan`.
    ///
    /// # Panics
    ///
    /// Panics if the destination lies past the reserved capacity, which means
    /// `reserve_chunk` was not called for this scan.
    pub fn write_scan(&mut self, scan_index: usize, rows: &[PointRecord]) -> Result<(), CoreError> {
        if rows.len() != self.points_per_scan {
            return Err(CoreError::GeometryMismatch {
                expected: self.points_per_scan,
                actual: rows.len(),
            });
        }

        let start = scan_index * self.points_per_scan;
        let end = start + self.points_per_scan;
        assert!(
            end <= self.records.len(),
            "scan {} writes rows {}..{} past reserved capacity {}",
            scan_index,
            start,
            end,
            self.records.len()
        );
        self.records[start..end].copy_from_slice(rows);
        Ok(())
    }

    /// Removes every padding row and hands back the finished table.
    pub fn finalize(self) -> PointTable {
        let reserved = self.records.len();
        let table = PointTable::from_records(self.records);
        log::debug!(
            "finalized {} points out of {} reserved rows",
            table.len(),
            reserved
        );
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointcloud::point::SCAN_POINTS;

    struct FlatGeometry {
        rows: usize,
        columns: usize,
        shifts: Vec<i32>,
        xyz: [f64; 3],
    }

    impl ScanGeometry for FlatGeometry {
        fn rows(&self) -> usize {
            self.rows
        }

        fn columns(&self) -> usize {
            self.columns
        }

        fn pixel_shift_by_row(&self) -> &[i32] {
            &self.shifts
        }

        fn cartesian(&self, scan: &LidarScan) -> Result<Vec<[f64; 3]>, CoreError> {
            Ok(vec![self.xyz; scan.len()])
        }
    }

    fn filled_scan(height: usize, width: usize) -> LidarScan {
        let mut scan = LidarScan::new(height, width);
        for (col, ts) in scan.timestamps_mut().iter_mut().enumerate() {
            *ts = 1_000 + col as u64;
        }
        for (i, v) in scan.field_mut(ChanField::Range).unwrap().iter_mut().enumerate() {
            *v = i as u32 + 1;
        }
        scan.field_mut(ChanField::Signal).unwrap().fill(6);
        scan.field_mut(ChanField::NearIr).unwrap().fill(7);
        scan.field_mut(ChanField::Reflectivity).unwrap().fill(8);
        scan
    }

    fn row(timestamp_ns: i64) -> PointRecord {
        PointRecord {
            timestamp_ns,
            ..Default::default()
        }
    }

    #[test]
    fn rejects_zero_chunk_size() {
        assert!(matches!(
            PointBuffer::new(SCAN_POINTS, 0),
            Err(CoreError::InvalidChunkSize(0))
        ));
        assert!(matches!(
            PointBuffer::new(0, 1),
            Err(CoreError::EmptyGeometry)
        ));
    }

    #[test]
    fn capacity_grows_in_whole_chunks() {
        for chunk_size in [1, 2, 3] {
            let mut buffer = PointBuffer::new(SCAN_POINTS, chunk_size).unwrap();
            let mut previous = 0;
            for i in 0..5 {
                buffer.reserve_chunk(i);
                let expected = SCAN_POINTS * chunk_size * (i + 1).div_ceil(chunk_size);
                assert_eq!(buffer.capacity(), expected, "chunk {chunk_size} scan {i}");
                assert!(buffer.capacity() >= previous);
                previous = buffer.capacity();
            }
        }
    }

    #[test]
    fn capacity_invariant_small_grid() {
        for chunk_size in 1..=7 {
            let mut buffer = PointBuffer::new(4, chunk_size).unwrap();
            for i in 0..20 {
                buffer.reserve_chunk(i);
                buffer.write_scan(i, &[row(i as i64 + 1); 4]).unwrap();
                assert_eq!(buffer.capacity(), 4 * chunk_size * (i + 1).div_ceil(chunk_size));
            }
        }
    }

    #[test]
    fn finalize_drops_unused_capacity() {
        let mut buffer = PointBuffer::new(4, 3).unwrap();
        for i in 0..4 {
            buffer.reserve_chunk(i);
            let rows = [row(10 * i as i64 + 1), row(0), row(10 * i as i64 + 2), row(0)];
            buffer.write_scan(i, &rows).unwrap();
        }
        assert_eq!(buffer.capacity(), 24);

        let table = buffer.finalize();
        assert_eq!(table.len(), 8);
        let timestamps: Vec<i64> = table.iter().map(|r| r.timestamp_ns).collect();
        assert_eq!(timestamps, vec![1, 2, 11, 12, 21, 22, 31, 32]);
    }

    #[test]
    fn write_scan_rejects_wrong_row_count() {
        let mut buffer = PointBuffer::new(4, 1).unwrap();
        buffer.reserve_chunk(0);
        assert!(matches!(
            buffer.write_scan(0, &[row(1); 3]),
            Err(CoreError::GeometryMismatch {
                expected: 4,
                actual: 3
            })
        ));
    }

    #[test]
    #[should_panic(expected = "past reserved capacity")]
    fn write_scan_past_capacity_panics() {
        let mut buffer = PointBuffer::new(4, 1).unwrap();
        buffer.reserve_chunk(0);
        let _ = buffer.write_scan(1, &[row(1); 4]);
    }

    #[test]
    fn decode_replicates_column_timestamps() {
        let geometry = FlatGeometry {
            rows: 2,
            columns: 3,
            shifts: vec![0, 0],
            xyz: [1.234, -2.345, 3.4569],
        };
        let records = decode_scan(&filled_scan(2, 3), &geometry).unwrap();
        assert_eq!(records.len(), 6);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.timestamp_ns, 1_000 + (i % 3) as i64);
            assert_eq!(record.range_mm, i as i64 + 1);
            assert_eq!(
                (record.signal, record.near_ir, record.reflectivity),
                (6, 7, 8)
            );
            assert_eq!((record.x_mm, record.y_mm, record.z_mm), (1234, -2345, 3456));
        }
    }

    #[test]
    fn decode_destaggers_rows() {
        let geometry = FlatGeometry {
            rows: 2,
            columns: 3,
            shifts: vec![1, 0],
            xyz: [1.0, 1.0, 1.0],
        };
        let records = decode_scan(&filled_scan(2, 3), &geometry).unwrap();
        let ranges: Vec<i64> = records.iter().map(|r| r.range_mm).collect();
        assert_eq!(ranges, vec![3, 1, 2, 4, 5, 6]);
        let timestamps: Vec<i64> = records.iter().map(|r| r.timestamp_ns).collect();
        assert_eq!(timestamps, vec![1002, 1000, 1001, 1000, 1001, 1002]);
    }

    #[test]
    fn decode_rejects_mismatched_geometry() {
        let geometry = FlatGeometry {
            rows: 4,
            columns: 4,
            shifts: vec![0; 4],
            xyz: [0.0; 3],
        };
        assert!(matches!(
            decode_scan(&filled_scan(2, 3), &geometry),
            Err(CoreError::GeometryMismatch {
                expected: 16,
                actual: 6
            })
        ));
    }

    #[test]
    fn decode_requires_all_channels() {
        let geometry = FlatGeometry {
            rows: 1,
            columns: 2,
            shifts: vec![0],
            xyz: [0.0; 3],
        };
        let scan = LidarScan::with_fields(1, 2, &[ChanField::Range, ChanField::Signal]);
        assert!(matches!(
            decode_scan(&scan, &geometry),
            Err(CoreError::MissingChannel(ChanField::NearIr))
        ));
    }

    #[test]
    fn decode_rejects_oversized_timestamp() {
        let geometry = FlatGeometry {
            rows: 1,
            columns: 1,
            shifts: vec![0],
            xyz: [0.0; 3],
        };
        let mut scan = LidarScan::new(1, 1);
        scan.timestamps_mut()[0] = u64::MAX;
        assert!(matches!(
            decode_scan(&scan, &geometry),
            Err(CoreError::ValueOutOfRange {
                field: "timestamp",
                ..
            })
        ));
    }
}
