use std::fmt;

use crate::error::CoreError;

/// Channel fields carried by a scan, in the order the sensor reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChanField {
    Range,
    Signal,
    NearIr,
    Reflectivity,
}

impl ChanField {
    pub const ALL: [ChanField; 4] = [
        ChanField::Range,
        ChanField::Signal,
        ChanField::NearIr,
        ChanField::Reflectivity,
    ];
}

impl fmt::Display for ChanField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChanField::Range => write!(f, "RANGE"),
            ChanField::Signal => write!(f, "SIGNAL"),
            ChanField::NearIr => write!(f, "NEAR_IR"),
            ChanField::Reflectivity => write!(f, "REFLECTIVITY"),
        }
    }
}

/// One sweep of the sensor: `height` channels by `width` columns.
///
/// Channel data is stored row-major (`row * width + column`), still in the
/// staggered order the columns were fired in.
#[derive(Debug, Clone, PartialEq)]
pub struct LidarScan {
    pub frame_id: u16,
    height: usize,
    width: usize,
    timestamps: Vec<u64>,
    fields: Vec<(ChanField, Vec<u32>)>,
}

impl LidarScan {
    pub fn new(height: usize, width: usize) -> Self {
        Self::with_fields(height, width, &ChanField::ALL)
    }

    pub fn with_fields(height: usize, width: usize, fields: &[ChanField]) -> Self {
        Self {
            frame_id: 0,
            height,
            width,
            timestamps: vec![0; width],
            fields: fields
                .iter()
                .map(|field| (*field, vec![0; height * width]))
                .collect(),
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn len(&self) -> usize {
        self.height * self.width
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn timestamps(&self) -> &[u64] {
        &self.timestamps
    }

    pub fn timestamps_mut(&mut self) -> &mut [u64] {
        &mut self.timestamps
    }

    pub fn field_names(&self) -> impl Iterator<Item = ChanField> + '_ {
        self.fields.iter().map(|(name, _)| *name)
    }

    pub fn field(&self, name: ChanField) -> Option<&[u32]> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, values)| values.as_slice())
    }

    pub fn field_mut(&mut self, name: ChanField) -> Option<&mut [u32]> {
        self.fields
            .iter_mut()
            .find(|(field, _)| *field == name)
            .map(|(_, values)| values.as_mut_slice())
    }

    pub fn fields_mut(&mut self) -> impl Iterator<Item = (ChanField, &mut [u32])> + '_ {
        self.fields
            .iter_mut()
            .map(|(name, values)| (*name, values.as_mut_slice()))
    }

    /// True once at least one column carries a timestamp.
    pub fn has_data(&self) -> bool {
        self.timestamps.iter().any(|ts| *ts != 0)
    }
}

/// Sensor geometry needed to turn a scan into points.
pub trait ScanGeometry {
    fn rows(&self) -> usize;

    fn columns(&self) -> usize;

    /// Column offset each row was fired at, used to de-stagger into image order.
    fn pixel_shift_by_row(&self) -> &[i32];

    /// Cartesian coordinates in meters for every cell, row-major, staggered.
    fn cartesian(&self, scan: &LidarScan) -> Result<Vec<[f64; 3]>, CoreError>;
}

/// Re-aligns staggered columns: `out[row][(col + shift) mod width] = in[row][col]`.
pub fn destagger<T: Copy + Default>(
    data: &[T],
    height: usize,
    width: usize,
    pixel_shift_by_row: &[i32],
) -> Result<Vec<T>, CoreError> {
    if data.len() != height * width {
        return Err(CoreError::GeometryMismatch {
            expected: height * width,
            actual: data.len(),
        });
    }
    if pixel_shift_by_row.len() != height {
        return Err(CoreError::GeometryMismatch {
            expected: height,
            actual: pixel_shift_by_row.len(),
        });
    }

    if width == 0 {
        return Ok(Vec::new());
    }

    let mut out = vec![T::default(); data.len()];
    for (row, shift) in pixel_shift_by_row.iter().enumerate() {
        let offset = (*shift as i64).rem_euclid(width as i64) as usize;
        let src = &data[row * width..(row + 1) * width];
        let dst = &mut out[row * width..(row + 1) * width];
        dst[offset..].copy_from_slice(&src[..width - offset]);
        dst[..offset].copy_from_slice(&src[width - offset..]);
    }
    Ok(out)
}
