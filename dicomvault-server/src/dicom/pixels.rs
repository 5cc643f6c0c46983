//! Pixel matrix extraction
//!
//! Only native (uncompressed), single-frame, single-sample pixel data is
//! supported. Samples are widened to `u32`; signed samples below zero are
//! clamped to 0.

use dicom_core::value::PrimitiveValue;

use super::DicomError;

/// Row-major matrix of non-negative samples
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelMatrix {
    rows: usize,
    columns: usize,
    samples: Vec<u32>,
}

impl PixelMatrix {
    /// Build a matrix from row-major samples
    ///
    /// Fails if the sample count does not match `rows * columns` or if
    /// either dimension is zero.
    pub fn new(rows: usize, columns: usize, samples: Vec<u32>) -> Result<Self, DicomError> {
        if rows == 0 || columns == 0 {
            return Err(DicomError::PixelData(format!(
                "empty pixel matrix ({}x{})",
                rows, columns
            )));
        }
        let count = rows
            .checked_mul(columns)
            .ok_or_else(|| DicomError::PixelData("declared shape too large".to_string()))?;
        if samples.len() != count {
            return Err(DicomError::PixelData(format!(
                "{} samples do not fill a {}x{} matrix",
                samples.len(),
                rows,
                columns
            )));
        }
        Ok(Self { rows, columns, samples })
    }

    /// Build a matrix from nested rows
    pub fn from_rows(rows: Vec<Vec<u32>>) -> Result<Self, DicomError> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|row| row.len() != width) {
            return Err(DicomError::PixelData("ragged pixel rows".to_string()));
        }
        Self::new(height, width, rows.into_iter().flatten().collect())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn samples(&self) -> &[u32] {
        &self.samples
    }

    /// Largest sample in the matrix
    pub fn max_sample(&self) -> u32 {
        self.samples.iter().copied().max().unwrap_or(0)
    }
}

/// Shape and encoding attributes needed to decode native pixel data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PixelLayout {
    pub rows: usize,
    pub columns: usize,
    pub bits_allocated: u32,
    pub signed: bool,
    pub samples_per_pixel: u32,
    pub frames: u32,
}

impl PixelLayout {
    fn bytes_per_sample(&self) -> usize {
        (self.bits_allocated / 8) as usize
    }

    fn validate(&self) -> Result<(), DicomError> {
        if self.frames != 1 {
            return Err(DicomError::PixelData(format!(
                "multi-frame images are not supported ({} frames)",
                self.frames
            )));
        }
        if self.samples_per_pixel != 1 {
            return Err(DicomError::PixelData(format!(
                "only single-sample grayscale is supported (samples per pixel = {})",
                self.samples_per_pixel
            )));
        }
        if !matches!(self.bits_allocated, 8 | 16 | 32) {
            return Err(DicomError::PixelData(format!(
                "unsupported bits allocated: {}",
                self.bits_allocated
            )));
        }
        Ok(())
    }
}

/// Flatten a pixel data value into its little-endian byte stream
fn little_endian_bytes(value: &PrimitiveValue) -> Vec<u8> {
    match value {
        PrimitiveValue::U8(bytes) => bytes.to_vec(),
        PrimitiveValue::U16(words) => words.iter().flat_map(|w| w.to_le_bytes()).collect(),
        PrimitiveValue::U32(words) => words.iter().flat_map(|w| w.to_le_bytes()).collect(),
        other => other.to_bytes().into_owned(),
    }
}

/// Decode native pixel data into a matrix
pub(crate) fn decode_native(layout: PixelLayout, value: &PrimitiveValue) -> Result<PixelMatrix, DicomError> {
    layout.validate()?;

    let bytes = little_endian_bytes(value);
    let width = layout.bytes_per_sample();
    let needed = layout
        .rows
        .checked_mul(layout.columns)
        .and_then(|count| count.checked_mul(width))
        .ok_or_else(|| DicomError::PixelData("declared shape too large".to_string()))?;

    // Odd-length pixel data carries one padding byte, anything beyond the
    // declared shape is ignored.
    if bytes.len() < needed {
        return Err(DicomError::PixelData(format!(
            "pixel data holds {} bytes, {}x{} at {} bits needs {}",
            bytes.len(),
            layout.rows,
            layout.columns,
            layout.bits_allocated,
            needed
        )));
    }

    let samples = bytes[..needed]
        .chunks_exact(width)
        .map(|chunk| decode_sample(chunk, layout.signed))
        .collect();

    PixelMatrix::new(layout.rows, layout.columns, samples)
}

fn decode_sample(chunk: &[u8], signed: bool) -> u32 {
    match (chunk, signed) {
        ([b], false) => u32::from(*b),
        ([b], true) => (*b as i8).max(0) as u32,
        ([b0, b1], false) => u32::from(u16::from_le_bytes([*b0, *b1])),
        ([b0, b1], true) => i16::from_le_bytes([*b0, *b1]).max(0) as u32,
        ([b0, b1, b2, b3], false) => u32::from_le_bytes([*b0, *b1, *b2, *b3]),
        ([b0, b1, b2, b3], true) => i32::from_le_bytes([*b0, *b1, *b2, *b3]).max(0) as u32,
        _ => 0,
    }
}
