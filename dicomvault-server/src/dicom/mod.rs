//! DICOM format validation and parsing
//!
//! A byte stream is recognized as DICOM when it carries the Part 10 preamble
//! followed by the `DICM` magic code, and it is parseable when the file meta
//! group and the data set decode without error. Failure is an ordinary
//! [`DicomError`] value so callers can classify files instead of aborting.

pub mod field;
pub mod pixels;
pub mod tag;

pub use field::Field;
pub use pixels::PixelMatrix;
pub use tag::{TagCoordinate, TagParseError};

use dicom_core::Tag;
use dicom_dictionary_std::tags;
use dicom_object::mem::InMemElement;
use dicom_object::DefaultDicomObject;
use thiserror::Error;

use pixels::PixelLayout;

/// Length of the Part 10 preamble
pub const PREAMBLE_LEN: usize = 128;

/// Magic code following the preamble
pub const MAGIC: &[u8; 4] = b"DICM";

/// Errors raised while validating or decoding a DICOM file
#[derive(Debug, Error)]
pub enum DicomError {
    /// Missing preamble or `DICM` magic code
    #[error("not a DICOM file: missing DICM signature")]
    NotDicom,

    /// Signature present but meta group or data set failed to decode
    #[error("malformed DICOM file: {0}")]
    Malformed(String),

    /// Pixel data absent, encapsulated, or inconsistent with the declared shape
    #[error("unsupported pixel data: {0}")]
    PixelData(String),
}

impl DicomError {
    /// True for outcomes that mean "this is not a usable DICOM file"
    pub fn is_invalid_format(&self) -> bool {
        matches!(self, DicomError::NotDicom | DicomError::Malformed(_))
    }
}

/// Check for the Part 10 preamble and `DICM` magic code
pub fn has_dicom_signature(bytes: &[u8]) -> bool {
    bytes.len() >= PREAMBLE_LEN + MAGIC.len()
        && &bytes[PREAMBLE_LEN..PREAMBLE_LEN + MAGIC.len()] == MAGIC
}

/// A parsed DICOM file with typed field access
pub struct DicomRecord {
    object: DefaultDicomObject,
}

impl std::fmt::Debug for DicomRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DicomRecord")
            .field("transfer_syntax", &self.object.meta().transfer_syntax())
            .finish_non_exhaustive()
    }
}

impl DicomRecord {
    /// Validate and parse a complete DICOM file
    pub fn parse(bytes: &[u8]) -> Result<Self, DicomError> {
        if !has_dicom_signature(bytes) {
            return Err(DicomError::NotDicom);
        }

        let object = dicom_object::from_reader(&bytes[PREAMBLE_LEN..])
            .map_err(|e| DicomError::Malformed(e.to_string()))?;

        Ok(Self { object })
    }

    /// Resolve a coordinate to a field, `None` when the record lacks it
    pub fn resolve(&self, coordinate: TagCoordinate) -> Option<Field> {
        let tag = Tag::from(coordinate);
        self.element(tag).map(|element| Field::from_element(tag, element))
    }

    /// Declared (rows, columns) shape, if both attributes are present
    pub fn shape(&self) -> Option<(usize, usize)> {
        let rows = self.int_attribute(tags::ROWS).ok()?;
        let columns = self.int_attribute(tags::COLUMNS).ok()?;
        Some((rows as usize, columns as usize))
    }

    /// Decode the pixel data into a matrix
    pub fn pixel_matrix(&self) -> Result<PixelMatrix, DicomError> {
        let (rows, columns) = self
            .shape()
            .ok_or_else(|| DicomError::PixelData("missing Rows/Columns".to_string()))?;

        let layout = PixelLayout {
            rows,
            columns,
            bits_allocated: self.int_attribute(tags::BITS_ALLOCATED)?,
            signed: self.int_attribute_or(tags::PIXEL_REPRESENTATION, 0)? == 1,
            samples_per_pixel: self.int_attribute_or(tags::SAMPLES_PER_PIXEL, 1)?,
            frames: self.int_attribute_or(tags::NUMBER_OF_FRAMES, 1)?,
        };

        let pixel_data = self
            .element(tags::PIXEL_DATA)
            .ok_or_else(|| DicomError::PixelData("missing Pixel Data".to_string()))?;

        let value = pixel_data.value().primitive().ok_or_else(|| {
            DicomError::PixelData("encapsulated pixel data is not supported".to_string())
        })?;

        pixels::decode_native(layout, value)
    }

    fn element(&self, tag: Tag) -> Option<&InMemElement> {
        self.object.element_opt(tag).ok().flatten()
    }

    fn int_attribute(&self, tag: Tag) -> Result<u32, DicomError> {
        let element = self.element(tag).ok_or_else(|| {
            DicomError::PixelData(format!("missing attribute {}", TagCoordinate::from(tag)))
        })?;
        element.to_int::<u32>().map_err(|e| {
            DicomError::PixelData(format!("attribute {}: {}", TagCoordinate::from(tag), e))
        })
    }

    fn int_attribute_or(&self, tag: Tag, default: u32) -> Result<u32, DicomError> {
        match self.element(tag) {
            None => Ok(default),
            Some(_) => self.int_attribute(tag),
        }
    }
}
