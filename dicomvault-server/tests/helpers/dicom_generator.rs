//! DICOM Test Fixture Generator
//!
//! Builds Part 10 files in memory with dicom-object.

use dicom_core::{dicom_value, DataElement, PrimitiveValue, VR};
use dicom_dictionary_std::tags;
use dicom_object::meta::FileMetaTableBuilder;
use dicom_object::InMemDicomObject;

/// Explicit VR Little Endian
pub const EXPLICIT_VR_LE: &str = "1.2.840.10008.1.2.1";

/// Secondary Capture Image Storage
pub const SECONDARY_CAPTURE: &str = "1.2.840.10008.5.1.4.1.1.7";

/// Configuration for a generated image
#[derive(Debug, Clone)]
pub struct ImageConfig {
    pub patient_name: String,
    pub rows: u16,
    pub columns: u16,
    /// Row-major samples, `rows * columns` of them
    pub samples: Vec<u16>,
    /// Omit Pixel Data entirely
    pub without_pixels: bool,
    pub frames: Option<u32>,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            patient_name: "Doe^Jane".to_string(),
            rows: 2,
            columns: 3,
            samples: vec![0, 100, 200, 300, 400, 1000],
            without_pixels: false,
            frames: None,
        }
    }
}

/// Generate a 16-bit MONOCHROME2 image as Part 10 bytes
pub fn generate_dicom(config: &ImageConfig) -> Vec<u8> {
    let sop_instance = "1.2.826.0.1.3680043.2.1125.42";

    let mut object = InMemDicomObject::from_element_iter([
        DataElement::new(tags::SOP_CLASS_UID, VR::UI, dicom_value!(Str, SECONDARY_CAPTURE)),
        DataElement::new(tags::SOP_INSTANCE_UID, VR::UI, dicom_value!(Str, sop_instance)),
        DataElement::new(tags::PATIENT_NAME, VR::PN, dicom_value!(Str, config.patient_name.as_str())),
        DataElement::new(tags::PATIENT_ID, VR::LO, dicom_value!(Str, "PID-0001")),
        DataElement::new(tags::MODALITY, VR::CS, dicom_value!(Str, "OT")),
        DataElement::new(tags::IMAGE_TYPE, VR::CS, dicom_value!(Strs, ["ORIGINAL", "PRIMARY"])),
        DataElement::new(tags::SAMPLES_PER_PIXEL, VR::US, dicom_value!(U16, [1])),
        DataElement::new(tags::PHOTOMETRIC_INTERPRETATION, VR::CS, dicom_value!(Str, "MONOCHROME2")),
        DataElement::new(tags::ROWS, VR::US, dicom_value!(U16, [config.rows])),
        DataElement::new(tags::COLUMNS, VR::US, dicom_value!(U16, [config.columns])),
        DataElement::new(tags::BITS_ALLOCATED, VR::US, dicom_value!(U16, [16])),
        DataElement::new(tags::BITS_STORED, VR::US, dicom_value!(U16, [16])),
        DataElement::new(tags::HIGH_BIT, VR::US, dicom_value!(U16, [15])),
        DataElement::new(tags::PIXEL_REPRESENTATION, VR::US, dicom_value!(U16, [0])),
    ]);

    if let Some(frames) = config.frames {
        object.put(DataElement::new(
            tags::NUMBER_OF_FRAMES,
            VR::IS,
            dicom_value!(Str, frames.to_string()),
        ));
    }

    if !config.without_pixels {
        object.put(DataElement::new(
            tags::PIXEL_DATA,
            VR::OW,
            PrimitiveValue::U16(config.samples.iter().copied().collect()),
        ));
    }

    let file = object
        .with_meta(
            FileMetaTableBuilder::new()
                .transfer_syntax(EXPLICIT_VR_LE)
                .media_storage_sop_class_uid(SECONDARY_CAPTURE)
                .media_storage_sop_instance_uid(sop_instance),
        )
        .expect("valid file meta");

    let mut bytes = Vec::new();
    file.write_all(&mut bytes).expect("encode DICOM file");
    bytes
}

/// Default test image
pub fn sample_dicom() -> Vec<u8> {
    generate_dicom(&ImageConfig::default())
}
