//! Resolved metadata fields
//!
//! Converts an in-memory DICOM element into the JSON-friendly [`Field`]
//! returned by tag queries.

use dicom_core::dictionary::{DataDictionary, DataDictionaryEntry};
use dicom_core::value::PrimitiveValue;
use dicom_core::{Tag, VR};
use dicom_dictionary_std::StandardDataDictionary;
use dicom_object::mem::InMemElement;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Name reported for private or unknown tags
pub const UNKNOWN_TAG_NAME: &str = "Unknown Tag";

/// A resolved metadata entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    /// Element value rendered as JSON
    pub value: JsonValue,
    /// Human-readable attribute name, e.g. "Patient Name"
    pub name: String,
    /// Dictionary keyword, e.g. "PatientName" (empty when unknown)
    pub keyword: String,
    /// Value multiplicity
    pub multiplicity: u32,
    /// Two-letter value representation code
    pub vr: String,
}

impl Field {
    pub(crate) fn from_element(tag: Tag, element: &InMemElement) -> Self {
        let keyword = StandardDataDictionary
            .by_tag(tag)
            .map(|entry| entry.alias().to_string())
            .unwrap_or_default();
        let name = if keyword.is_empty() {
            UNKNOWN_TAG_NAME.to_string()
        } else {
            humanize_keyword(&keyword)
        };

        let vr = element.vr();
        let value = element.value();

        Self {
            value: match (value.primitive(), value.items()) {
                (Some(primitive), _) => render_primitive(vr, primitive),
                (None, Some(items)) => JsonValue::String(format!("<sequence of {} items>", items.len())),
                (None, None) => JsonValue::String("<encapsulated pixel data>".to_string()),
            },
            name,
            keyword,
            multiplicity: value.multiplicity(),
            vr: vr.to_string().to_owned(),
        }
    }
}

fn is_binary_vr(vr: VR) -> bool {
    matches!(
        vr,
        VR::OB | VR::OW | VR::OF | VR::OD | VR::OL | VR::OV | VR::UN
    )
}

fn is_integer_vr(vr: VR) -> bool {
    matches!(
        vr,
        VR::IS | VR::SS | VR::US | VR::SL | VR::UL | VR::SV | VR::UV
    )
}

fn is_decimal_vr(vr: VR) -> bool {
    matches!(vr, VR::DS | VR::FL | VR::FD)
}

fn render_primitive(vr: VR, primitive: &PrimitiveValue) -> JsonValue {
    if primitive.multiplicity() == 0 {
        return JsonValue::Null;
    }

    if is_binary_vr(vr) {
        return JsonValue::String(format!("<binary {} bytes>", primitive.calculate_byte_len()));
    }

    let values: Vec<JsonValue> = primitive
        .to_multi_str()
        .iter()
        .map(|s| render_scalar(vr, s.trim()))
        .collect();

    match <[JsonValue; 1]>::try_from(values) {
        Ok([single]) => single,
        Err(values) => JsonValue::Array(values),
    }
}

fn render_scalar(vr: VR, text: &str) -> JsonValue {
    if is_integer_vr(vr) {
        if let Ok(n) = text.parse::<i64>() {
            return JsonValue::from(n);
        }
        if let Ok(n) = text.parse::<u64>() {
            return JsonValue::from(n);
        }
    } else if is_decimal_vr(vr) {
        if let Some(n) = text
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
        {
            return JsonValue::Number(n);
        }
    }
    JsonValue::String(text.to_string())
}

/// Split a dictionary keyword into words
///
/// `PatientName` → `Patient Name`, `SOPInstanceUID` → `SOP Instance UID`
pub fn humanize_keyword(keyword: &str) -> String {
    let chars: Vec<char> = keyword.chars().collect();
    let mut out = String::with_capacity(keyword.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if prev.is_ascii_lowercase() || prev.is_ascii_digit() || (prev.is_ascii_uppercase() && next_is_lower) {
                out.push(' ');
            }
        }
        out.push(c);
    }

    out
}
