//! Metadata field lookup on committed records

use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::dicom::{DicomRecord, TagCoordinate};
use crate::error::{ApiError, ApiResult};
use crate::store::{StorageName, Store};

/// One resolved field, in response shape
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedField {
    pub value: JsonValue,
    pub name: String,
    pub keyword: String,
    /// The token exactly as requested
    pub tag: String,
    #[serde(rename = "VM")]
    pub vm: u32,
    #[serde(rename = "VR")]
    pub vr: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldQueryOutcome {
    /// At least one token was unparseable or absent; lists only those tokens
    Invalid(Vec<String>),
    /// Every token resolved, in request order
    Resolved(Vec<ResolvedField>),
}

/// Load and parse a committed record
///
/// Names that cannot denote a committed record (including provisional
/// `.tmp` names) are reported as not found.
pub(crate) async fn load_record(store: &Store, study: &str, record: &str) -> ApiResult<DicomRecord> {
    let (study, record) = match (StorageName::study(study), StorageName::record(record)) {
        (Ok(study), Ok(record)) => (study, record),
        _ => return Err(ApiError::file_not_found()),
    };

    let bytes = store.read_record(&study, &record).await?;

    tokio::task::spawn_blocking(move || DicomRecord::parse(&bytes))
        .await
        .map_err(|e| ApiError::Internal(format!("parse task failed: {}", e)))?
        .map_err(|e| {
            debug!(study = %study, file = %record, error = %e, "Stored file is not valid DICOM");
            ApiError::from(e)
        })
}

/// Resolve a list of tag tokens against a committed record
pub async fn resolve_fields(
    store: &Store,
    study: &str,
    record: &str,
    tokens: &[String],
) -> ApiResult<FieldQueryOutcome> {
    if tokens.is_empty() {
        return Err(ApiError::MalformedQuery("tag query parameter is empty".to_string()));
    }

    let parsed = load_record(store, study, record).await?;
    Ok(resolve_tokens(&parsed, tokens))
}

fn resolve_tokens(record: &DicomRecord, tokens: &[String]) -> FieldQueryOutcome {
    let mut invalid = Vec::new();
    let mut resolved = Vec::new();

    for token in tokens {
        let field = TagCoordinate::parse_token(token)
            .ok()
            .and_then(|coordinate| record.resolve(coordinate));

        match field {
            Some(field) => resolved.push(ResolvedField {
                value: field.value,
                name: field.name,
                keyword: field.keyword,
                tag: token.clone(),
                vm: field.multiplicity,
                vr: field.vr,
            }),
            None => invalid.push(token.clone()),
        }
    }

    if invalid.is_empty() {
        FieldQueryOutcome::Resolved(resolved)
    } else {
        FieldQueryOutcome::Invalid(invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dicom::test_support::mr_image;
    use serde_json::json;

    fn tokens(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn record() -> DicomRecord {
        DicomRecord::parse(&mr_image("Doe^John", 2, 2, &[1, 2, 3, 4])).unwrap()
    }

    #[test]
    fn test_resolves_in_request_order() {
        let outcome = resolve_tokens(&record(), &tokens(&["(0008,0060)", "(0010,0010)"]));

        let FieldQueryOutcome::Resolved(fields) = outcome else {
            panic!("expected resolved fields");
        };
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].keyword, "Modality");
        assert_eq!(fields[0].tag, "(0008,0060)");
        assert_eq!(fields[1].value, json!("Doe^John"));
        assert_eq!(fields[1].vr, "PN");
    }

    #[test]
    fn test_any_invalid_token_hides_valid_ones() {
        let outcome = resolve_tokens(&record(), &tokens(&["(0010,0010)", "bogus"]));
        assert_eq!(outcome, FieldQueryOutcome::Invalid(tokens(&["bogus"])));
    }

    #[test]
    fn test_absent_coordinate_is_invalid_not_error() {
        let outcome = resolve_tokens(&record(), &tokens(&["(0010,0030)", "(0010,)"]));
        assert_eq!(outcome, FieldQueryOutcome::Invalid(tokens(&["(0010,0030)", "(0010,)"])));
    }

    #[test]
    fn test_integer_field_renders_as_number() {
        let outcome = resolve_tokens(&record(), &tokens(&["(0028,0010)"]));

        let FieldQueryOutcome::Resolved(fields) = outcome else {
            panic!("expected resolved fields");
        };
        assert_eq!(fields[0].value, json!(2));
        assert_eq!(fields[0].name, "Rows");
        assert_eq!(fields[0].vm, 1);
    }

    #[tokio::test]
    async fn test_unparseable_record_is_invalid_format() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = Store::new(dir.path().join("dicom"), dir.path().join("png"));
        let study = StorageName::study("brain").unwrap();
        let name = StorageName::record("a.dcm").unwrap();
        store.ensure_study(&study).await.unwrap();
        store.write_provisional(&study, &name, b"garbage").await.unwrap();
        store.commit(&study, &name).await.unwrap();

        let result = resolve_fields(&store, "brain", "a.dcm", &tokens(&["(0010,0010)"])).await;
        assert!(matches!(result, Err(ApiError::InvalidFormat)));
    }

    #[tokio::test]
    async fn test_missing_record_is_not_found() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = Store::new(dir.path().join("dicom"), dir.path().join("png"));

        let result = resolve_fields(&store, "brain", "a.dcm", &tokens(&["(0010,0010)"])).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[test]
    fn test_response_field_names() {
        let field = ResolvedField {
            value: json!("MR"),
            name: "Modality".to_string(),
            keyword: "Modality".to_string(),
            tag: "(0008,0060)".to_string(),
            vm: 1,
            vr: "CS".to_string(),
        };

        assert_eq!(
            serde_json::to_value(&field).unwrap(),
            json!({
                "value": "MR",
                "name": "Modality",
                "keyword": "Modality",
                "tag": "(0008,0060)",
                "VM": 1,
                "VR": "CS",
            })
        );
    }
}
