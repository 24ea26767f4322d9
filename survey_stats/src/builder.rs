pub use crate::config::*;

use std::collections::BTreeMap;

/// A builder for records.
///
/// Loaders validate their input and produce records directly. The builder is
/// the convenient way to assemble records by hand.
///
/// ```
/// use survey_stats::builder::RecordBuilder;
///
/// let record = RecordBuilder::new("avf-participant-1")
///     .raw("rqa_s01e01_raw", "We need clean water")
///     .multiple("rqa_s01e01_coded", &["code-water"])
///     .single("gender_coded", "code-female")
///     .build();
///
/// assert!(!record.consent_withdrawn);
/// assert_eq!(record.raw_text("rqa_s01e01_raw"), Some("We need clean water"));
/// ```
pub struct RecordBuilder {
    _uid: String,
    _consent_withdrawn: bool,
    _fields: BTreeMap<String, FieldValue>,
}

impl RecordBuilder {
    pub fn new(uid: &str) -> RecordBuilder {
        RecordBuilder {
            _uid: uid.to_string(),
            _consent_withdrawn: false,
            _fields: BTreeMap::new(),
        }
    }

    pub fn consent_withdrawn(self, withdrawn: bool) -> RecordBuilder {
        RecordBuilder {
            _consent_withdrawn: withdrawn,
            ..self
        }
    }

    /// Sets the raw text of a field.
    pub fn raw(self, field: &str, text: &str) -> RecordBuilder {
        self.field(field, FieldValue::Text(text.to_string()))
    }

    /// Sets a single-select coded field.
    pub fn single(self, field: &str, code_id: &str) -> RecordBuilder {
        self.field(
            field,
            FieldValue::Single(Label {
                code_id: code_id.to_string(),
            }),
        )
    }

    /// Sets a multi-select coded field. The order of the labels is kept.
    pub fn multiple(self, field: &str, code_ids: &[&str]) -> RecordBuilder {
        let labels: Vec<Label> = code_ids
            .iter()
            .map(|c| Label {
                code_id: c.to_string(),
            })
            .collect();
        self.field(field, FieldValue::Multiple(labels))
    }

    pub fn field(mut self, field: &str, value: FieldValue) -> RecordBuilder {
        self._fields.insert(field.to_string(), value);
        self
    }

    pub fn build(self) -> Record {
        Record {
            uid: self._uid,
            consent_withdrawn: self._consent_withdrawn,
            fields: self._fields,
        }
    }
}
