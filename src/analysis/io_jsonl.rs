// Reading the datasets: one JSON object per line.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};

use serde_json::Map as JSMap;
use serde_json::Value as JSValue;

use crate::analysis::*;

/// The fields that the loader keeps from each line, and how to read them.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RecordSchema {
    pub uid_key: String,
    pub consent_withdrawn_key: String,
    pub raw_fields: HashSet<String>,
    pub coded_fields: HashMap<String, CodingMode>,
}

impl RecordSchema {
    pub fn new(uid_key: &str, consent_withdrawn_key: &str) -> RecordSchema {
        RecordSchema {
            uid_key: uid_key.to_string(),
            consent_withdrawn_key: consent_withdrawn_key.to_string(),
            raw_fields: HashSet::new(),
            coded_fields: HashMap::new(),
        }
    }

    pub fn from_catalog(
        config: &PipelineConfiguration,
        catalog: &AnalysisCatalog,
    ) -> AnResult<RecordSchema> {
        let mut schema = RecordSchema::new(config.uid_key(), config.consent_withdrawn_key());
        for plan in catalog
            .rqa_plans
            .iter()
            .chain(catalog.demog_plans.iter())
            .chain(catalog.survey_plans.iter())
        {
            if schema.coded_fields.contains_key(&plan.raw_field) {
                whatever!("field {} is both raw and coded", plan.raw_field);
            }
            schema.raw_fields.insert(plan.raw_field.clone());
            for cc in plan.coding_configurations.iter() {
                schema.add_coded_field(&cc.coded_field, cc.coding_mode)?;
            }
        }
        debug!(
            "RecordSchema::from_catalog: {} raw fields, {} coded fields",
            schema.raw_fields.len(),
            schema.coded_fields.len()
        );
        Ok(schema)
    }

    /// The same schema, also reading `field` as a coded field.
    pub fn with_coded_field(&self, field: &str, mode: CodingMode) -> AnResult<RecordSchema> {
        let mut res = self.clone();
        res.add_coded_field(field, mode)?;
        Ok(res)
    }

    fn add_coded_field(&mut self, field: &str, mode: CodingMode) -> AnResult<()> {
        if self.raw_fields.contains(field) {
            whatever!("field {} is both raw and coded", field);
        }
        match self.coded_fields.get(field) {
            Some(m) if *m != mode => {
                whatever!(
                    "field {} is coded both as {:?} and as {:?}",
                    field,
                    m,
                    mode
                )
            }
            Some(_) => {}
            None => {
                self.coded_fields.insert(field.to_string(), mode);
            }
        }
        Ok(())
    }

    fn parse_record(&self, js: &JSMap<String, JSValue>) -> Result<Record, String> {
        let uid = match js.get(&self.uid_key) {
            Some(JSValue::String(s)) => s.clone(),
            Some(JSValue::Number(n)) => n.to_string(),
            _ => return Err(format!("missing or invalid uid field {}", self.uid_key)),
        };
        let consent_withdrawn = match js.get(&self.consent_withdrawn_key) {
            Some(JSValue::Bool(b)) => *b,
            Some(JSValue::String(s)) if s == "true" => true,
            Some(JSValue::String(s)) if s == "false" => false,
            x => {
                return Err(format!(
                    "{}: invalid consent field {}: {:?}",
                    uid, self.consent_withdrawn_key, x
                ))
            }
        };

        let mut fields: BTreeMap<String, FieldValue> = BTreeMap::new();
        for (key, value) in js.iter() {
            if value.is_null() {
                continue;
            }
            if self.raw_fields.contains(key) {
                let text = match value {
                    JSValue::String(s) => s.clone(),
                    JSValue::Number(n) => n.to_string(),
                    JSValue::Bool(b) => b.to_string(),
                    _ => return Err(format!("{}: field {} is not a text", uid, key)),
                };
                fields.insert(key.clone(), FieldValue::Text(text));
            } else if let Some(mode) = self.coded_fields.get(key) {
                let fv = match (mode, value) {
                    (CodingMode::Single, JSValue::Object(_)) => FieldValue::Single(parse_label(value)?),
                    (CodingMode::Multiple, JSValue::Array(elts)) => {
                        let mut labels: Vec<Label> = Vec::new();
                        for elt in elts.iter() {
                            labels.push(parse_label(elt)?);
                        }
                        FieldValue::Multiple(labels)
                    }
                    _ => {
                        return Err(format!(
                            "{}: field {} does not hold a {:?} coding",
                            uid, key, mode
                        ))
                    }
                };
                fields.insert(key.clone(), fv);
            }
        }
        Ok(Record {
            uid,
            consent_withdrawn,
            fields,
        })
    }
}

fn parse_label(js: &JSValue) -> Result<Label, String> {
    match js.get("CodeID") {
        Some(JSValue::String(s)) => Ok(Label { code_id: s.clone() }),
        _ => Err(format!("label without a CodeID: {}", js)),
    }
}

/// Reads a dataset. Empty lines are skipped and unknown keys are ignored.
pub fn read_records(path: &str, schema: &RecordSchema) -> AnResult<Vec<Record>> {
    let f = File::open(path).context(OpeningFileSnafu { path })?;
    let reader = BufReader::new(f);
    let mut res: Vec<Record> = Vec::new();
    for (idx, line_r) in reader.lines().enumerate() {
        let lineno = idx + 1;
        let line = line_r.context(OpeningFileSnafu { path })?;
        if line.trim().is_empty() {
            continue;
        }
        let js: JSMap<String, JSValue> =
            serde_json::from_str(&line).context(ParsingJsonSnafu { path })?;
        match schema.parse_record(&js) {
            Ok(r) => res.push(r),
            Err(message) => {
                return InvalidRecordSnafu {
                    path,
                    lineno,
                    message,
                }
                .fail()
            }
        }
    }
    debug!("read_records: {}: {} records", path, res.len());
    Ok(res)
}
