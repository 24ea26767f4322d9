//! Predicates over records.
//!
//! None of the filters mutate their input: they return the records that pass.
//! A record that lacks the fields of a plan simply did not take part in it.

use crate::config::*;

/// The record did not withdraw consent and answered the question of the plan.
pub fn opt_in(record: &Record, plan: &CodingPlan) -> bool {
    !record.consent_withdrawn && record.has_field(&plan.raw_field)
}

/// The record opted in and every configuration of the plan carries a reviewed label.
pub fn labelled(record: &Record, plan: &CodingPlan) -> Result<bool, AnalysisErrors> {
    if !opt_in(record, plan) {
        return Ok(false);
    }
    for cc in plan.coding_configurations.iter() {
        let labels = match record.labels(cc)? {
            Some(ls) if !ls.is_empty() => ls,
            _ => return Ok(false),
        };
        let mut codes: Vec<&Code> = Vec::new();
        for l in labels {
            codes.push(cc.code_scheme.get_code(&l.code_id)?);
        }
        if codes[0].control_code == Some(ControlCode::NotReviewed) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// The record opted in and at least one of its labels is a normal code.
pub fn relevant(record: &Record, plan: &CodingPlan) -> Result<bool, AnalysisErrors> {
    if !opt_in(record, plan) {
        return Ok(false);
    }
    for cc in plan.coding_configurations.iter() {
        if let Some(labels) = record.labels(cc)? {
            for l in labels {
                if cc.code_scheme.get_code(&l.code_id)?.is_normal() {
                    return Ok(true);
                }
            }
        }
    }
    Ok(false)
}

/// Records that opted in to at least one of the plans.
pub fn filter_opt_ins<'a>(records: &'a [Record], plans: &[CodingPlan]) -> Vec<&'a Record> {
    records
        .iter()
        .filter(|r| plans.iter().any(|p| opt_in(r, p)))
        .collect()
}

/// Records labelled for all of the plans.
pub fn filter_fully_labelled<'a>(
    records: &'a [Record],
    plans: &[CodingPlan],
) -> Result<Vec<&'a Record>, AnalysisErrors> {
    let mut res: Vec<&Record> = Vec::new();
    for r in records.iter() {
        let mut all = true;
        for p in plans.iter() {
            if !labelled(r, p)? {
                all = false;
                break;
            }
        }
        if all {
            res.push(r);
        }
    }
    Ok(res)
}

/// Records labelled for at least one of the plans.
pub fn filter_partially_labelled<'a>(
    records: &'a [Record],
    plans: &[CodingPlan],
) -> Result<Vec<&'a Record>, AnalysisErrors> {
    filter_any(records, plans, labelled)
}

/// Records relevant to at least one of the plans.
pub fn filter_relevant<'a>(
    records: &'a [Record],
    plans: &[CodingPlan],
) -> Result<Vec<&'a Record>, AnalysisErrors> {
    filter_any(records, plans, relevant)
}

fn filter_any<'a>(
    records: &'a [Record],
    plans: &[CodingPlan],
    pred: fn(&Record, &CodingPlan) -> Result<bool, AnalysisErrors>,
) -> Result<Vec<&'a Record>, AnalysisErrors> {
    let mut res: Vec<&Record> = Vec::new();
    for r in records.iter() {
        for p in plans.iter() {
            if pred(r, p)? {
                res.push(r);
                break;
            }
        }
    }
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::RecordBuilder;
    use std::sync::Arc;

    fn scheme() -> Arc<CodeScheme> {
        Arc::new(CodeScheme::new(
            "Scheme-e01",
            "s01e01",
            vec![
                Code::normal("code-yes", "yes"),
                Code::normal("code-no", "no"),
                Code::control("code-nc", "NC", ControlCode::NotCoded),
                Code::control("code-nr", "NR", ControlCode::NotReviewed),
                Code::control("code-stop", "STOP", ControlCode::Stop),
            ],
        ))
    }

    fn plan(name: &str) -> CodingPlan {
        CodingPlan {
            dataset_name: name.to_string(),
            raw_field: format!("{}_raw", name),
            coding_configurations: vec![CodingConfiguration {
                coded_field: format!("{}_coded", name),
                code_scheme: scheme(),
                coding_mode: CodingMode::Multiple,
                analysis_file_key: Some(format!("{}_", name)),
            }],
        }
    }

    fn answered(uid: &str, name: &str, codes: &[&str]) -> RecordBuilder {
        RecordBuilder::new(uid)
            .raw(&format!("{}_raw", name), "some text")
            .multiple(&format!("{}_coded", name), codes)
    }

    #[test]
    fn opt_in_requires_consent_and_raw_field() {
        let p = plan("e01");
        let ok = answered("a", "e01", &["code-yes"]).build();
        let withdrawn = answered("b", "e01", &["code-yes"])
            .consent_withdrawn(true)
            .build();
        let absent = RecordBuilder::new("c").build();
        assert!(opt_in(&ok, &p));
        assert!(!opt_in(&withdrawn, &p));
        assert!(!opt_in(&absent, &p));
    }

    #[test]
    fn not_reviewed_is_not_labelled() {
        let p = plan("e01");
        let reviewed = answered("a", "e01", &["code-nc"]).build();
        let pending = answered("b", "e01", &["code-nr"]).build();
        let unlabelled = RecordBuilder::new("c").raw("e01_raw", "hi").build();
        assert_eq!(labelled(&reviewed, &p), Ok(true));
        assert_eq!(labelled(&pending, &p), Ok(false));
        assert_eq!(labelled(&unlabelled, &p), Ok(false));
    }

    #[test]
    fn relevance_needs_a_normal_code() {
        let p = plan("e01");
        let records = vec![
            answered("a", "e01", &["code-nc", "code-no"]).build(),
            answered("b", "e01", &["code-stop"]).build(),
            answered("c", "e01", &["code-nc"]).build(),
        ];
        let res = filter_relevant(&records, &[p]).unwrap();
        let uids: Vec<&str> = res.iter().map(|r| r.uid.as_str()).collect();
        assert_eq!(uids, vec!["a"]);
    }

    #[test]
    fn fully_and_partially_labelled() {
        let plans = vec![plan("e01"), plan("e02")];
        let records = vec![
            answered("a", "e01", &["code-yes"])
                .raw("e02_raw", "x")
                .multiple("e02_coded", &["code-no"])
                .build(),
            answered("b", "e01", &["code-yes"]).build(),
            RecordBuilder::new("c").build(),
        ];
        let full = filter_fully_labelled(&records, &plans).unwrap();
        let partial = filter_partially_labelled(&records, &plans).unwrap();
        assert_eq!(full.len(), 1);
        assert_eq!(partial.len(), 2);
        assert_eq!(filter_opt_ins(&records, &plans).len(), 2);
    }

    #[test]
    fn unknown_code_is_an_error() {
        let p = plan("e01");
        let records = vec![answered("a", "e01", &["code-missing"]).build()];
        assert_eq!(
            filter_relevant(&records, &[p]),
            Err(AnalysisErrors::UnknownCode {
                scheme: "s01e01".to_string(),
                code_id: "code-missing".to_string()
            })
        );
    }
}
