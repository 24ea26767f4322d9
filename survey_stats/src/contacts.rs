//! Selection of contacts to re-target.
//!
//! Participants are only known by their uid. Turning a uid back into a phone
//! number is the job of an external directory, reached through
//! [`ContactDirectory`].

use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::config::*;

/// A service that maps uids back to contact addresses.
pub trait ContactDirectory {
    /// Resolves as many uids as possible. Uids that cannot be resolved are absent from the result.
    fn lookup_batch(&self, uids: &[String]) -> HashMap<String, String>;
}

#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct LocationSelection {
    pub uids: BTreeSet<String>,
    /// Number of distinct uids found per target location.
    pub counts: BTreeMap<String, u64>,
}

/// Adds to `selection` the uids of the records located in one of the targets.
///
/// The location is read from a single-select coded field. Records coded as stop
/// and records that withdrew consent are never selected. Call it once per data
/// file to accumulate the selection across files. Returns what was found in
/// `records` alone, including uids already selected from earlier files.
pub fn select_by_location(
    selection: &mut LocationSelection,
    records: &[Record],
    scheme: &CodeScheme,
    coded_field: &str,
    targets: &BTreeSet<String>,
) -> Result<LocationSelection, AnalysisErrors> {
    let mut found = LocationSelection::default();
    for t in targets.iter() {
        selection.counts.entry(t.clone()).or_insert(0);
        found.counts.insert(t.clone(), 0);
    }
    for r in records.iter() {
        if r.consent_withdrawn {
            continue;
        }
        let label = match r.fields.get(coded_field) {
            Some(FieldValue::Single(l)) => l,
            Some(_) => {
                return Err(AnalysisErrors::FieldShapeMismatch {
                    uid: r.uid.clone(),
                    field: coded_field.to_string(),
                    expected: CodingMode::Single,
                })
            }
            None => continue,
        };
        let code = scheme.get_code(&label.code_id)?;
        if code.is_stop() || !targets.contains(&code.string_value) {
            continue;
        }
        if found.uids.insert(r.uid.clone()) {
            if let Some(c) = found.counts.get_mut(&code.string_value) {
                *c += 1;
            }
        }
        if selection.uids.insert(r.uid.clone()) {
            if let Some(c) = selection.counts.get_mut(&code.string_value) {
                *c += 1;
            }
        }
    }
    debug!(
        "select_by_location: {} contacts ({:?}), running total {} ({:?})",
        found.uids.len(),
        found.counts,
        selection.uids.len(),
        selection.counts
    );
    Ok(found)
}

/// The distinct uids of the records that did not withdraw consent.
pub fn select_opted_in(records: &[Record]) -> BTreeSet<String> {
    records
        .iter()
        .filter(|r| !r.consent_withdrawn)
        .map(|r| r.uid.clone())
        .collect()
}

/// Removes the excluded uids and returns how many were present.
pub fn remove_excluded(uids: &mut BTreeSet<String>, exclusions: &[String]) -> usize {
    let mut removed = 0;
    for uid in exclusions {
        if uids.remove(uid) {
            removed += 1;
        }
    }
    info!("Removed {} uids; {} remain", removed, uids.len());
    removed
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Reidentified {
    /// Contact URNs, `+` followed by the number.
    pub urns: BTreeSet<String>,
    pub skipped: BTreeSet<String>,
}

/// Converts uids to URNs. Uids the directory does not know are skipped and reported.
pub fn reidentify<D: ContactDirectory + ?Sized>(uids: &BTreeSet<String>, directory: &D) -> Reidentified {
    info!("Converting {} uids to phone numbers...", uids.len());
    let batch: Vec<String> = uids.iter().cloned().collect();
    let lut = directory.lookup_batch(&batch);
    let mut urns: BTreeSet<String> = BTreeSet::new();
    let mut skipped: BTreeSet<String> = BTreeSet::new();
    for uid in uids.iter() {
        match lut.get(uid) {
            Some(number) => {
                urns.insert(format!("+{}", number.trim_start_matches('+')));
            }
            None => {
                skipped.insert(uid.clone());
            }
        }
    }
    info!("Successfully converted {} uids to phone numbers.", urns.len());
    if !skipped.is_empty() {
        warn!("Unable to re-identify {} uids", skipped.len());
    }
    Reidentified { urns, skipped }
}
