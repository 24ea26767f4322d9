// The uid lookup table and the contact lists.

use std::collections::HashMap;

use crate::analysis::io_csv::create_writer;
use crate::analysis::*;

/// A lookup table stored as a JSON object from uid to phone number.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FileContactDirectory {
    table: HashMap<String, String>,
}

impl FileContactDirectory {
    pub fn open(path: &str) -> AnResult<FileContactDirectory> {
        let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
        let table: HashMap<String, String> =
            serde_json::from_str(&contents).context(ParsingJsonSnafu { path })?;
        info!("Loaded {} entries from the uid table {}", table.len(), path);
        Ok(FileContactDirectory { table })
    }
}

impl ContactDirectory for FileContactDirectory {
    fn lookup_batch(&self, uids: &[String]) -> HashMap<String, String> {
        uids.iter()
            .filter_map(|uid| self.table.get(uid).map(|n| (uid.clone(), n.clone())))
            .collect()
    }
}

/// A JSON list of uids.
pub fn read_exclusion_list(path: &str) -> AnResult<Vec<String>> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    serde_json::from_str(&contents).context(ParsingJsonSnafu { path })
}

/// Writes the URNs in the format of the messaging platform's contact import.
pub fn write_contacts(path: &str, urns: &BTreeSet<String>) -> AnResult<()> {
    let mut wtr = create_writer(path)?;
    wtr.write_record(["URN:Tel", "Name"])
        .context(WritingCsvSnafu { path })?;
    for urn in urns.iter() {
        wtr.write_record([urn.as_str(), ""])
            .context(WritingCsvSnafu { path })?;
    }
    wtr.flush().context(WritingFileSnafu { path })?;
    Ok(())
}
