use text_diff::print_diff;

use crate::analysis::*;

/// Compares a written table with its reference. Differences are printed.
pub fn check_reference(out_path: &str, ref_path: &str) -> AnResult<bool> {
    let computed = fs::read_to_string(out_path).context(OpeningFileSnafu { path: out_path })?;
    let reference = fs::read_to_string(ref_path).context(OpeningFileSnafu { path: ref_path })?;
    if computed == reference {
        debug!("check_reference: {} matches {}", out_path, ref_path);
        return Ok(true);
    }
    warn!("Found differences with the reference table {}", ref_path);
    print_diff(reference.as_str(), computed.as_str(), "\n");
    Ok(false)
}

/// Checks every named table of `out_dir` against the file of the same name in `reference_dir`.
pub fn check_references(out_dir: &str, reference_dir: &str, names: &[&str]) -> AnResult<()> {
    let mut mismatches: Vec<&str> = Vec::new();
    for name in names.iter().cloned() {
        let out_p = Path::new(out_dir).join(name);
        let ref_p = Path::new(reference_dir).join(name);
        if !check_reference(&out_p.display().to_string(), &ref_p.display().to_string())? {
            mismatches.push(name);
        }
    }
    if !mismatches.is_empty() {
        whatever!(
            "Difference detected between the computed tables and the reference: {:?}",
            mismatches
        )
    }
    info!("All tables match the reference in {}", reference_dir);
    Ok(())
}
