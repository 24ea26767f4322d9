use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};
use survey_stats::contacts::*;
use survey_stats::sampling::sample_messages;
use survey_stats::*;

use rand::rngs::StdRng;
use rand::{thread_rng, SeedableRng};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::analysis::config_reader::*;
use crate::analysis::io_common::*;
use crate::analysis::io_contacts::*;
use crate::analysis::io_csv::*;
use crate::analysis::io_jsonl::*;

pub mod config_reader;
mod io_common;
mod io_contacts;
mod io_csv;
mod io_jsonl;

#[derive(Debug, Snafu)]
pub enum AnalysisError {
    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("{path}, line {lineno}: {message}"))]
    InvalidRecord {
        path: String,
        lineno: usize,
        message: String,
    },
    #[snafu(display("Error writing CSV file {path}"))]
    WritingCsv { source: csv::Error, path: String },
    #[snafu(display("Analysis failed: {source}"))]
    Engine { source: AnalysisErrors },
    #[snafu(display("Missing parent directory of {path}"))]
    MissingParentDir { path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type AnResult<T> = Result<T, AnalysisError>;
pub type BAnResult<T> = Result<T, Box<AnalysisError>>;

/// The tables that do not depend on the random sample, checked against references.
const DETERMINISTIC_TABLES: [&str; 5] = [
    ENGAGEMENT_COUNTS_FILE,
    REPEAT_PARTICIPATIONS_FILE,
    DEMOGRAPHIC_DISTRIBUTIONS_FILE,
    THEME_DISTRIBUTIONS_FILE,
    THEMES_BY_GENDER_FILE,
];

/// A loaded season: the catalog and the settings that come with it.
struct Season {
    config: PipelineConfiguration,
    catalog: AnalysisCatalog,
    options: AnalysisOptions,
    schema: RecordSchema,
}

fn load_season(config_path: &str) -> BAnResult<Season> {
    let config = read_pipeline_configuration(config_path)?;
    info!("Pipeline name is {}", config.pipeline_name);
    let root_p = Path::new(config_path)
        .parent()
        .context(MissingParentDirSnafu { path: config_path })?;
    let catalog = validate_catalog(&config, root_p)?;
    let options = analysis_options(&config);
    let schema = RecordSchema::from_catalog(&config, &catalog)?;
    debug!("load_season: options: {:?}", options);
    Ok(Season {
        config,
        catalog,
        options,
        schema,
    })
}

/// Runs every pass over a season and writes the tables to `out_dir`.
///
/// If a reference directory is given, the deterministic tables are compared
/// with the files of the same name and any difference is an error.
pub fn run_analysis(
    config_path: &str,
    messages_path: &str,
    individuals_path: &str,
    out_dir: &str,
    reference_dir: Option<String>,
    sample_seed: Option<u64>,
) -> BAnResult<()> {
    let season = load_season(config_path)?;
    let catalog = &season.catalog;

    info!("Loading the messages dataset from {}...", messages_path);
    let messages = read_records(messages_path, &season.schema)?;
    info!("Loaded {} messages", messages.len());
    info!("Loading the individuals dataset from {}...", individuals_path);
    let individuals = read_records(individuals_path, &season.schema)?;
    info!("Loaded {} individuals", individuals.len());

    fs::create_dir_all(out_dir).context(WritingFileSnafu { path: out_dir })?;
    let out = |name: &str| -> String {
        let p: PathBuf = [out_dir, name].iter().collect();
        p.display().to_string()
    };

    let engagement = engagement_counts(&messages, &individuals, catalog).context(EngineSnafu)?;
    write_engagement_counts(&out(ENGAGEMENT_COUNTS_FILE), &engagement)?;

    let repeats = repeat_participations(&individuals, catalog).context(EngineSnafu)?;
    write_repeat_participations(&out(REPEAT_PARTICIPATIONS_FILE), &repeats)?;

    let demographics = demographic_distributions(&individuals, catalog).context(EngineSnafu)?;
    write_demographic_distributions(&out(DEMOGRAPHIC_DISTRIBUTIONS_FILE), &demographics)?;

    let themes = theme_distributions(&individuals, catalog).context(EngineSnafu)?;
    write_theme_distributions(&out(THEME_DISTRIBUTIONS_FILE), &themes)?;

    let by_gender = gender_cross_cut(&themes, catalog, &season.options).context(EngineSnafu)?;
    write_themes_by_gender(&out(THEMES_BY_GENDER_FILE), &by_gender)?;

    info!(
        "Exporting samples of up to {} messages for each code...",
        season.options.sample_size
    );
    let samples = match sample_seed {
        Some(seed) => sample_messages(
            &messages,
            catalog,
            season.options.sample_size,
            &mut StdRng::seed_from_u64(seed),
        ),
        None => sample_messages(
            &messages,
            catalog,
            season.options.sample_size,
            &mut thread_rng(),
        ),
    }
    .context(EngineSnafu)?;
    write_sample_messages(&out(SAMPLE_MESSAGES_FILE), &samples)?;

    if let Some(reference) = reference_dir {
        check_references(out_dir, &reference, &DETERMINISTIC_TABLES)?;
    }
    Ok(())
}

fn contact_directory(season: &Season, config_path: &str) -> AnResult<FileContactDirectory> {
    let p = uuid_table_path(&season.config, config_path)?;
    FileContactDirectory::open(&p.display().to_string())
}

fn export_contacts(
    uids: &BTreeSet<String>,
    directory: &FileContactDirectory,
    out_path: &str,
) -> BAnResult<()> {
    let res = reidentify(uids, directory);
    warn!(
        "Exporting {} phone numbers to {}...",
        res.urns.len(),
        out_path
    );
    write_contacts(out_path, &res.urns)?;
    info!(
        "Wrote {} contacts to {} ({} uids could not be re-identified)",
        res.urns.len(),
        out_path,
        res.skipped.len()
    );
    Ok(())
}

/// Exports the contacts of the participants labelled with one of the target locations.
pub fn run_location_contacts(
    config_path: &str,
    scheme_path: &str,
    coded_field: &str,
    targets: &[String],
    inputs: &[String],
    out_path: &str,
) -> BAnResult<()> {
    let season = load_season(config_path)?;
    info!("Loading code scheme from {}...", scheme_path);
    let scheme = read_code_scheme(scheme_path)?;
    let schema = season
        .schema
        .with_coded_field(coded_field, CodingMode::Single)?;
    let targets: BTreeSet<String> = targets.iter().cloned().collect();
    let directory = contact_directory(&season, config_path)?;

    let mut selection = LocationSelection::default();
    for path in inputs.iter() {
        info!("Loading previous records from file '{}'...", path);
        let records = read_records(path, &schema)?;
        info!("Loaded {} records", records.len());
        info!(
            "Searching for participants from the target locations ({:?})...",
            targets
        );
        let found = select_by_location(&mut selection, &records, &scheme, coded_field, &targets)
            .context(EngineSnafu)?;
        info!(
            "Found {} contacts in the target locations (per-location counts: {:?})",
            found.uids.len(),
            found.counts
        );
        info!(
            "Running total: {} (per-location counts: {:?})",
            selection.uids.len(),
            selection.counts
        );
    }
    export_contacts(&selection.uids, &directory, out_path)
}

/// Exports the contacts of every participant who did not opt out, minus an exclusion list.
pub fn run_ad_contacts(
    config_path: &str,
    exclusion_list_path: Option<String>,
    inputs: &[String],
    out_path: &str,
) -> BAnResult<()> {
    let season = load_season(config_path)?;
    let directory = contact_directory(&season, config_path)?;

    let mut uids: BTreeSet<String> = BTreeSet::new();
    for path in inputs.iter() {
        info!("Loading previous records from file '{}'...", path);
        let records = read_records(path, &season.schema)?;
        info!("Loaded {} records", records.len());
        uids.extend(select_opted_in(&records));
    }
    info!("Loaded {} uids", uids.len());

    if let Some(p) = exclusion_list_path {
        info!("Loading the exclusion list from {}...", p);
        let exclusions = read_exclusion_list(&p)?;
        info!("Loaded {} uids to exclude", exclusions.len());
        remove_excluded(&mut uids, &exclusions);
    }
    export_contacts(&uids, &directory, out_path)
}
