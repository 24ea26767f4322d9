// Writing the output tables.

use std::fs::File;

use csv::{Terminator, Writer, WriterBuilder};

use crate::analysis::*;

pub const ENGAGEMENT_COUNTS_FILE: &str = "engagement_counts.csv";
pub const REPEAT_PARTICIPATIONS_FILE: &str = "repeat_participations.csv";
pub const DEMOGRAPHIC_DISTRIBUTIONS_FILE: &str = "demographic_distributions.csv";
pub const THEME_DISTRIBUTIONS_FILE: &str = "theme_distributions.csv";
pub const THEMES_BY_GENDER_FILE: &str = "themes_by_gender.csv";
pub const SAMPLE_MESSAGES_FILE: &str = "sample_messages.csv";

const NOT_AVAILABLE: &str = "-";

pub fn create_writer(path: &str) -> AnResult<Writer<File>> {
    WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_path(path)
        .context(WritingCsvSnafu { path })
}

fn write_rows(path: &str, headers: &[String], rows: &[Vec<String>]) -> AnResult<()> {
    let mut wtr = create_writer(path)?;
    wtr.write_record(headers).context(WritingCsvSnafu { path })?;
    for row in rows.iter() {
        wtr.write_record(row).context(WritingCsvSnafu { path })?;
    }
    wtr.flush().context(WritingFileSnafu { path })?;
    info!("Wrote {} rows to {}", rows.len(), path);
    Ok(())
}

fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn count_or_dash(x: Option<u64>) -> String {
    match x {
        Some(c) => c.to_string(),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Blank on every row of a block except the first.
fn block_label(label: &str, last_label: &mut Option<String>) -> String {
    if last_label.as_deref() == Some(label) {
        String::new()
    } else {
        *last_label = Some(label.to_string());
        label.to_string()
    }
}

pub fn write_engagement_counts(path: &str, rows: &[EngagementCounts]) -> AnResult<()> {
    let hs = headers(&[
        "Episode",
        "Total Messages",
        "Total Messages with Opt-Ins",
        "Total Labelled Messages",
        "Total Relevant Messages",
        "Total Participants",
        "Total Participants with Opt-Ins",
        "Total Relevant Participants",
    ]);
    let rs: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            vec![
                r.episode.clone(),
                count_or_dash(r.total_messages),
                r.opt_in_messages.to_string(),
                r.labelled_messages.to_string(),
                r.relevant_messages.to_string(),
                count_or_dash(r.total_participants),
                r.opt_in_participants.to_string(),
                r.relevant_participants.to_string(),
            ]
        })
        .collect();
    write_rows(path, &hs, &rs)
}

pub fn write_repeat_participations(path: &str, rows: &[RepeatParticipation]) -> AnResult<()> {
    let hs = headers(&[
        "Episodes Participated In",
        "Number of Individuals",
        "% of Individuals",
    ]);
    let rs: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            vec![
                r.episodes_participated_in.to_string(),
                r.individuals.to_string(),
                r.percent.to_string(),
            ]
        })
        .collect();
    write_rows(path, &hs, &rs)
}

pub fn write_demographic_distributions(
    path: &str,
    distributions: &[DemographicDistribution],
) -> AnResult<()> {
    let hs = headers(&["Demographic", "Code", "Participants with Opt-Ins", "Percent"]);
    let mut rs: Vec<Vec<String>> = Vec::new();
    for d in distributions.iter() {
        let mut last: Option<String> = None;
        for row in d.rows.iter() {
            rs.push(vec![
                block_label(&d.analysis_key, &mut last),
                row.code.string_value.clone(),
                row.participants.to_string(),
                row.percent.to_string(),
            ]);
        }
    }
    write_rows(path, &hs, &rs)
}

fn push_tally(row: &mut Vec<String>, t: &Tally) {
    row.push(t.count.to_string());
    row.push(t.percent.to_string());
}

pub fn write_theme_distributions(path: &str, distributions: &ThemeDistributions) -> AnResult<()> {
    let mut hs = headers(&[
        "Question",
        "Variable",
        "Total Participants",
        "Total Participants %",
    ]);
    for col in distributions.columns.iter() {
        hs.push(col.name());
        hs.push(format!("{} %", col.name()));
    }

    let mut rs: Vec<Vec<String>> = Vec::new();
    let mut last: Option<String> = None;
    for episode in distributions.episodes.iter() {
        for theme in episode.themes.iter() {
            let mut row = vec![block_label(&episode.episode, &mut last), theme.theme.clone()];
            push_tally(&mut row, &theme.counts.total);
            for cell in theme.counts.cells.iter() {
                push_tally(&mut row, cell);
            }
            rs.push(row);
        }
    }
    write_rows(path, &hs, &rs)
}

pub fn write_themes_by_gender(path: &str, rows: &[ThemeGenderCount]) -> AnResult<()> {
    let hs = headers(&[
        "Episode",
        "RQA Theme",
        "Gender",
        "Number of Participants",
        "Fraction of Relevant Participants",
    ]);
    let rs: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            vec![
                r.episode.clone(),
                r.theme.clone(),
                r.gender.clone(),
                r.participants.to_string(),
                r.fraction.map(|f| format!("{:?}", f)).unwrap_or_default(),
            ]
        })
        .collect();
    write_rows(path, &hs, &rs)
}

pub fn write_sample_messages(path: &str, samples: &[SampleMessage]) -> AnResult<()> {
    let hs = headers(&["Episode", "Code Scheme", "Code", "Sample Message"]);
    let rs: Vec<Vec<String>> = samples
        .iter()
        .map(|s| {
            vec![
                s.episode.clone(),
                s.code_scheme.clone(),
                s.code.clone(),
                s.message.clone(),
            ]
        })
        .collect();
    write_rows(path, &hs, &rs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_and_read<F: Fn(&str) -> AnResult<()>>(f: F) -> String {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("table.csv").display().to_string();
        f(&p).unwrap();
        fs::read_to_string(&p).unwrap()
    }

    #[test]
    fn engagement_counts_table() {
        let rows = vec![
            EngagementCounts {
                episode: "s01e01".to_string(),
                total_messages: None,
                opt_in_messages: 3,
                labelled_messages: 2,
                relevant_messages: 1,
                total_participants: None,
                opt_in_participants: 2,
                relevant_participants: 1,
            },
            EngagementCounts {
                episode: "Total".to_string(),
                total_messages: Some(4),
                opt_in_messages: 3,
                labelled_messages: 2,
                relevant_messages: 1,
                total_participants: Some(3),
                opt_in_participants: 2,
                relevant_participants: 1,
            },
        ];
        let content = write_and_read(|p| write_engagement_counts(p, &rows));
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "s01e01,-,3,2,1,-,2,1");
        assert_eq!(lines[2], "Total,4,3,2,1,3,2,1");
        assert!(content.ends_with("1\n"));
        assert!(!content.contains('\r'));
    }

    #[test]
    fn demographic_name_on_first_row() {
        let dist = vec![DemographicDistribution {
            analysis_key: "gender".to_string(),
            total_relevant: 3,
            rows: vec![
                DemographicRow {
                    code: Code::normal("code-female", "female"),
                    participants: 2,
                    percent: Percentage::of(2, 3),
                },
                DemographicRow {
                    code: Code::normal("code-male", "male"),
                    participants: 1,
                    percent: Percentage::of(1, 3),
                },
                DemographicRow {
                    code: Code::control("code-na", "NA", ControlCode::TrueMissing),
                    participants: 4,
                    percent: Percentage::Blank,
                },
            ],
        }];
        let content = write_and_read(|p| write_demographic_distributions(p, &dist));
        assert_eq!(
            content,
            "Demographic,Code,Participants with Opt-Ins,Percent\n\
             gender,female,2,66.7\n\
             ,male,1,33.3\n\
             ,NA,4,\n"
        );
    }

    #[test]
    fn fractions() {
        let rows = vec![
            ThemeGenderCount {
                episode: "rqa_s01e01_raw".to_string(),
                theme: "masks".to_string(),
                gender: "female".to_string(),
                participants: 1,
                fraction: Some(0.5),
            },
            ThemeGenderCount {
                episode: "rqa_s01e01_raw".to_string(),
                theme: "masks".to_string(),
                gender: "other".to_string(),
                participants: 2,
                fraction: Some(1.0),
            },
            ThemeGenderCount {
                episode: "rqa_s01e01_raw".to_string(),
                theme: "masks".to_string(),
                gender: "male".to_string(),
                participants: 0,
                fraction: None,
            },
        ];
        let content = write_and_read(|p| write_themes_by_gender(p, &rows));
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[1], "rqa_s01e01_raw,masks,female,1,0.5");
        assert_eq!(lines[2], "rqa_s01e01_raw,masks,other,2,1.0");
        assert_eq!(lines[3], "rqa_s01e01_raw,masks,male,0,");
    }
}
