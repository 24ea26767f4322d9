mod config;
use log::{debug, info, warn};

use std::collections::{HashMap, HashSet};
use std::slice;

pub use crate::config::*;

pub mod builder;
pub mod contacts;
pub mod filters;
pub mod manual;
pub mod sampling;

use crate::filters::*;

/// Name of the theme row that counts every relevant participant of an episode once.
pub const TOTAL_RELEVANT_PARTICIPANTS: &str = "Total Relevant Participants";

// **** Engagement ****

/// Counts messages and participants for every episode, followed by a `Total` row.
///
/// The totals over all messages and participants are only reported for the
/// whole season.
pub fn engagement_counts(
    messages: &[Record],
    individuals: &[Record],
    catalog: &AnalysisCatalog,
) -> Result<Vec<EngagementCounts>, AnalysisErrors> {
    info!(
        "Computing the engagement counts of {} messages and {} individuals over {} episodes",
        messages.len(),
        individuals.len(),
        catalog.rqa_plans.len()
    );
    let mut res: Vec<EngagementCounts> = Vec::new();
    for plan in catalog.rqa_plans.iter() {
        let plans = slice::from_ref(plan);
        let row = EngagementCounts {
            episode: plan.dataset_name.clone(),
            total_messages: None,
            opt_in_messages: filter_opt_ins(messages, plans).len() as u64,
            labelled_messages: filter_fully_labelled(messages, plans)?.len() as u64,
            relevant_messages: filter_relevant(messages, plans)?.len() as u64,
            total_participants: None,
            opt_in_participants: filter_opt_ins(individuals, plans).len() as u64,
            relevant_participants: filter_relevant(individuals, plans)?.len() as u64,
        };
        debug!("engagement_counts: {:?}", row);
        res.push(row);
    }

    let plans = catalog.rqa_plans.as_slice();
    res.push(EngagementCounts {
        episode: "Total".to_string(),
        total_messages: Some(messages.len() as u64),
        opt_in_messages: filter_opt_ins(messages, plans).len() as u64,
        labelled_messages: filter_partially_labelled(messages, plans)?.len() as u64,
        relevant_messages: filter_relevant(messages, plans)?.len() as u64,
        total_participants: Some(individuals.len() as u64),
        opt_in_participants: filter_opt_ins(individuals, plans).len() as u64,
        relevant_participants: filter_relevant(individuals, plans)?.len() as u64,
    });
    Ok(res)
}

/// Buckets the individuals who did not withdraw consent by the number of
/// episodes they sent a message to, from 1 to the number of episodes.
///
/// Relevance does not matter here: sending a message is enough.
pub fn repeat_participations(
    individuals: &[Record],
    catalog: &AnalysisCatalog,
) -> Result<Vec<RepeatParticipation>, AnalysisErrors> {
    info!("Computing the participation frequencies...");
    let num_episodes = catalog.rqa_plans.len();
    let mut buckets: Vec<u64> = vec![0; num_episodes];
    let mut total_individuals: u64 = 0;
    for ind in individuals.iter().filter(|ind| !ind.consent_withdrawn) {
        let participated = catalog
            .rqa_plans
            .iter()
            .filter(|p| ind.has_field(&p.raw_field))
            .count();
        if participated == 0 {
            return Err(AnalysisErrors::NoParticipation {
                uid: ind.uid.clone(),
            });
        }
        buckets[participated - 1] += 1;
        total_individuals += 1;
    }

    Ok(buckets
        .iter()
        .enumerate()
        .map(|(idx, count)| RepeatParticipation {
            episodes_participated_in: idx + 1,
            individuals: *count,
            percent: Percentage::of(*count, total_individuals),
        })
        .collect())
}

// **** Demographics ****

/// Counts the demographic codes of the individuals who did not withdraw consent.
///
/// Stop codes are not reported: everyone who opted out has already been
/// excluded, and a zero row would read as if nobody had. Percentages are only
/// computed for normal codes, relative to the individuals with a normal code.
pub fn demographic_distributions(
    individuals: &[Record],
    catalog: &AnalysisCatalog,
) -> Result<Vec<DemographicDistribution>, AnalysisErrors> {
    info!("Computing the demographic distributions...");
    let configurations: Vec<(&String, &CodingConfiguration)> = catalog
        .demog_plans
        .iter()
        .flat_map(|p| p.coding_configurations.iter())
        .filter_map(|cc| cc.analysis_file_key.as_ref().map(|k| (k, cc)))
        .collect();

    for (_, cc) in configurations.iter() {
        if cc.coding_mode != CodingMode::Single {
            return Err(AnalysisErrors::UnsupportedCodingMode {
                pass: "demographic_distributions",
                coded_field: cc.coded_field.clone(),
                mode: cc.coding_mode,
            });
        }
    }

    // Fully populated before the scan, in scheme order.
    let mut tallies: Vec<(Vec<(&Code, u64)>, u64)> = configurations
        .iter()
        .map(|(_, cc)| {
            (
                cc.code_scheme.reportable_codes().map(|c| (c, 0)).collect(),
                0,
            )
        })
        .collect();

    for ind in individuals.iter().filter(|ind| !ind.consent_withdrawn) {
        for ((_, cc), (counts, total_relevant)) in configurations.iter().zip(tallies.iter_mut()) {
            for code in ind.codes(cc)? {
                if code.is_stop() {
                    debug!(
                        "demographic_distributions: {}: skipping stop code in {}",
                        ind.uid, cc.coded_field
                    );
                    continue;
                }
                if let Some((_, count)) = counts.iter_mut().find(|(c, _)| c.code_id == code.code_id) {
                    *count += 1;
                }
                if code.is_normal() {
                    *total_relevant += 1;
                }
            }
        }
    }

    Ok(configurations
        .iter()
        .zip(tallies.into_iter())
        .map(|((key, _), (counts, total_relevant))| DemographicDistribution {
            analysis_key: key.to_string(),
            total_relevant,
            rows: counts
                .into_iter()
                .map(|(code, participants)| DemographicRow {
                    code: code.clone(),
                    participants,
                    percent: if code.is_normal() {
                        Percentage::of(participants, total_relevant)
                    } else {
                        Percentage::Blank
                    },
                })
                .collect(),
        })
        .collect())
}

// **** Themes ****

/// The survey columns shared by every theme row.
struct SurveyLayout<'a> {
    columns: Vec<SurveyColumn>,
    configurations: Vec<&'a CodingConfiguration>,
    // (analysis key, code id) -> column
    index: HashMap<(&'a str, &'a str), usize>,
}

impl<'a> SurveyLayout<'a> {
    fn new(plans: &'a [CodingPlan]) -> SurveyLayout<'a> {
        let mut columns: Vec<SurveyColumn> = Vec::new();
        let mut configurations: Vec<&CodingConfiguration> = Vec::new();
        let mut index: HashMap<(&str, &str), usize> = HashMap::new();
        for cc in plans.iter().flat_map(|p| p.coding_configurations.iter()) {
            let key = match cc.analysis_file_key.as_deref() {
                Some(k) => k,
                None => continue,
            };
            configurations.push(cc);
            for code in cc.code_scheme.reportable_codes() {
                index.insert((key, code.code_id.as_str()), columns.len());
                columns.push(SurveyColumn {
                    analysis_key: key.to_string(),
                    string_value: code.string_value.clone(),
                });
            }
        }
        SurveyLayout {
            columns,
            configurations,
            index,
        }
    }

    fn empty_counts(&self) -> SurveyCounts {
        SurveyCounts {
            total: Tally::EMPTY,
            cells: vec![Tally::EMPTY; self.columns.len()],
        }
    }

    /// Adds one participant and their survey answers to a row.
    fn add_participant(&self, row: &mut SurveyCounts, ind: &Record) -> Result<(), AnalysisErrors> {
        row.total.count += 1;
        for cc in self.configurations.iter() {
            let key = cc.theme_prefix();
            for code in ind.codes(cc)? {
                if code.is_stop() {
                    continue;
                }
                if let Some(idx) = self.index.get(&(key, code.code_id.as_str())) {
                    row.cells[*idx].count += 1;
                }
            }
        }
        Ok(())
    }
}

fn set_survey_percentages(row: &mut SurveyCounts, totals: &SurveyCounts) {
    row.total.percent = Percentage::of(row.total.count, totals.total.count);
    for (cell, total) in row.cells.iter_mut().zip(totals.cells.iter()) {
        cell.percent = Percentage::of(cell.count, total.count);
    }
}

/// Cross-tabulates, for every episode, each theme against the survey answers of
/// the participants who mentioned it.
///
/// Every individual who did not withdraw consent contributes once to each
/// theme they were labelled with, stop codes excepted. Individuals with at least
/// one normal theme also contribute once to the `Total Relevant Participants`
/// row, which is the denominator of the percentages of the normal themes.
pub fn theme_distributions(
    individuals: &[Record],
    catalog: &AnalysisCatalog,
) -> Result<ThemeDistributions, AnalysisErrors> {
    info!("Computing the theme distributions...");
    let layout = SurveyLayout::new(&catalog.survey_plans);
    debug!(
        "theme_distributions: {} survey columns",
        layout.columns.len()
    );

    let mut episodes: Vec<EpisodeThemes> = Vec::new();
    for plan in catalog.rqa_plans.iter() {
        for cc in plan.coding_configurations.iter() {
            if cc.coding_mode != CodingMode::Multiple {
                return Err(AnalysisErrors::UnsupportedCodingMode {
                    pass: "theme_distributions",
                    coded_field: cc.coded_field.clone(),
                    mode: cc.coding_mode,
                });
            }
        }

        let mut themes: Vec<ThemeRow> = vec![ThemeRow {
            theme: TOTAL_RELEVANT_PARTICIPANTS.to_string(),
            counts: layout.empty_counts(),
        }];
        let mut theme_index: HashMap<String, usize> = HashMap::new();
        for cc in plan.coding_configurations.iter() {
            for code in cc.code_scheme.reportable_codes() {
                let name = format!("{}{}", cc.theme_prefix(), code.string_value);
                if theme_index.contains_key(&name) {
                    continue;
                }
                theme_index.insert(name.clone(), themes.len());
                themes.push(ThemeRow {
                    theme: name,
                    counts: layout.empty_counts(),
                });
            }
        }

        for ind in individuals.iter().filter(|ind| !ind.consent_withdrawn) {
            let mut relevant_participant = false;
            for cc in plan.coding_configurations.iter() {
                for code in ind.codes(cc)? {
                    if code.is_stop() {
                        continue;
                    }
                    let name = format!("{}{}", cc.theme_prefix(), code.string_value);
                    if let Some(idx) = theme_index.get(&name) {
                        layout.add_participant(&mut themes[*idx].counts, ind)?;
                    }
                    if code.is_normal() {
                        relevant_participant = true;
                    }
                }
            }
            if relevant_participant {
                layout.add_participant(&mut themes[0].counts, ind)?;
            }
        }

        let totals = themes[0].counts.clone();
        set_survey_percentages(&mut themes[0].counts, &totals);
        let mut normal_themes: HashSet<usize> = HashSet::new();
        for cc in plan.coding_configurations.iter() {
            for code in cc.code_scheme.codes.iter().filter(|c| c.is_normal()) {
                let name = format!("{}{}", cc.theme_prefix(), code.string_value);
                if let Some(idx) = theme_index.get(&name) {
                    normal_themes.insert(*idx);
                }
            }
        }
        for idx in normal_themes {
            set_survey_percentages(&mut themes[idx].counts, &totals);
        }

        info!(
            "Episode {}: {} relevant participants, {} themes",
            plan.raw_field,
            totals.total.count,
            themes.len() - 1
        );
        episodes.push(EpisodeThemes {
            episode: plan.raw_field.clone(),
            themes,
        });
    }

    Ok(ThemeDistributions {
        columns: layout.columns,
        episodes,
    })
}

/// Breaks the normal themes of every episode down by gender.
///
/// The fraction is relative to the relevant participants of the same gender in
/// the episode, and `None` when there are none. Umbrella themes are left out.
pub fn gender_cross_cut(
    distributions: &ThemeDistributions,
    catalog: &AnalysisCatalog,
    options: &AnalysisOptions,
) -> Result<Vec<ThemeGenderCount>, AnalysisErrors> {
    info!("Computing the normal themes by gender...");
    let gender_key = options.gender_analysis_key.as_str();
    let gender_cc = catalog
        .survey_plans
        .iter()
        .flat_map(|p| p.coding_configurations.iter())
        .find(|cc| cc.analysis_file_key.as_deref() == Some(gender_key))
        .ok_or_else(|| AnalysisErrors::UnknownAnalysisKey {
            key: gender_key.to_string(),
        })?;

    let gender_columns: Vec<(&Code, usize)> = gender_cc
        .code_scheme
        .codes
        .iter()
        .filter(|c| c.is_normal())
        .filter_map(|c| {
            distributions
                .columns
                .iter()
                .position(|col| col.analysis_key == gender_key && col.string_value == c.string_value)
                .map(|idx| (c, idx))
        })
        .collect();

    let mut res: Vec<ThemeGenderCount> = Vec::new();
    for plan in catalog.rqa_plans.iter() {
        let episode = match distributions
            .episodes
            .iter()
            .find(|e| e.episode == plan.raw_field)
        {
            Some(e) => e,
            None => continue,
        };
        let totals = &episode.themes[0].counts;

        let mut normal_themes: Vec<(&str, &SurveyCounts)> = Vec::new();
        for cc in plan.coding_configurations.iter() {
            for code in cc.code_scheme.codes.iter() {
                if !code.is_normal() || options.umbrella_themes.contains(&code.string_value) {
                    continue;
                }
                let name = format!("{}{}", cc.theme_prefix(), code.string_value);
                if let Some(row) = episode.themes.iter().find(|t| t.theme == name) {
                    normal_themes.push((code.string_value.as_str(), &row.counts));
                }
            }
        }

        if normal_themes.is_empty() {
            warn!(
                "Skipping normal themes by gender for {} because the scheme does not contain any normal codes",
                plan.raw_field
            );
            continue;
        }

        for (theme, counts) in normal_themes {
            for (gender, idx) in gender_columns.iter() {
                let participants = counts.cells[*idx].count;
                let total_relevant_gender = totals.cells[*idx].count;
                res.push(ThemeGenderCount {
                    episode: plan.raw_field.clone(),
                    theme: theme.to_string(),
                    gender: gender.string_value.clone(),
                    participants,
                    fraction: if total_relevant_gender == 0 {
                        None
                    } else {
                        Some(participants as f64 / total_relevant_gender as f64)
                    },
                });
            }
        }
    }
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::builder::RecordBuilder;
    use super::*;
    use std::sync::Arc;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn stop() -> Code {
        Code::control("code-stop", "STOP", ControlCode::Stop)
    }

    fn rqa_scheme(name: &str) -> Arc<CodeScheme> {
        Arc::new(CodeScheme::new(
            &format!("Scheme-{}", name),
            name,
            vec![
                Code::normal("code-water", "water"),
                Code::normal("code-food", "food"),
                Code::normal("code-knowledge", "knowledge"),
                Code::control("code-nc", "NC", ControlCode::NotCoded),
                stop(),
            ],
        ))
    }

    fn gender_scheme() -> Arc<CodeScheme> {
        Arc::new(CodeScheme::new(
            "Scheme-gender",
            "gender",
            vec![
                Code::normal("code-female", "female"),
                Code::normal("code-male", "male"),
                Code::control("code-nc", "NC", ControlCode::NotCoded),
                stop(),
            ],
        ))
    }

    fn rqa_plan(name: &str) -> CodingPlan {
        CodingPlan {
            dataset_name: name.to_string(),
            raw_field: format!("rqa_{}_raw", name),
            coding_configurations: vec![CodingConfiguration {
                coded_field: format!("rqa_{}_coded", name),
                code_scheme: rqa_scheme(name),
                coding_mode: CodingMode::Multiple,
                analysis_file_key: Some(format!("rqa_{}_", name)),
            }],
        }
    }

    fn gender_plan() -> CodingPlan {
        CodingPlan {
            dataset_name: "gender".to_string(),
            raw_field: "gender_raw".to_string(),
            coding_configurations: vec![CodingConfiguration {
                coded_field: "gender_coded".to_string(),
                code_scheme: gender_scheme(),
                coding_mode: CodingMode::Single,
                analysis_file_key: Some("gender".to_string()),
            }],
        }
    }

    fn catalog(episodes: &[&str]) -> AnalysisCatalog {
        AnalysisCatalog {
            rqa_plans: episodes.iter().map(|e| rqa_plan(e)).collect(),
            demog_plans: vec![gender_plan()],
            survey_plans: vec![gender_plan()],
        }
    }

    fn individual(uid: &str, gender: &str, episodes: &[(&str, &[&str])]) -> Record {
        let mut b = RecordBuilder::new(uid).single("gender_coded", gender);
        for (e, codes) in episodes {
            b = b
                .raw(&format!("rqa_{}_raw", e), "text")
                .multiple(&format!("rqa_{}_coded", e), codes);
        }
        b.build()
    }

    fn theme<'a>(episode: &'a EpisodeThemes, name: &str) -> &'a SurveyCounts {
        &episode
            .themes
            .iter()
            .find(|t| t.theme == name)
            .unwrap()
            .counts
    }

    #[test]
    fn repeat_participation_buckets() {
        init();
        let cat = catalog(&["s01e01", "s01e02"]);
        let individuals = vec![
            individual("a", "code-female", &[("s01e01", &["code-water"]), ("s01e02", &["code-nc"])]),
            individual("b", "code-male", &[("s01e01", &["code-food"])]),
        ];
        let res = repeat_participations(&individuals, &cat).unwrap();
        assert_eq!(
            res,
            vec![
                RepeatParticipation {
                    episodes_participated_in: 1,
                    individuals: 1,
                    percent: Percentage::Value(50.0)
                },
                RepeatParticipation {
                    episodes_participated_in: 2,
                    individuals: 1,
                    percent: Percentage::Value(50.0)
                },
            ]
        );
    }

    #[test]
    fn repeat_participation_requires_an_episode() {
        let cat = catalog(&["s01e01"]);
        let individuals = vec![
            individual("a", "code-female", &[("s01e01", &["code-water"])]),
            individual("lost", "code-male", &[]),
            individual("gone", "code-male", &[]),
        ];
        let mut withdrawn = individuals.clone();
        withdrawn.truncate(1);
        withdrawn.push(
            RecordBuilder::new("gone")
                .consent_withdrawn(true)
                .build(),
        );
        assert_eq!(
            repeat_participations(&individuals, &cat),
            Err(AnalysisErrors::NoParticipation {
                uid: "lost".to_string()
            })
        );
        let res = repeat_participations(&withdrawn, &cat).unwrap();
        assert_eq!(res[0].individuals, 1);
        assert_eq!(res[0].percent, Percentage::Value(100.0));
    }

    #[test]
    fn repeat_participation_sums_to_population() {
        let cat = catalog(&["s01e01", "s01e02", "s01e03"]);
        let individuals = vec![
            individual("a", "code-female", &[("s01e01", &["code-water"])]),
            individual("b", "code-female", &[("s01e02", &["code-water"])]),
            individual("c", "code-female", &[("s01e01", &["code-food"]), ("s01e03", &["code-nc"])]),
        ];
        let res = repeat_participations(&individuals, &cat).unwrap();
        assert_eq!(res.len(), 3);
        assert_eq!(res.iter().map(|r| r.individuals).sum::<u64>(), 3);
        let total: f64 = res.iter().filter_map(|r| r.percent.value()).sum();
        assert!((total - 100.0).abs() < 0.2);
        assert_eq!(res[2].percent, Percentage::Value(0.0));
    }

    #[test]
    fn demographics_skip_stop() {
        init();
        let scheme = Arc::new(CodeScheme::new(
            "Scheme-yes",
            "yes",
            vec![Code::normal("code-yes", "yes"), stop()],
        ));
        let cat = AnalysisCatalog {
            rqa_plans: vec![],
            demog_plans: vec![CodingPlan {
                dataset_name: "consent".to_string(),
                raw_field: "yes_raw".to_string(),
                coding_configurations: vec![CodingConfiguration {
                    coded_field: "yes_coded".to_string(),
                    code_scheme: scheme,
                    coding_mode: CodingMode::Single,
                    analysis_file_key: Some("yes".to_string()),
                }],
            }],
            survey_plans: vec![],
        };
        let individuals = vec![
            RecordBuilder::new("A").single("yes_coded", "code-yes").build(),
            RecordBuilder::new("B").single("yes_coded", "code-stop").build(),
            RecordBuilder::new("C").single("yes_coded", "code-yes").build(),
        ];
        let res = demographic_distributions(&individuals, &cat).unwrap();
        assert_eq!(res.len(), 1);
        assert_eq!(res[0].total_relevant, 2);
        assert_eq!(res[0].rows.len(), 1);
        assert_eq!(res[0].rows[0].participants, 2);
        assert_eq!(res[0].rows[0].percent, Percentage::Value(100.0));
    }

    #[test]
    fn demographics_cover_population() {
        let cat = catalog(&["s01e01"]);
        let individuals = vec![
            individual("a", "code-female", &[("s01e01", &["code-water"])]),
            individual("b", "code-female", &[("s01e01", &["code-water"])]),
            individual("c", "code-male", &[("s01e01", &["code-water"])]),
            individual("d", "code-nc", &[("s01e01", &["code-water"])]),
            RecordBuilder::new("e")
                .consent_withdrawn(true)
                .single("gender_coded", "code-stop")
                .build(),
        ];
        let res = demographic_distributions(&individuals, &cat).unwrap();
        let gender = &res[0];
        assert_eq!(gender.analysis_key, "gender");
        assert_eq!(gender.rows.iter().map(|r| r.participants).sum::<u64>(), 4);
        assert_eq!(gender.total_relevant, 3);
        let percents: Vec<String> = gender.rows.iter().map(|r| r.percent.to_string()).collect();
        assert_eq!(percents, vec!["66.7", "33.3", ""]);
    }

    #[test]
    fn demographics_reject_multiple() {
        let mut cat = catalog(&["s01e01"]);
        cat.demog_plans[0].coding_configurations[0].coding_mode = CodingMode::Multiple;
        let res = demographic_distributions(&[], &cat);
        assert!(matches!(
            res,
            Err(AnalysisErrors::UnsupportedCodingMode { .. })
        ));
    }

    #[test]
    fn demographics_without_normal_codes_are_unavailable() {
        let cat = catalog(&["s01e01"]);
        let individuals = vec![individual("a", "code-nc", &[("s01e01", &["code-water"])])];
        let res = demographic_distributions(&individuals, &cat).unwrap();
        assert_eq!(res[0].rows[0].percent, Percentage::Unavailable);
        assert_eq!(res[0].rows[2].percent, Percentage::Blank);
    }

    #[test]
    fn total_relevant_counts_individuals_once() {
        init();
        let cat = catalog(&["s01e01"]);
        let individuals = vec![
            individual("a", "code-female", &[("s01e01", &["code-water", "code-food"])]),
            individual("b", "code-male", &[("s01e01", &["code-food"])]),
            individual("c", "code-male", &[("s01e01", &["code-nc"])]),
            individual("d", "code-female", &[("s01e01", &["code-stop"])]),
        ];
        let res = theme_distributions(&individuals, &cat).unwrap();
        let names: Vec<String> = res.columns.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["gender:female", "gender:male", "gender:NC"]);

        let episode = &res.episodes[0];
        assert_eq!(episode.episode, "rqa_s01e01_raw");
        let themes: Vec<&str> = episode.themes.iter().map(|t| t.theme.as_str()).collect();
        assert_eq!(
            themes,
            vec![
                "Total Relevant Participants",
                "rqa_s01e01_water",
                "rqa_s01e01_food",
                "rqa_s01e01_knowledge",
                "rqa_s01e01_NC"
            ]
        );

        let total = theme(episode, TOTAL_RELEVANT_PARTICIPANTS);
        assert_eq!(total.total.count, 2);
        assert_eq!(total.total.percent, Percentage::Value(100.0));
        assert_eq!(total.cells[0].count, 1);
        assert_eq!(total.cells[1].count, 1);
        assert_eq!(total.cells[2].percent, Percentage::Unavailable);

        let food = theme(episode, "rqa_s01e01_food");
        assert_eq!(food.total.count, 2);
        assert_eq!(food.total.percent, Percentage::Value(100.0));
        let water = theme(episode, "rqa_s01e01_water");
        assert_eq!(water.total.count, 1);
        assert_eq!(water.total.percent, Percentage::Value(50.0));
        assert_eq!(water.cells[0].percent, Percentage::Value(100.0));
        assert_eq!(water.cells[1].percent, Percentage::Value(0.0));

        // Control themes are counted but carry no percentages.
        let nc = theme(episode, "rqa_s01e01_NC");
        assert_eq!(nc.total.count, 1);
        assert_eq!(nc.total.percent, Percentage::Blank);
    }

    #[test]
    fn themes_without_relevant_participants_are_unavailable() {
        let cat = catalog(&["s01e01"]);
        let individuals = vec![individual("c", "code-male", &[("s01e01", &["code-nc"])])];
        let res = theme_distributions(&individuals, &cat).unwrap();
        let episode = &res.episodes[0];
        assert_eq!(
            theme(episode, TOTAL_RELEVANT_PARTICIPANTS).total.percent,
            Percentage::Unavailable
        );
        assert_eq!(
            theme(episode, "rqa_s01e01_water").total.percent,
            Percentage::Unavailable
        );
    }

    #[test]
    fn themes_reject_single() {
        let mut cat = catalog(&["s01e01"]);
        cat.rqa_plans[0].coding_configurations[0].coding_mode = CodingMode::Single;
        assert!(matches!(
            theme_distributions(&[], &cat),
            Err(AnalysisErrors::UnsupportedCodingMode {
                pass: "theme_distributions",
                ..
            })
        ));
    }

    #[test]
    fn themes_require_coded_fields() {
        let cat = catalog(&["s01e01"]);
        let individuals = vec![RecordBuilder::new("x").single("gender_coded", "code-male").build()];
        assert_eq!(
            theme_distributions(&individuals, &cat),
            Err(AnalysisErrors::MissingField {
                uid: "x".to_string(),
                field: "rqa_s01e01_coded".to_string()
            })
        );
    }

    #[test]
    fn gender_fractions() {
        let cat = catalog(&["s01e01"]);
        let individuals = vec![
            individual("a", "code-female", &[("s01e01", &["code-water", "code-knowledge"])]),
            individual("b", "code-female", &[("s01e01", &["code-food"])]),
            individual("c", "code-nc", &[("s01e01", &["code-food"])]),
        ];
        let themes = theme_distributions(&individuals, &cat).unwrap();
        let res = gender_cross_cut(&themes, &cat, &AnalysisOptions::default_options()).unwrap();
        let rows: Vec<(&str, &str, u64, Option<f64>)> = res
            .iter()
            .map(|r| (r.theme.as_str(), r.gender.as_str(), r.participants, r.fraction))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("water", "female", 1, Some(0.5)),
                ("water", "male", 0, None),
                ("food", "female", 1, Some(0.5)),
                ("food", "male", 0, None),
            ]
        );
    }

    #[test]
    fn gender_key_must_exist() {
        let cat = catalog(&["s01e01"]);
        let themes = theme_distributions(&[], &cat).unwrap();
        let mut options = AnalysisOptions::default_options();
        options.gender_analysis_key = "sex".to_string();
        assert_eq!(
            gender_cross_cut(&themes, &cat, &options),
            Err(AnalysisErrors::UnknownAnalysisKey {
                key: "sex".to_string()
            })
        );
    }

    #[test]
    fn engagement_rows() {
        let cat = catalog(&["s01e01", "s01e02"]);
        let messages = vec![
            RecordBuilder::new("a")
                .raw("rqa_s01e01_raw", "water")
                .multiple("rqa_s01e01_coded", &["code-water"])
                .build(),
            RecordBuilder::new("b")
                .raw("rqa_s01e01_raw", "hello")
                .multiple("rqa_s01e01_coded", &["code-nc"])
                .build(),
            RecordBuilder::new("c")
                .raw("rqa_s01e02_raw", "stop")
                .multiple("rqa_s01e02_coded", &["code-stop"])
                .consent_withdrawn(true)
                .build(),
        ];
        let individuals = vec![
            individual("a", "code-female", &[("s01e01", &["code-water", "code-nc"])]),
            individual("b", "code-male", &[("s01e01", &["code-nc"])]),
        ];
        let res = engagement_counts(&messages, &individuals, &cat).unwrap();
        assert_eq!(res.len(), 3);
        assert_eq!(
            res[0],
            EngagementCounts {
                episode: "s01e01".to_string(),
                total_messages: None,
                opt_in_messages: 2,
                labelled_messages: 2,
                relevant_messages: 1,
                total_participants: None,
                opt_in_participants: 2,
                relevant_participants: 1,
            }
        );
        assert_eq!(res[1].opt_in_messages, 0);
        assert_eq!(
            res[2],
            EngagementCounts {
                episode: "Total".to_string(),
                total_messages: Some(3),
                opt_in_messages: 2,
                labelled_messages: 2,
                relevant_messages: 1,
                total_participants: Some(2),
                opt_in_participants: 2,
                relevant_participants: 1,
            }
        );
    }

    #[test]
    fn percentages_round_half_to_even() {
        assert_eq!(Percentage::of(1, 16).to_string(), "6.2");
        assert_eq!(Percentage::of(3, 16).to_string(), "18.8");
        assert_eq!(Percentage::of(1, 3).to_string(), "33.3");
        assert_eq!(Percentage::of(2, 3).to_string(), "66.7");
    }

    #[test]
    fn multiple_survey_answers() {
        let needs = CodingPlan {
            dataset_name: "needs".to_string(),
            raw_field: "needs_raw".to_string(),
            coding_configurations: vec![CodingConfiguration {
                coded_field: "needs_coded".to_string(),
                code_scheme: Arc::new(CodeScheme::new(
                    "Scheme-needs",
                    "needs",
                    vec![
                        Code::normal("code-food", "food"),
                        Code::normal("code-health", "health"),
                        stop(),
                    ],
                )),
                coding_mode: CodingMode::Multiple,
                analysis_file_key: Some("needs".to_string()),
            }],
        };
        let mut cat = catalog(&["s01e01"]);
        cat.survey_plans = vec![needs];
        let individuals = vec![
            RecordBuilder::new("a")
                .raw("rqa_s01e01_raw", "text")
                .multiple("rqa_s01e01_coded", &["code-water"])
                .multiple("needs_coded", &["code-food", "code-health"])
                .build(),
            RecordBuilder::new("b")
                .raw("rqa_s01e01_raw", "text")
                .multiple("rqa_s01e01_coded", &["code-food"])
                .multiple("needs_coded", &["code-health", "code-stop"])
                .build(),
        ];
        let res = theme_distributions(&individuals, &cat).unwrap();
        let names: Vec<String> = res.columns.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["needs:food", "needs:health"]);

        let episode = &res.episodes[0];
        let total = theme(episode, TOTAL_RELEVANT_PARTICIPANTS);
        assert_eq!(total.total.count, 2);
        assert_eq!(total.cells.len(), 2);
        assert_eq!(total.cells[0].count, 1);
        assert_eq!(total.cells[1].count, 2);
        assert_eq!(total.cells[1].percent, Percentage::Value(100.0));

        let water = theme(episode, "rqa_s01e01_water");
        assert_eq!(water.cells[0].count, 1);
        assert_eq!(water.cells[1].count, 1);
        let food = theme(episode, "rqa_s01e01_food");
        assert_eq!(food.cells[0].count, 0);
        assert_eq!(food.cells[0].percent, Percentage::Value(0.0));
        assert_eq!(food.cells[1].percent, Percentage::Value(50.0));
    }
}
