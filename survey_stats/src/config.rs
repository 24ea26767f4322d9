// ********* Code schemes ***********

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Display;
use std::sync::Arc;

/// The role of a code inside its scheme.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum CodeType {
    /// A substantive answer. Only normal codes make a record relevant.
    Normal,
    /// A non-substantive marker such as an opt-out or a missing label.
    Control,
    /// Codes describing the message itself rather than its content.
    Meta,
}

/// The control markers understood by the engine.
///
/// The string forms are the ones used by the upstream labelling tool.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum ControlCode {
    Stop,
    NotReviewed,
    NotCoded,
    WrongScheme,
    TrueMissing,
    Skipped,
    NotInternallyConsistent,
    CodingError,
    Other(String),
}

impl ControlCode {
    pub fn parse(s: &str) -> ControlCode {
        match s {
            "STOP" => ControlCode::Stop,
            "NR" => ControlCode::NotReviewed,
            "NC" => ControlCode::NotCoded,
            "WS" => ControlCode::WrongScheme,
            "NA" => ControlCode::TrueMissing,
            "SKIPPED" => ControlCode::Skipped,
            "NIC" => ControlCode::NotInternallyConsistent,
            "CE" => ControlCode::CodingError,
            x => ControlCode::Other(x.to_string()),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Code {
    pub code_id: String,
    pub string_value: String,
    pub code_type: CodeType,
    pub control_code: Option<ControlCode>,
}

impl Code {
    pub fn normal(code_id: &str, string_value: &str) -> Code {
        Code {
            code_id: code_id.to_string(),
            string_value: string_value.to_string(),
            code_type: CodeType::Normal,
            control_code: None,
        }
    }

    pub fn control(code_id: &str, string_value: &str, control_code: ControlCode) -> Code {
        Code {
            code_id: code_id.to_string(),
            string_value: string_value.to_string(),
            code_type: CodeType::Control,
            control_code: Some(control_code),
        }
    }

    pub fn is_normal(&self) -> bool {
        self.code_type == CodeType::Normal
    }

    pub fn is_stop(&self) -> bool {
        self.control_code == Some(ControlCode::Stop)
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CodeScheme {
    pub scheme_id: String,
    pub name: String,
    pub codes: Vec<Code>,
}

impl CodeScheme {
    pub fn new(scheme_id: &str, name: &str, codes: Vec<Code>) -> CodeScheme {
        CodeScheme {
            scheme_id: scheme_id.to_string(),
            name: name.to_string(),
            codes,
        }
    }

    /// Resolves a code id. An id that is not part of the scheme is an error.
    pub fn get_code(&self, code_id: &str) -> Result<&Code, AnalysisErrors> {
        self.codes
            .iter()
            .find(|c| c.code_id == code_id)
            .ok_or_else(|| AnalysisErrors::UnknownCode {
                scheme: self.name.clone(),
                code_id: code_id.to_string(),
            })
    }

    /// The codes that appear in output tables, in scheme order.
    pub(crate) fn reportable_codes(&self) -> impl Iterator<Item = &Code> {
        self.codes.iter().filter(|c| !c.is_stop())
    }
}

// ********* Coding plans ***********

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum CodingMode {
    /// The coded field holds exactly one label.
    Single,
    /// The coded field holds an ordered list of labels.
    Multiple,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CodingConfiguration {
    pub coded_field: String,
    pub code_scheme: Arc<CodeScheme>,
    pub coding_mode: CodingMode,
    /// The prefix of the output columns. `None` keeps this configuration out of the tables.
    pub analysis_file_key: Option<String>,
}

impl CodingConfiguration {
    /// The key under which themes of this configuration are reported.
    pub(crate) fn theme_prefix(&self) -> &str {
        self.analysis_file_key.as_deref().unwrap_or("")
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CodingPlan {
    pub dataset_name: String,
    pub raw_field: String,
    pub coding_configurations: Vec<CodingConfiguration>,
}

/// The read-only description of a season, built once at startup and passed to every pass.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AnalysisCatalog {
    /// One plan per episode (radio question).
    pub rqa_plans: Vec<CodingPlan>,
    pub demog_plans: Vec<CodingPlan>,
    pub survey_plans: Vec<CodingPlan>,
}

/// Options of the derived views that are not part of the catalog itself.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AnalysisOptions {
    /// Analysis key of the survey configuration that holds gender.
    pub gender_analysis_key: String,
    /// Umbrella themes left out of the per-gender view.
    pub umbrella_themes: Vec<String>,
    /// Maximum number of messages drawn per code.
    pub sample_size: usize,
}

impl AnalysisOptions {
    pub const DEFAULT_SAMPLE_SIZE: usize = 100;

    pub fn default_options() -> AnalysisOptions {
        AnalysisOptions {
            gender_analysis_key: "gender".to_string(),
            umbrella_themes: vec![
                "knowledge".to_string(),
                "attitude".to_string(),
                "behaviour".to_string(),
            ],
            sample_size: AnalysisOptions::DEFAULT_SAMPLE_SIZE,
        }
    }
}

// ********* Records ***********

/// One code assignment inside a coded field.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Label {
    pub code_id: String,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum FieldValue {
    /// Raw text sent by the participant.
    Text(String),
    Single(Label),
    Multiple(Vec<Label>),
}

/// A message or an individual, validated against the catalog at load time.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Record {
    pub uid: String,
    pub consent_withdrawn: bool,
    pub fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn raw_text(&self, field: &str) -> Option<&str> {
        match self.fields.get(field) {
            Some(FieldValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// The labels stored under the coded field of a configuration.
    ///
    /// Returns `Ok(None)` when the field is absent. A field whose shape does not
    /// follow the coding mode of the configuration is an error.
    pub fn labels(&self, cc: &CodingConfiguration) -> Result<Option<&[Label]>, AnalysisErrors> {
        match (self.fields.get(&cc.coded_field), cc.coding_mode) {
            (None, _) => Ok(None),
            (Some(FieldValue::Single(l)), CodingMode::Single) => Ok(Some(std::slice::from_ref(l))),
            (Some(FieldValue::Multiple(ls)), CodingMode::Multiple) => Ok(Some(ls.as_slice())),
            (Some(_), mode) => Err(AnalysisErrors::FieldShapeMismatch {
                uid: self.uid.clone(),
                field: cc.coded_field.clone(),
                expected: mode,
            }),
        }
    }

    /// Same as `labels`, but an absent field is an error.
    pub(crate) fn required_labels(
        &self,
        cc: &CodingConfiguration,
    ) -> Result<&[Label], AnalysisErrors> {
        self.labels(cc)?
            .ok_or_else(|| AnalysisErrors::MissingField {
                uid: self.uid.clone(),
                field: cc.coded_field.clone(),
            })
    }

    /// Resolves all the labels of a coded field against the scheme of the configuration.
    pub(crate) fn codes<'a>(
        &self,
        cc: &'a CodingConfiguration,
    ) -> Result<Vec<&'a Code>, AnalysisErrors> {
        let mut res: Vec<&Code> = Vec::new();
        for l in self.required_labels(cc)? {
            res.push(cc.code_scheme.get_code(&l.code_id)?);
        }
        Ok(res)
    }
}

// ******** Output data structures *********

/// A percentage cell of an output table.
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum Percentage {
    /// Not computed for this cell.
    Blank,
    /// The denominator was zero.
    Unavailable,
    /// Rounded to one decimal place.
    Value(f64),
}

impl Percentage {
    pub fn of(count: u64, total: u64) -> Percentage {
        if total == 0 {
            Percentage::Unavailable
        } else {
            Percentage::Value(round_one_decimal(count as f64 / total as f64 * 100.0))
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Percentage::Value(x) => Some(*x),
            _ => None,
        }
    }
}

impl Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Percentage::Blank => write!(f, ""),
            Percentage::Unavailable => write!(f, "-"),
            Percentage::Value(x) => write!(f, "{:.1}", x),
        }
    }
}

/// Halves go to the even neighbour: 6.25 gives 6.2.
pub(crate) fn round_one_decimal(x: f64) -> f64 {
    (x * 10.0).round_ties_even() / 10.0
}

/// One row of the engagement table.
///
/// The totals over all messages and participants are only known for the
/// whole season: per-episode raw data is overwritten upstream.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct EngagementCounts {
    pub episode: String,
    pub total_messages: Option<u64>,
    pub opt_in_messages: u64,
    pub labelled_messages: u64,
    pub relevant_messages: u64,
    pub total_participants: Option<u64>,
    pub opt_in_participants: u64,
    pub relevant_participants: u64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct RepeatParticipation {
    pub episodes_participated_in: usize,
    pub individuals: u64,
    pub percent: Percentage,
}

#[derive(PartialEq, Debug, Clone)]
pub struct DemographicRow {
    pub code: Code,
    pub participants: u64,
    pub percent: Percentage,
}

#[derive(PartialEq, Debug, Clone)]
pub struct DemographicDistribution {
    pub analysis_key: String,
    /// Number of individuals with a normal code.
    pub total_relevant: u64,
    pub rows: Vec<DemographicRow>,
}

/// A count and its percentage, as reported in one column pair.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct Tally {
    pub count: u64,
    pub percent: Percentage,
}

impl Tally {
    pub const EMPTY: Tally = Tally {
        count: 0,
        percent: Percentage::Blank,
    };
}

/// One survey column: the answer `string_value` to the survey question `analysis_key`.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SurveyColumn {
    pub analysis_key: String,
    pub string_value: String,
}

impl SurveyColumn {
    pub fn name(&self) -> String {
        format!("{}:{}", self.analysis_key, self.string_value)
    }
}

/// A full row of survey counts, with the same columns for every theme.
#[derive(PartialEq, Debug, Clone)]
pub struct SurveyCounts {
    pub total: Tally,
    /// Aligned with the columns of the layout the row was built from.
    pub cells: Vec<Tally>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct ThemeRow {
    pub theme: String,
    pub counts: SurveyCounts,
}

#[derive(PartialEq, Debug, Clone)]
pub struct EpisodeThemes {
    /// The raw field of the episode plan.
    pub episode: String,
    /// `Total Relevant Participants` first, then one row per theme.
    pub themes: Vec<ThemeRow>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct ThemeDistributions {
    pub columns: Vec<SurveyColumn>,
    pub episodes: Vec<EpisodeThemes>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct ThemeGenderCount {
    pub episode: String,
    pub theme: String,
    pub gender: String,
    pub participants: u64,
    /// Share of the relevant participants of that gender. `None` if there are none.
    pub fraction: Option<f64>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SampleMessage {
    pub episode: String,
    pub code_scheme: String,
    pub code: String,
    pub message: String,
}

/// Errors that prevent a pass from completing.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum AnalysisErrors {
    /// A code id that its scheme does not know.
    UnknownCode { scheme: String, code_id: String },
    /// A pass was given a configuration with a coding mode it does not implement.
    UnsupportedCodingMode {
        pass: &'static str,
        coded_field: String,
        mode: CodingMode,
    },
    /// A non-withdrawn individual without any episode. It should not be in the dataset.
    NoParticipation { uid: String },
    MissingField { uid: String, field: String },
    FieldShapeMismatch {
        uid: String,
        field: String,
        expected: CodingMode,
    },
    UnknownAnalysisKey { key: String },
}

impl Error for AnalysisErrors {}

impl Display for AnalysisErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisErrors::UnknownCode { scheme, code_id } => {
                write!(f, "code id {} not found in scheme {}", code_id, scheme)
            }
            AnalysisErrors::UnsupportedCodingMode {
                pass,
                coded_field,
                mode,
            } => write!(
                f,
                "{}: coding mode {:?} of {} is not supported",
                pass, mode, coded_field
            ),
            AnalysisErrors::NoParticipation { uid } => {
                write!(f, "individual {} did not participate in any episode", uid)
            }
            AnalysisErrors::MissingField { uid, field } => {
                write!(f, "record {} is missing field {}", uid, field)
            }
            AnalysisErrors::FieldShapeMismatch {
                uid,
                field,
                expected,
            } => write!(
                f,
                "record {}: field {} does not hold a {:?} coding",
                uid, field, expected
            ),
            AnalysisErrors::UnknownAnalysisKey { key } => {
                write!(f, "no survey configuration with analysis key {}", key)
            }
        }
    }
}
