use crate::analysis::*;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

pub const DEFAULT_CONSENT_WITHDRAWN_KEY: &str = "consent_withdrawn";
pub const DEFAULT_UID_KEY: &str = "uid";

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CodingConfigurationConfig {
    #[serde(rename = "codedField")]
    pub coded_field: String,
    #[serde(rename = "codeScheme")]
    pub code_scheme: String,
    #[serde(rename = "codingMode")]
    pub _coding_mode: String,
    #[serde(rename = "analysisFileKey")]
    pub analysis_file_key: Option<String>,
}

impl CodingConfigurationConfig {
    pub fn coding_mode(&self) -> AnResult<CodingMode> {
        match self._coding_mode.as_str() {
            "single" => Ok(CodingMode::Single),
            "multiple" => Ok(CodingMode::Multiple),
            _ => whatever!(
                "{}: unknown coding mode: {}",
                self.coded_field,
                self._coding_mode
            ),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CodingPlanConfig {
    #[serde(rename = "datasetName")]
    pub dataset_name: String,
    #[serde(rename = "rawField")]
    pub raw_field: String,
    #[serde(rename = "codingConfigurations")]
    pub coding_configurations: Vec<CodingConfigurationConfig>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct UuidTableConfig {
    #[serde(rename = "lookupFilePath")]
    pub lookup_file_path: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfiguration {
    #[serde(rename = "pipelineName")]
    pub pipeline_name: String,
    #[serde(rename = "consentWithdrawnKey")]
    pub _consent_withdrawn_key: Option<String>,
    #[serde(rename = "uidKey")]
    pub _uid_key: Option<String>,
    #[serde(rename = "codeSchemes")]
    pub code_schemes: BTreeMap<String, String>,
    #[serde(rename = "rqaCodingPlans")]
    pub rqa_coding_plans: Vec<CodingPlanConfig>,
    #[serde(rename = "demogCodingPlans", default)]
    pub demog_coding_plans: Vec<CodingPlanConfig>,
    #[serde(rename = "surveyCodingPlans", default)]
    pub survey_coding_plans: Vec<CodingPlanConfig>,
    #[serde(rename = "genderAnalysisKey")]
    pub gender_analysis_key: Option<String>,
    #[serde(rename = "umbrellaThemes")]
    pub umbrella_themes: Option<Vec<String>>,
    #[serde(rename = "sampleSize")]
    pub sample_size: Option<usize>,
    #[serde(rename = "phoneNumberUuidTable")]
    pub phone_number_uuid_table: Option<UuidTableConfig>,
}

impl PipelineConfiguration {
    pub fn consent_withdrawn_key(&self) -> &str {
        self._consent_withdrawn_key
            .as_deref()
            .unwrap_or(DEFAULT_CONSENT_WITHDRAWN_KEY)
    }

    pub fn uid_key(&self) -> &str {
        self._uid_key.as_deref().unwrap_or(DEFAULT_UID_KEY)
    }
}

// The code scheme files, in the format of the labelling tool.

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CodeConfig {
    #[serde(rename = "CodeID")]
    pub code_id: String,
    #[serde(rename = "StringValue")]
    pub string_value: String,
    #[serde(rename = "CodeType")]
    pub _code_type: String,
    #[serde(rename = "ControlCode")]
    pub control_code: Option<String>,
}

impl CodeConfig {
    pub fn code_type(&self) -> AnResult<CodeType> {
        match self._code_type.as_str() {
            "Normal" => Ok(CodeType::Normal),
            "Control" => Ok(CodeType::Control),
            "Meta" => Ok(CodeType::Meta),
            _ => whatever!("{}: unknown code type: {}", self.code_id, self._code_type),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CodeSchemeConfig {
    #[serde(rename = "SchemeID")]
    pub scheme_id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Codes")]
    pub codes: Vec<CodeConfig>,
}

pub fn read_pipeline_configuration(path: &str) -> AnResult<PipelineConfiguration> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    serde_json::from_str(&contents).context(ParsingJsonSnafu { path })
}

pub fn read_code_scheme(path: &str) -> AnResult<CodeScheme> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    let csc: CodeSchemeConfig = serde_json::from_str(&contents).context(ParsingJsonSnafu { path })?;
    validate_code_scheme(&csc)
}

fn validate_code_scheme(csc: &CodeSchemeConfig) -> AnResult<CodeScheme> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut codes: Vec<Code> = Vec::new();
    for cc in csc.codes.iter() {
        if !seen.insert(cc.code_id.as_str()) {
            whatever!("scheme {}: duplicate code id {}", csc.name, cc.code_id);
        }
        let code_type = cc.code_type()?;
        let control_code = match (code_type, cc.control_code.as_deref()) {
            (CodeType::Control, Some(s)) => Some(ControlCode::parse(s)),
            (CodeType::Control, None) => {
                whatever!(
                    "scheme {}: control code {} has no ControlCode",
                    csc.name,
                    cc.code_id
                )
            }
            _ => None,
        };
        codes.push(Code {
            code_id: cc.code_id.clone(),
            string_value: cc.string_value.clone(),
            code_type,
            control_code,
        });
    }
    debug!(
        "validate_code_scheme: {}: {} codes",
        csc.name,
        codes.len()
    );
    Ok(CodeScheme::new(&csc.scheme_id, &csc.name, codes))
}

fn validate_plans(
    section: &str,
    plans: &[CodingPlanConfig],
    schemes: &HashMap<String, Arc<CodeScheme>>,
) -> AnResult<Vec<CodingPlan>> {
    let mut res: Vec<CodingPlan> = Vec::new();
    for p in plans.iter() {
        let mut configurations: Vec<CodingConfiguration> = Vec::new();
        for ccc in p.coding_configurations.iter() {
            let code_scheme = match schemes.get(&ccc.code_scheme) {
                Some(s) => s.clone(),
                None => whatever!(
                    "{}: {}: unknown code scheme {}",
                    section,
                    p.dataset_name,
                    ccc.code_scheme
                ),
            };
            configurations.push(CodingConfiguration {
                coded_field: ccc.coded_field.clone(),
                code_scheme,
                coding_mode: ccc.coding_mode()?,
                analysis_file_key: ccc.analysis_file_key.clone(),
            });
        }
        res.push(CodingPlan {
            dataset_name: p.dataset_name.clone(),
            raw_field: p.raw_field.clone(),
            coding_configurations: configurations,
        });
    }
    Ok(res)
}

fn check_unique_analysis_keys(section: &str, plans: &[CodingPlan]) -> AnResult<()> {
    let mut seen: HashSet<&str> = HashSet::new();
    for key in plans
        .iter()
        .flat_map(|p| p.coding_configurations.iter())
        .filter_map(|cc| cc.analysis_file_key.as_deref())
    {
        if !seen.insert(key) {
            whatever!("{}: duplicate analysis file key {}", section, key);
        }
    }
    Ok(())
}

/// Loads the code schemes and builds the catalog of a season.
///
/// Scheme paths are relative to `root_p`, the directory of the configuration file.
pub fn validate_catalog(config: &PipelineConfiguration, root_p: &Path) -> AnResult<AnalysisCatalog> {
    let mut schemes: HashMap<String, Arc<CodeScheme>> = HashMap::new();
    for (name, lpath) in config.code_schemes.iter() {
        let p: PathBuf = root_p.join(lpath);
        let scheme = read_code_scheme(&p.display().to_string())?;
        schemes.insert(name.clone(), Arc::new(scheme));
    }
    info!("Loaded {} code schemes", schemes.len());

    if config.rqa_coding_plans.is_empty() {
        whatever!("no rqaCodingPlans in the configuration");
    }
    let catalog = AnalysisCatalog {
        rqa_plans: validate_plans("rqaCodingPlans", &config.rqa_coding_plans, &schemes)?,
        demog_plans: validate_plans("demogCodingPlans", &config.demog_coding_plans, &schemes)?,
        survey_plans: validate_plans("surveyCodingPlans", &config.survey_coding_plans, &schemes)?,
    };
    check_unique_analysis_keys("demogCodingPlans", &catalog.demog_plans)?;
    check_unique_analysis_keys("surveyCodingPlans", &catalog.survey_plans)?;
    Ok(catalog)
}

pub fn analysis_options(config: &PipelineConfiguration) -> AnalysisOptions {
    let default = AnalysisOptions::default_options();
    AnalysisOptions {
        gender_analysis_key: config
            .gender_analysis_key
            .clone()
            .unwrap_or(default.gender_analysis_key),
        umbrella_themes: config
            .umbrella_themes
            .clone()
            .unwrap_or(default.umbrella_themes),
        sample_size: config.sample_size.unwrap_or(default.sample_size),
    }
}

/// The path of the uid lookup table, relative to the configuration file.
pub fn uuid_table_path(config: &PipelineConfiguration, config_path: &str) -> AnResult<PathBuf> {
    let table = match config.phone_number_uuid_table.as_ref() {
        Some(t) => t,
        None => whatever!("{}: no phoneNumberUuidTable configured", config_path),
    };
    let root_p = Path::new(config_path)
        .parent()
        .context(MissingParentDirSnafu { path: config_path })?;
    Ok(root_p.join(&table.lookup_file_path))
}
