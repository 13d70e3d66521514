use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::args::Args;
use crate::checks::*;

pub const DEFAULT_DELIMITER: u8 = b';';
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DEFAULT_HIGH_THRESHOLD: f64 = 4.0;
pub const DEFAULT_MIN_RATING: i64 = 1;
pub const DEFAULT_MAX_RATING: i64 = 5;
/// Widest rating scale accepted, in number of distinct ratings.
pub const MAX_SCALE_RATINGS: i64 = 101;

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "studyName")]
    pub study_name: Option<String>,
    /// (file path or 'stdout') Where to write the JSON summary.
    #[serde(rename = "outputPath")]
    pub output_path: Option<String>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DataSource {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    pub delimiter: Option<String>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

fn default_provider() -> String {
    "csv".to_string()
}

impl DataSource {
    pub fn delimiter_byte(&self) -> CheckResult<u8> {
        match self.delimiter.as_deref() {
            None => Ok(DEFAULT_DELIMITER),
            Some("\\t") => Ok(b'\t'),
            Some(s) if s.len() == 1 && s.is_ascii() => Ok(s.as_bytes()[0]),
            Some(s) => InvalidDelimiterSnafu { delimiter: s }.fail(),
        }
    }
}

/// The technical data sheet of the study.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Datasheet {
    #[serde(rename = "universeTotal")]
    pub universe_total: u64,
    #[serde(rename = "sampleSize")]
    pub sample_size: u64,
    #[serde(rename = "confidenceLevel")]
    pub confidence_level: Option<f64>,
    #[serde(rename = "assumedProportion")]
    pub assumed_proportion: Option<f64>,
    /// In percent.
    #[serde(rename = "reportedMarginOfError")]
    pub reported_margin_of_error: Option<f64>,
    /// In percent.
    #[serde(rename = "responseRate")]
    pub response_rate: Option<f64>,
    #[serde(rename = "checkSampleRows")]
    pub check_sample_rows: Option<bool>,
    pub simulate: Option<bool>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct MetricConfig {
    pub name: String,
    /// All the fragments must appear in the column header (case insensitive).
    #[serde(rename = "columnFragments")]
    pub column_fragments: Vec<String>,
    #[serde(rename = "minValue")]
    pub min_value: Option<i64>,
    #[serde(rename = "maxValue")]
    pub max_value: Option<i64>,
    #[serde(rename = "highThreshold")]
    pub high_threshold: Option<f64>,
}

impl MetricConfig {
    pub fn scale(&self) -> (i64, i64) {
        (
            self.min_value.unwrap_or(DEFAULT_MIN_RATING),
            self.max_value.unwrap_or(DEFAULT_MAX_RATING),
        )
    }

    pub fn high_threshold(&self) -> f64 {
        self.high_threshold.unwrap_or(DEFAULT_HIGH_THRESHOLD)
    }
}

/// Rejects the rating scales that are empty or too wide to tabulate.
pub fn validate_metrics(metrics: &[MetricConfig]) -> CheckResult<()> {
    for m in metrics {
        let (lowest, highest) = m.scale();
        ensure!(
            lowest <= highest && highest.saturating_sub(lowest) < MAX_SCALE_RATINGS,
            InvalidScaleSnafu {
                name: m.name.as_str(),
                lowest,
                highest,
            }
        );
    }
    Ok(())
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PeriodConfig {
    pub column: String,
    pub format: Option<String>,
    #[serde(rename = "expectedStart")]
    pub expected_start: String,
    #[serde(rename = "expectedEnd")]
    pub expected_end: String,
}

impl PeriodConfig {
    pub fn format(&self) -> &str {
        self.format.as_deref().unwrap_or(DEFAULT_DATE_FORMAT)
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ExpectedLiteral {
    pub text: String,
    /// Other spellings accepted in place of the text.
    #[serde(default)]
    pub alternatives: Vec<String>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SourceCheck {
    #[serde(rename = "filePath")]
    pub file_path: String,
    /// Field name -> expected value
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    #[serde(default)]
    pub literals: Vec<ExpectedLiteral>,
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurveyConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: Option<OutputSettings>,
    #[serde(rename = "dataSources", default)]
    pub data_sources: Vec<DataSource>,
    pub datasheet: Option<Datasheet>,
    #[serde(rename = "segmentColumn")]
    pub segment_column: Option<String>,
    #[serde(default)]
    pub metrics: Vec<MetricConfig>,
    pub period: Option<PeriodConfig>,
    #[serde(rename = "sourceChecks", default)]
    pub source_checks: Vec<SourceCheck>,
}

pub fn read_config(path: &Path) -> CheckResult<SurveyConfig> {
    let config_str = fs::read_to_string(path).context(OpeningJsonSnafu {
        path: path.display().to_string(),
    })?;
    let config = parse_config(&config_str)?;
    info!("Read configuration {:?}", path);
    let root = path.parent().unwrap_or_else(|| Path::new(""));
    Ok(resolve_paths(config, root))
}

pub fn parse_config(contents: &str) -> CheckResult<SurveyConfig> {
    let config: SurveyConfig = serde_json::from_str(contents).context(ParsingJsonSnafu {})?;
    validate_metrics(&config.metrics)?;
    Ok(config)
}

fn resolve_path(root: &Path, p: &str) -> String {
    if p == "stdout" || Path::new(p).is_absolute() {
        p.to_string()
    } else {
        let full: PathBuf = root.join(p);
        full.display().to_string()
    }
}

/// Makes the relative paths of the configuration relative to `root`.
pub fn resolve_paths(mut config: SurveyConfig, root: &Path) -> SurveyConfig {
    for ds in config.data_sources.iter_mut() {
        ds.file_path = resolve_path(root, &ds.file_path);
    }
    for sc in config.source_checks.iter_mut() {
        sc.file_path = resolve_path(root, &sc.file_path);
    }
    if let Some(os) = config.output_settings.as_mut() {
        os.output_path = os.output_path.as_deref().map(|p| resolve_path(root, p));
    }
    config
}

/// Parses a metric given on the command line: `Name=fragment1|fragment2`.
pub fn parse_metric_arg(value: &str) -> CheckResult<MetricConfig> {
    let (name, fragments) = value
        .split_once('=')
        .context(InvalidMetricArgumentSnafu { value })?;
    let column_fragments: Vec<String> = fragments
        .split('|')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    ensure!(
        !name.trim().is_empty() && !column_fragments.is_empty(),
        InvalidMetricArgumentSnafu { value }
    );
    Ok(MetricConfig {
        name: name.trim().to_string(),
        column_fragments,
        min_value: None,
        max_value: None,
        high_threshold: None,
    })
}

fn infer_provider(path: &str) -> String {
    let lower = path.to_lowercase();
    if lower.ends_with(".xlsx") || lower.ends_with(".xlsm") {
        "xlsx".to_string()
    } else {
        default_provider()
    }
}

/// Applies the command line options on top of the configuration file, if any.
pub fn merge_args(config: Option<SurveyConfig>, args: &Args) -> CheckResult<SurveyConfig> {
    let mut config = config.unwrap_or_default();

    if let Some(input) = &args.input {
        config.data_sources = vec![DataSource {
            provider: args
                .input_type
                .clone()
                .unwrap_or_else(|| infer_provider(input)),
            file_path: input.clone(),
            delimiter: args.delimiter.clone(),
            excel_worksheet_name: args.excel_worksheet_name.clone(),
        }];
    } else {
        for ds in config.data_sources.iter_mut() {
            if let Some(t) = &args.input_type {
                ds.provider = t.clone();
            }
            if let Some(d) = &args.delimiter {
                ds.delimiter = Some(d.clone());
            }
            if let Some(w) = &args.excel_worksheet_name {
                ds.excel_worksheet_name = Some(w.clone());
            }
        }
    }

    config.datasheet = match (config.datasheet.take(), args.population, args.sample) {
        (Some(ds), population, sample) => Some(Datasheet {
            universe_total: population.unwrap_or(ds.universe_total),
            sample_size: sample.unwrap_or(ds.sample_size),
            ..ds
        }),
        (None, Some(universe_total), Some(sample_size)) => Some(Datasheet {
            universe_total,
            sample_size,
            confidence_level: None,
            assumed_proportion: None,
            reported_margin_of_error: None,
            response_rate: None,
            check_sample_rows: None,
            simulate: None,
        }),
        (None, None, None) => None,
        (None, _, _) => {
            whatever!("Both --population and --sample are required to describe the datasheet")
        }
    };
    if let Some(ds) = config.datasheet.as_mut() {
        if args.confidence.is_some() {
            ds.confidence_level = args.confidence;
        }
        if args.proportion.is_some() {
            ds.assumed_proportion = args.proportion;
        }
        if args.reported_margin.is_some() {
            ds.reported_margin_of_error = args.reported_margin;
        }
        if args.simulate {
            ds.simulate = Some(true);
        }
    }

    if let Some(metric_args) = &args.metric {
        let mut metrics = Vec::new();
        for m in metric_args {
            metrics.push(parse_metric_arg(m)?);
        }
        config.metrics = metrics;
    }

    if let Some(sc) = &args.segment_column {
        config.segment_column = Some(sc.clone());
    }

    if let Some(out) = &args.out {
        let mut os = config.output_settings.take().unwrap_or_default();
        os.output_path = Some(out.clone());
        config.output_settings = Some(os);
    }

    validate_metrics(&config.metrics)?;
    debug!("merge_args: {:?}", config);
    Ok(config)
}
