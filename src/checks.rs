use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::Path;

use crate::args::Args;
use crate::checks::config_reader::*;
use crate::checks::datasheet::check_datasheet;
use crate::checks::io_common::SurveyTable;
use crate::checks::metrics::analyze_metrics;
use crate::checks::period::check_period;
use crate::checks::report::*;
use crate::checks::sources::check_source_file;

pub mod config_reader;
pub mod datasheet;
pub mod io_common;
pub mod io_csv;
pub mod io_excel;
pub mod metrics;
pub mod period;
pub mod report;
pub mod sources;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CheckError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON: {source}"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error writing the summary to {path}"))]
    WritingSummary {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening CSV file {path}"))]
    OpeningCsv { source: csv::Error, path: String },
    #[snafu(display("Error parsing CSV line {lineno}"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Invalid delimiter {delimiter:?}: expected a single ASCII character"))]
    InvalidDelimiter { delimiter: String },
    #[snafu(display("Error opening Excel file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The Excel worksheet has no header row"))]
    EmptyExcel {},
    #[snafu(display("Worksheet {name:?} not found"))]
    MissingWorksheet { name: String },
    #[snafu(display("Provider not implemented: {provider:?}"))]
    UnknownProvider { provider: String },
    #[snafu(display("The headers of {path} differ from the headers of the first data source"))]
    HeaderMismatch { path: String },
    #[snafu(display("Column {column:?} not found"))]
    MissingColumn { column: String },
    #[snafu(display("Invalid date {value:?} on line {lineno}"))]
    InvalidDate {
        source: chrono::ParseError,
        value: String,
        lineno: usize,
    },
    #[snafu(display("Invalid expected date {value:?} (expected YYYY-MM-DD)"))]
    InvalidExpectedDate {
        source: chrono::ParseError,
        value: String,
    },
    #[snafu(display("Error reading source file {path}"))]
    OpeningSource {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Invalid pattern for field {field:?}"))]
    InvalidPattern { source: regex::Error, field: String },
    #[snafu(display("Invalid sampling design: {source}"))]
    Sampling {
        source: sampling_error::SamplingErrors,
    },
    #[snafu(display("Invalid metric {value:?}: expected NAME=FRAGMENT[|FRAGMENT...]"))]
    InvalidMetricArgument { value: String },
    #[snafu(display("Invalid scale for metric {name:?}: {lowest} to {highest}"))]
    InvalidScale {
        name: String,
        lowest: i64,
        highest: i64,
    },
    #[snafu(display("The summary would overwrite the reference {path}"))]
    OutputIsReference { path: String },
    #[snafu(display("Nothing to check: provide an input file, a datasheet or source files"))]
    MissingInput {},
    #[snafu(display("Difference detected between the summary and the reference {path}"))]
    ReferenceMismatch { path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type CheckResult<T> = Result<T, CheckError>;

fn read_survey_data(cfs: &DataSource) -> CheckResult<SurveyTable> {
    info!("Attempting to read survey file {:?}", cfs.file_path);
    match cfs.provider.as_str() {
        "csv" => io_csv::read_csv_table(&cfs.file_path, cfs),
        "xlsx" => io_excel::read_excel_table(&cfs.file_path, cfs),
        x => UnknownProviderSnafu { provider: x }.fail(),
    }
}

/// Loads and concatenates all the data sources. Returns None when no source is configured.
pub fn load_survey_data(sources: &[DataSource]) -> CheckResult<Option<SurveyTable>> {
    let mut data: Option<SurveyTable> = None;
    for cfs in sources {
        let file_data = read_survey_data(cfs)?;
        info!(
            "Read {} responses and {} columns from {:?}",
            file_data.num_rows(),
            file_data.headers.len(),
            cfs.file_path
        );
        data = match data {
            None => Some(file_data),
            Some(mut acc) => {
                acc.append(file_data, &cfs.file_path)?;
                Some(acc)
            }
        };
    }
    Ok(data)
}

fn same_file(a: &str, b: &str) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(x), Ok(y)) => x == y,
        _ => Path::new(a) == Path::new(b),
    }
}

/// Runs every check described by the configuration and the command line.
///
/// Returns false if at least one check failed. Errors are reserved for
/// inputs that cannot be read or understood.
pub fn run_checks(args: &Args) -> CheckResult<bool> {
    let config = match &args.config {
        Some(config_path) => Some(read_config(Path::new(config_path))?),
        None => None,
    };
    let config = merge_args(config, args)?;
    debug!("run_checks: config: {:?}", config);

    if config.data_sources.is_empty()
        && config.datasheet.is_none()
        && config.source_checks.is_empty()
    {
        return MissingInputSnafu {}.fail();
    }

    let output_path = config
        .output_settings
        .as_ref()
        .and_then(|os| os.output_path.clone());
    if let (Some(out), Some(reference_p)) = (&output_path, &args.reference) {
        ensure!(
            !same_file(out, reference_p),
            OutputIsReferenceSnafu {
                path: reference_p.as_str()
            }
        );
    }

    let table = load_survey_data(&config.data_sources)?;

    let datasheet = match &config.datasheet {
        Some(ds) => Some(check_datasheet(ds, table.as_ref().map(|t| t.num_rows() as u64))?),
        None => None,
    };

    let metrics = match &table {
        Some(t) => analyze_metrics(t, &config.metrics, config.segment_column.as_deref()),
        None if !config.metrics.is_empty() => {
            whatever!("Metrics are configured but no data source was provided")
        }
        None => Vec::new(),
    };

    let period = match (&config.period, &table) {
        (Some(p), Some(t)) => Some(check_period(t, p)?),
        (Some(_), None) => {
            whatever!("A fieldwork period is configured but no data source was provided")
        }
        (None, _) => None,
    };

    let mut sources = Vec::new();
    for sc in config.source_checks.iter() {
        sources.push(check_source_file(sc)?);
    }

    let report = CheckReport {
        study_name: config
            .output_settings
            .as_ref()
            .and_then(|os| os.study_name.clone()),
        responses: table.as_ref().map(|t| t.num_rows() as u64),
        datasheet,
        metrics,
        period,
        sources,
    };

    print_report(&report);

    let summary_js = build_summary_js(&report);
    let pretty_js_summary =
        serde_json::to_string_pretty(&summary_js).context(ParsingJsonSnafu {})?;
    // The reference summary, if provided for comparison. It is read before
    // the summary is written.
    let comparison = match &args.reference {
        Some(reference_p) => compare_with_reference(&pretty_js_summary, reference_p),
        None => Ok(()),
    };
    if let Some(out) = &output_path {
        write_summary(&pretty_js_summary, out)?;
    }
    comparison?;

    let failures = report.failures();
    for f in failures.iter() {
        warn!("Failed check: {}", f);
    }
    Ok(failures.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn nothing_to_check() {
        let args = Args::parse_from(["surveycheck"]);
        assert!(matches!(run_checks(&args), Err(CheckError::MissingInput {})));
    }

    #[test]
    fn datasheet_only() {
        let args = Args::parse_from([
            "surveycheck",
            "--population",
            "24067",
            "--sample",
            "1445",
            "--reported-margin",
            "2.5",
        ]);
        assert!(run_checks(&args).unwrap());
    }

    #[test]
    fn wrong_reported_margin_fails() {
        let args = Args::parse_from([
            "surveycheck",
            "--population",
            "24067",
            "--sample",
            "1445",
            "--reported-margin",
            "0.48",
        ]);
        assert!(!run_checks(&args).unwrap());
    }

    #[test]
    fn invalid_design_is_an_error() {
        let args = Args::parse_from(["surveycheck", "--population", "10", "--sample", "11"]);
        assert!(matches!(
            run_checks(&args),
            Err(CheckError::Sampling { .. })
        ));
    }

    #[test]
    fn metrics_need_data() {
        let args = Args::parse_from([
            "surveycheck",
            "--population",
            "100",
            "--sample",
            "10",
            "--metric",
            "Satisfaction=satisfecho",
        ]);
        assert!(matches!(
            run_checks(&args),
            Err(CheckError::Whatever { .. })
        ));
    }

    const EXPORT: &str = "ID;SEGMENTO;La información suministrada es clara y fácil de entender;DATE_MODIFIED
1;Personas;5;2025-04-15 09:00:00
2;Empresas;4;2025-04-15 10:00:00
3;Personas;4;2025-04-16 11:00:00
4;Pymes;3;2025-04-17 18:30:00
";

    const STUDY: &str = r#"{
        "outputSettings": { "studyName": "Pilot", "outputPath": "summary.json" },
        "dataSources": [{ "filePath": "export.csv" }],
        "datasheet": { "universeTotal": 100, "sampleSize": 4, "responseRate": 4 },
        "segmentColumn": "SEGMENTO",
        "metrics": [{ "name": "Clarity", "columnFragments": ["clara"] }],
        "period": {
            "column": "DATE_MODIFIED",
            "expectedStart": "2025-04-15",
            "expectedEnd": "2025-04-17"
        }
    }"#;

    fn study_dir() -> tempfile::TempDir {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("export.csv"), EXPORT).unwrap();
        fs::write(dir.path().join("study.json"), STUDY).unwrap();
        dir
    }

    fn path_str(dir: &tempfile::TempDir, name: &str) -> String {
        dir.path().join(name).to_str().unwrap().to_string()
    }

    #[test]
    fn full_study() {
        let dir = study_dir();
        let config = path_str(&dir, "study.json");
        let args = Args::parse_from(["surveycheck", "--config", config.as_str()]);
        assert!(run_checks(&args).unwrap());

        let js = read_summary(&path_str(&dir, "summary.json")).unwrap();
        assert_eq!(js["study"], "Pilot");
        assert_eq!(js["responses"], 4);
        assert_eq!(js["datasheet"]["observedResponses"], 4);
        assert_eq!(js["datasheet"]["responseRateMatches"], true);
        assert_eq!(js["metrics"][0]["valid"], 4);
        assert_eq!(js["metrics"][0]["status"], "excellent");
        assert_eq!(js["metrics"][0]["segments"][0]["segment"], "Personas");
        assert_eq!(js["period"]["verdict"], "exact");
        assert_eq!(js["period"]["daysWithResponses"], 3);
        assert_eq!(js["passed"], true);
    }

    #[test]
    fn reference_comparison() {
        let dir = study_dir();
        let config = path_str(&dir, "study.json");
        let reference = path_str(&dir, "summary.json");
        let args = Args::parse_from(["surveycheck", "--config", config.as_str()]);
        assert!(run_checks(&args).unwrap());
        let expected = fs::read_to_string(&reference).unwrap();

        // Same results as the reference
        let args = Args::parse_from([
            "surveycheck",
            "--config",
            config.as_str(),
            "--out",
            path_str(&dir, "rerun.json").as_str(),
            "--reference",
            reference.as_str(),
        ]);
        assert!(run_checks(&args).unwrap());

        // The datasheet changed: the summary differs, and is still written
        let args = Args::parse_from([
            "surveycheck",
            "--config",
            config.as_str(),
            "--sample",
            "3",
            "--out",
            path_str(&dir, "changed.json").as_str(),
            "--reference",
            reference.as_str(),
        ]);
        assert!(matches!(
            run_checks(&args),
            Err(CheckError::ReferenceMismatch { .. })
        ));
        let changed = read_summary(&path_str(&dir, "changed.json")).unwrap();
        assert_eq!(changed["datasheet"]["computed"]["sampleSize"], 3);
        assert_eq!(fs::read_to_string(&reference).unwrap(), expected);
    }

    #[test]
    fn output_cannot_replace_reference() {
        let dir = study_dir();
        let config = path_str(&dir, "study.json");
        let reference = path_str(&dir, "summary.json");
        let args = Args::parse_from(["surveycheck", "--config", config.as_str()]);
        assert!(run_checks(&args).unwrap());
        let expected = fs::read_to_string(&reference).unwrap();

        // The configured output path is the reference
        let args = Args::parse_from([
            "surveycheck",
            "--config",
            config.as_str(),
            "--sample",
            "2",
            "--reference",
            reference.as_str(),
        ]);
        assert!(matches!(
            run_checks(&args),
            Err(CheckError::OutputIsReference { .. })
        ));
        assert_eq!(fs::read_to_string(&reference).unwrap(), expected);
    }

    #[test]
    fn unknown_provider() {
        let sources = vec![DataSource {
            provider: "sav".to_string(),
            file_path: "data.sav".to_string(),
            delimiter: None,
            excel_worksheet_name: None,
        }];
        assert!(matches!(
            load_survey_data(&sources),
            Err(CheckError::UnknownProvider { .. })
        ));
        assert!(load_survey_data(&[]).unwrap().is_none());
    }
}
