use clap::Parser;

/// Checks the margin of error of a survey, the consistency of its data and of the
/// dashboards that present it.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON file describing the study: datasheet, data sources, metrics,
    /// fieldwork period and source files to check. Relative paths in this file are resolved
    /// against the directory of the file.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) A reference summary in JSON format. If provided, surveycheck will check that
    /// the computed summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of the checks will be written in
    /// JSON format to the given location. Setting this option overrides the path that may be
    /// specified with the --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) The survey responses. Setting this option overrides the data sources
    /// of the --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (csv or xlsx) The type of the input. By default, inferred from the extension of the file.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (default ';') The field delimiter of CSV inputs. Use '\t' for tabs.
    #[clap(long, value_parser)]
    pub delimiter: Option<String>,

    /// (default: the first worksheet) When using an Excel file, indicates the name of the
    /// worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// The size of the universe (N).
    #[clap(long, value_parser)]
    pub population: Option<u64>,

    /// The number of responses (n).
    #[clap(long, value_parser)]
    pub sample: Option<u64>,

    /// (default 0.95) The confidence level, as a fraction.
    #[clap(long, value_parser)]
    pub confidence: Option<f64>,

    /// (default 0.5) The assumed proportion p.
    #[clap(long, value_parser)]
    pub proportion: Option<f64>,

    /// The margin of error published with the study, in percent.
    #[clap(long, value_parser)]
    pub reported_margin: Option<f64>,

    /// If passed as an argument, the margin of error is also computed for other confidence
    /// levels, proportions and sample sizes.
    #[clap(long, takes_value = false)]
    pub simulate: bool,

    /// (NAME=FRAGMENT[|FRAGMENT...], repeatable) A metric to analyze. The column is the first one
    /// whose header contains all the fragments. Overrides the metrics of the --config option.
    #[clap(long, value_parser)]
    pub metric: Option<Vec<String>>,

    /// (column name) If specified, the mean of each metric is also computed for each value of
    /// this column.
    #[clap(long, value_parser)]
    pub segment_column: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
