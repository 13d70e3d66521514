use std::fmt::Display;

use log::{debug, info, warn};
use sampling_error::stats::{self, RatingCount, Summary};

use crate::checks::config_reader::MetricConfig;
use crate::checks::io_common::{parse_rating, SurveyTable};

/// Share of high ratings above which the satisfaction is high, in percent.
pub const HIGH_SATISFACTION_SHARE: f64 = 70.0;
/// Share of high ratings under which the satisfaction is low, in percent.
pub const LOW_SATISFACTION_SHARE: f64 = 30.0;
/// Differences of means under this value are not meaningful.
pub const SIMILAR_MEAN_DIFFERENCE: f64 = 0.1;
/// Lowest means of the excellent, good and fair statuses.
pub const EXCELLENT_MEAN: f64 = 4.0;
pub const GOOD_MEAN: f64 = 3.5;
pub const FAIR_MEAN: f64 = 3.0;

/// The status of a metric, from its mean rating.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum MetricStatus {
    Excellent,
    Good,
    Fair,
    Critical,
}

impl MetricStatus {
    pub fn from_mean(mean: f64) -> MetricStatus {
        if mean >= EXCELLENT_MEAN {
            MetricStatus::Excellent
        } else if mean >= GOOD_MEAN {
            MetricStatus::Good
        } else if mean >= FAIR_MEAN {
            MetricStatus::Fair
        } else {
            MetricStatus::Critical
        }
    }
}

impl Display for MetricStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricStatus::Excellent => write!(f, "excellent"),
            MetricStatus::Good => write!(f, "good"),
            MetricStatus::Fair => write!(f, "fair"),
            MetricStatus::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum SatisfactionLevel {
    High,
    Balanced,
    Low,
}

impl SatisfactionLevel {
    pub fn from_high_share(share: f64) -> SatisfactionLevel {
        if share >= HIGH_SATISFACTION_SHARE {
            SatisfactionLevel::High
        } else if share <= LOW_SATISFACTION_SHARE {
            SatisfactionLevel::Low
        } else {
            SatisfactionLevel::Balanced
        }
    }
}

impl Display for SatisfactionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SatisfactionLevel::High => write!(f, "high"),
            SatisfactionLevel::Balanced => write!(f, "balanced"),
            SatisfactionLevel::Low => write!(f, "low"),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Comparison {
    Similar,
    Higher,
    Lower,
}

impl Comparison {
    pub fn from_difference(difference: f64) -> Comparison {
        if difference.abs() < SIMILAR_MEAN_DIFFERENCE {
            Comparison::Similar
        } else if difference > 0.0 {
            Comparison::Higher
        } else {
            Comparison::Lower
        }
    }
}

impl Display for Comparison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Comparison::Similar => write!(f, "similar"),
            Comparison::Higher => write!(f, "higher"),
            Comparison::Lower => write!(f, "lower"),
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct SegmentMean {
    pub segment: String,
    pub mean: f64,
    pub count: u64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct MetricComparison {
    pub other: String,
    pub other_mean: f64,
    /// This metric's mean minus the other one.
    pub difference: f64,
    pub comparison: Comparison,
}

#[derive(PartialEq, Debug, Clone)]
pub struct MetricReport {
    pub name: String,
    pub column: String,
    pub total_rows: u64,
    pub valid: u64,
    pub missing: u64,
    pub completeness: f64,
    pub distribution: Vec<RatingCount>,
    /// None if there is no valid response.
    pub summary: Option<Summary>,
    pub segments: Vec<SegmentMean>,
    pub out_of_range: u64,
    pub high_threshold: f64,
    pub high_share: f64,
    pub satisfaction: Option<SatisfactionLevel>,
    /// None if there is no valid response.
    pub status: Option<MetricStatus>,
    pub comparisons: Vec<MetricComparison>,
}

impl MetricReport {
    pub fn passed(&self) -> bool {
        self.valid > 0 && self.out_of_range == 0
    }
}

#[derive(PartialEq, Debug, Clone)]
pub enum MetricOutcome {
    Found(MetricReport),
    MissingColumn { name: String, fragments: Vec<String> },
}

/// Analyzes all the metrics, then compares their means with each other.
///
/// A metric whose column cannot be found is reported as missing, it does not
/// prevent the other metrics from being analyzed.
pub fn analyze_metrics(
    table: &SurveyTable,
    metrics: &[MetricConfig],
    segment_column: Option<&str>,
) -> Vec<MetricOutcome> {
    let segment_idx = match segment_column {
        Some(name) => {
            let idx = table.column_index(name);
            if idx.is_none() {
                warn!(
                    "analyze_metrics: segment column {:?} not found, skipping segments",
                    name
                );
            }
            idx
        }
        None => None,
    };

    let mut outcomes: Vec<MetricOutcome> = metrics
        .iter()
        .map(|m| match table.find_column(&m.column_fragments) {
            Some(col) => MetricOutcome::Found(analyze_metric(table, m, col, segment_idx)),
            None => {
                warn!(
                    "analyze_metrics: no column for metric {:?} with fragments {:?}",
                    m.name, m.column_fragments
                );
                MetricOutcome::MissingColumn {
                    name: m.name.clone(),
                    fragments: m.column_fragments.clone(),
                }
            }
        })
        .collect();

    // (position in the outcomes, name, mean)
    let means: Vec<(usize, String, f64)> = outcomes
        .iter()
        .enumerate()
        .filter_map(|(idx, o)| match o {
            MetricOutcome::Found(r) => r.summary.as_ref().map(|s| (idx, r.name.clone(), s.mean)),
            MetricOutcome::MissingColumn { .. } => None,
        })
        .collect();
    for (idx, o) in outcomes.iter_mut().enumerate() {
        if let MetricOutcome::Found(r) = o {
            r.comparisons = compare_means(idx, r, &means);
        }
    }
    outcomes
}

fn compare_means(
    idx: usize,
    report: &MetricReport,
    means: &[(usize, String, f64)],
) -> Vec<MetricComparison> {
    let mean = match &report.summary {
        Some(s) => s.mean,
        None => return Vec::new(),
    };
    means
        .iter()
        .filter(|(other_idx, _, _)| *other_idx != idx)
        .map(|(_, name, other_mean)| {
            let difference = mean - other_mean;
            MetricComparison {
                other: name.clone(),
                other_mean: *other_mean,
                difference,
                comparison: Comparison::from_difference(difference),
            }
        })
        .collect()
}

pub fn analyze_metric(
    table: &SurveyTable,
    metric: &MetricConfig,
    col: usize,
    segment_idx: Option<usize>,
) -> MetricReport {
    let column = table.headers[col].clone();
    info!("Metric {:?}: using column {:?}", metric.name, column);

    let values: Vec<f64> = table.column(col).filter_map(parse_rating).collect();
    let total_rows = table.num_rows() as u64;
    let valid = values.len() as u64;
    let (lowest, highest) = metric.scale();
    let high_threshold = metric.high_threshold();
    let high_share = stats::share_at_least(&values, high_threshold);

    let segments = match segment_idx {
        Some(seg_col) => segment_means(table, col, seg_col),
        None => Vec::new(),
    };

    let summary = stats::summarize(&values);
    let status = summary.as_ref().map(|s| MetricStatus::from_mean(s.mean));

    let report = MetricReport {
        name: metric.name.clone(),
        column,
        total_rows,
        valid,
        missing: total_rows - valid,
        completeness: stats::percentage(valid, total_rows),
        distribution: stats::distribution(&values, lowest, highest),
        summary,
        segments,
        out_of_range: stats::count_out_of_range(&values, lowest as f64, highest as f64),
        high_threshold,
        high_share,
        satisfaction: if values.is_empty() {
            None
        } else {
            Some(SatisfactionLevel::from_high_share(high_share))
        },
        status,
        comparisons: Vec::new(),
    };
    debug!("analyze_metric: {:?}", report);
    report
}

/// The mean of the metric for each segment, in order of first appearance.
///
/// Rows without a segment are skipped, and so are segments without any valid rating.
fn segment_means(table: &SurveyTable, col: usize, seg_col: usize) -> Vec<SegmentMean> {
    let mut order: Vec<String> = Vec::new();
    let mut values: Vec<Vec<f64>> = Vec::new();
    for row in 0..table.num_rows() {
        let segment = table.cell(row, seg_col).trim();
        if segment.is_empty() {
            continue;
        }
        let pos = match order.iter().position(|s| s == segment) {
            Some(p) => p,
            None => {
                order.push(segment.to_string());
                values.push(Vec::new());
                order.len() - 1
            }
        };
        if let Some(v) = parse_rating(table.cell(row, col)) {
            values[pos].push(v);
        }
    }
    order
        .into_iter()
        .zip(values)
        .filter_map(|(segment, vs)| {
            stats::mean(&vs).map(|mean| SegmentMean {
                segment,
                mean,
                count: vs.len() as u64,
            })
        })
        .collect()
}
