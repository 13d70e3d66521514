use std::fs;

use log::{debug, info, warn};
use sampling_error::MarginOfErrorResult;
use serde_json::json;
use serde_json::Value as JSValue;
use snafu::prelude::*;
use text_diff::print_diff;

use crate::checks::datasheet::{DatasheetReport, MarginVerdict};
use crate::checks::metrics::{MetricOutcome, MetricReport};
use crate::checks::period::{DayCount, PeriodReport};
use crate::checks::sources::{FieldOutcome, SourceReport};
use crate::checks::{
    CheckResult, OpeningJsonSnafu, ParsingJsonSnafu, ReferenceMismatchSnafu, WritingSummarySnafu,
};

/// Everything computed during one run.
#[derive(PartialEq, Debug, Clone)]
pub struct CheckReport {
    pub study_name: Option<String>,
    /// The number of responses in the data sources, if any was loaded.
    pub responses: Option<u64>,
    pub datasheet: Option<DatasheetReport>,
    pub metrics: Vec<MetricOutcome>,
    pub period: Option<PeriodReport>,
    pub sources: Vec<SourceReport>,
}

impl CheckReport {
    /// A description of every check that did not pass.
    pub fn failures(&self) -> Vec<String> {
        let mut res: Vec<String> = Vec::new();
        if let Some(ds) = &self.datasheet {
            if let (Some(MarginVerdict::SignificantDiscrepancy), Some(reported)) =
                (ds.verdict, ds.reported_margin)
            {
                res.push(format!(
                    "margin of error: {} (reported {}%, computed {:.2}%)",
                    MarginVerdict::SignificantDiscrepancy,
                    reported,
                    ds.result.margin_corrected_pct()
                ));
            }
            if let (Some(false), Some(reported)) =
                (ds.response_rate_matches, ds.reported_response_rate)
            {
                res.push(format!(
                    "response rate: reported {}%, computed {:.2}%",
                    reported, ds.result.response_rate
                ));
            }
            if ds.sample_matches() == Some(false) {
                res.push(format!(
                    "sample size: {} responses in the data, {} in the datasheet",
                    ds.observed_responses.unwrap_or(0),
                    ds.result.sample_size
                ));
            }
        }
        for m in self.metrics.iter() {
            match m {
                MetricOutcome::Found(r) if r.valid == 0 => {
                    res.push(format!("metric {}: no valid response", r.name))
                }
                MetricOutcome::Found(r) if !r.passed() => res.push(format!(
                    "metric {}: {} values out of range",
                    r.name, r.out_of_range
                )),
                MetricOutcome::Found(_) => {}
                MetricOutcome::MissingColumn { name, .. } => {
                    res.push(format!("metric {}: column not found", name))
                }
            }
        }
        if let Some(p) = self.period.as_ref().filter(|p| !p.passed()) {
            res.push(format!("fieldwork period: {}", p.verdict));
        }
        for s in self.sources.iter() {
            res.extend(s.failures());
        }
        res
    }
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

fn margin_to_json(r: &MarginOfErrorResult) -> JSValue {
    json!({
        "universeTotal": r.population_size,
        "sampleSize": r.sample_size,
        "confidenceLevel": r.confidence_level,
        "assumedProportion": r.assumed_proportion,
        "z": r.z_value,
        "marginUncorrected": round4(r.margin_uncorrected_pct()),
        "marginCorrected": round4(r.margin_corrected_pct()),
        "correctionFactor": round4(r.correction_factor),
        "responseRate": round4(r.response_rate),
    })
}

fn datasheet_to_json(ds: &DatasheetReport) -> JSValue {
    let mut js = json!({
        "computed": margin_to_json(&ds.result),
        "reportedMarginOfError": ds.reported_margin,
        "differenceCorrected": ds.difference_corrected.map(round4),
        "differenceUncorrected": ds.difference_uncorrected.map(round4),
        "verdict": ds.verdict.map(|v| v.to_string()),
        "reportedResponseRate": ds.reported_response_rate,
        "responseRateMatches": ds.response_rate_matches,
        "observedResponses": ds.observed_responses,
        "passed": ds.passed(),
    });
    if let Some(sim) = &ds.simulation {
        let sweep = |rs: &[MarginOfErrorResult]| -> Vec<JSValue> {
            rs.iter().map(margin_to_json).collect()
        };
        js["simulation"] = json!({
            "byConfidenceLevel": sweep(&sim.by_confidence_level),
            "byProportion": sweep(&sim.by_proportion),
            "bySampleSize": sweep(&sim.by_sample_size),
        });
    }
    js
}

fn metric_to_json(r: &MetricReport) -> JSValue {
    let distribution: Vec<JSValue> = r
        .distribution
        .iter()
        .map(|rc| json!({"rating": rc.rating, "count": rc.count, "percentage": round4(rc.percentage)}))
        .collect();
    let segments: Vec<JSValue> = r
        .segments
        .iter()
        .map(|s| json!({"segment": s.segment, "mean": round4(s.mean), "count": s.count}))
        .collect();
    let comparisons: Vec<JSValue> = r
        .comparisons
        .iter()
        .map(|c| {
            json!({
                "other": c.other,
                "otherMean": round4(c.other_mean),
                "difference": round4(c.difference),
                "comparison": c.comparison.to_string(),
            })
        })
        .collect();
    let summary = r.summary.as_ref().map(|s| {
        json!({
            "mean": round4(s.mean),
            "median": s.median,
            "stdDev": s.std_dev.map(round4),
            "min": s.min,
            "max": s.max,
        })
    });
    json!({
        "name": r.name,
        "column": r.column,
        "totalRows": r.total_rows,
        "valid": r.valid,
        "missing": r.missing,
        "completeness": round4(r.completeness),
        "distribution": distribution,
        "summary": summary,
        "segments": segments,
        "outOfRange": r.out_of_range,
        "highThreshold": r.high_threshold,
        "highShare": round4(r.high_share),
        "satisfaction": r.satisfaction.map(|s| s.to_string()),
        "status": r.status.map(|s| s.to_string()),
        "comparisons": comparisons,
        "passed": r.passed(),
    })
}

fn day_to_json(dc: &DayCount) -> JSValue {
    json!({"day": dc.day.to_string(), "count": dc.count})
}

fn period_to_json(p: &PeriodReport) -> JSValue {
    json!({
        "column": p.column,
        "first": p.first.to_string(),
        "last": p.last.to_string(),
        "durationDays": p.duration_days,
        "expectedStart": p.expected_start.to_string(),
        "expectedEnd": p.expected_end.to_string(),
        "startDifferenceDays": p.start_difference_days,
        "endDifferenceDays": p.end_difference_days,
        "verdict": p.verdict.to_string(),
        "daysWithResponses": p.days_with_responses,
        "busiestDay": day_to_json(&p.busiest_day),
        "quietestDay": day_to_json(&p.quietest_day),
        "meanPerDay": round4(p.mean_per_day),
        "passed": p.passed(),
    })
}

fn source_to_json(s: &SourceReport) -> JSValue {
    let fields: Vec<JSValue> = s
        .fields
        .iter()
        .map(|f| {
            let (status, found) = match &f.outcome {
                FieldOutcome::Match { found } => ("match", Some(found.clone())),
                FieldOutcome::Mismatch { found } => ("mismatch", Some(found.clone())),
                FieldOutcome::NotFound => ("notFound", None),
            };
            json!({"field": f.name, "expected": f.expected, "found": found, "status": status})
        })
        .collect();
    let literals: Vec<JSValue> = s
        .literals
        .iter()
        .map(|l| json!({"text": l.text, "found": l.found}))
        .collect();
    json!({"file": s.file_name, "fields": fields, "literals": literals})
}

/// The JSON summary of a run. It does not contain absolute paths, so that it
/// can be compared with a reference summary.
pub fn build_summary_js(report: &CheckReport) -> JSValue {
    let metrics: Vec<JSValue> = report
        .metrics
        .iter()
        .map(|m| match m {
            MetricOutcome::Found(r) => metric_to_json(r),
            MetricOutcome::MissingColumn { name, fragments } => {
                json!({"name": name, "columnFragments": fragments, "missingColumn": true, "passed": false})
            }
        })
        .collect();
    let failures = report.failures();
    json!({
        "study": report.study_name,
        "responses": report.responses,
        "datasheet": report.datasheet.as_ref().map(datasheet_to_json),
        "metrics": metrics,
        "period": report.period.as_ref().map(period_to_json),
        "sources": report.sources.iter().map(source_to_json).collect::<Vec<JSValue>>(),
        "failures": failures,
        "passed": failures.is_empty(),
    })
}

fn mark(passed: bool) -> &'static str {
    if passed {
        "[ok]  "
    } else {
        "[FAIL]"
    }
}

fn print_datasheet(ds: &DatasheetReport) {
    let r = &ds.result;
    println!("{} Margin of error", mark(ds.passed()));
    println!("    universe (N): {}", r.population_size);
    println!("    sample (n): {}", r.sample_size);
    println!(
        "    confidence: {}% (z = {})",
        r.confidence_level * 100.0,
        r.z_value
    );
    println!("    proportion (p): {}", r.assumed_proportion);
    println!("    response rate: {:.2}%", r.response_rate);
    println!(
        "    margin without correction: {:.2}%",
        r.margin_uncorrected_pct()
    );
    println!(
        "    margin with finite population correction: {:.2}% (factor {:.4})",
        r.margin_corrected_pct(),
        r.correction_factor
    );
    if let (Some(reported), Some(diff), Some(verdict)) =
        (ds.reported_margin, ds.difference_corrected, ds.verdict)
    {
        println!(
            "    reported: {}%, difference {:.2} points: {}",
            reported, diff, verdict
        );
    }
    if let (Some(reported), Some(matches)) = (ds.reported_response_rate, ds.response_rate_matches)
    {
        println!(
            "    reported response rate: {}% ({})",
            reported,
            if matches { "consistent" } else { "inconsistent" }
        );
    }
    if let Some(observed) = ds.observed_responses {
        println!("    responses in the data: {}", observed);
    }
    if let Some(sim) = &ds.simulation {
        println!("    margin by confidence level:");
        for m in sim.by_confidence_level.iter() {
            println!(
                "      {}%: {:.2}%",
                m.confidence_level * 100.0,
                m.margin_corrected_pct()
            );
        }
        println!("    margin by proportion:");
        for m in sim.by_proportion.iter() {
            println!(
                "      p = {}: {:.2}%",
                m.assumed_proportion,
                m.margin_corrected_pct()
            );
        }
        println!("    margin by sample size:");
        for m in sim.by_sample_size.iter() {
            println!("      n = {}: {:.2}%", m.sample_size, m.margin_corrected_pct());
        }
    }
}

fn print_metric(r: &MetricReport) {
    println!("{} Metric {}", mark(r.passed()), r.name);
    println!("    column: {}", r.column);
    println!(
        "    valid responses: {} of {} ({:.1}%), missing: {}",
        r.valid, r.total_rows, r.completeness, r.missing
    );
    for rc in r.distribution.iter() {
        println!(
            "      rating {}: {} ({:.1}%)",
            rc.rating, rc.count, rc.percentage
        );
    }
    if let Some(s) = &r.summary {
        println!(
            "    mean {:.2}, median {:.1}, min {}, max {}",
            s.mean, s.median, s.min, s.max
        );
        if let Some(sd) = s.std_dev {
            println!("    standard deviation {:.2}", sd);
        }
    }
    for s in r.segments.iter() {
        println!("    segment {}: {:.2} (n={})", s.segment, s.mean, s.count);
    }
    if r.out_of_range > 0 {
        println!("    values out of range: {}", r.out_of_range);
    }
    if let Some(status) = r.status {
        println!("    status: {}", status);
    }
    if let Some(level) = r.satisfaction {
        println!(
            "    {:.1}% rated {} or more: {} satisfaction",
            r.high_share, r.high_threshold, level
        );
    }
    for c in r.comparisons.iter() {
        println!(
            "    vs {}: {:.2} ({}, difference {:+.2})",
            c.other, c.other_mean, c.comparison, c.difference
        );
    }
}

fn print_period(p: &PeriodReport) {
    println!("{} Fieldwork period", mark(p.passed()));
    println!(
        "    responses from {} to {} ({} days)",
        p.first, p.last, p.duration_days
    );
    println!(
        "    expected from {} to {}: {} / {} days apart",
        p.expected_start, p.expected_end, p.start_difference_days, p.end_difference_days
    );
    println!("    verdict: {}", p.verdict);
    println!(
        "    {} days with responses, {:.1} per day",
        p.days_with_responses, p.mean_per_day
    );
    println!(
        "    busiest day: {} ({}), quietest day: {} ({})",
        p.busiest_day.day, p.busiest_day.count, p.quietest_day.day, p.quietest_day.count
    );
}

fn print_source(s: &SourceReport) {
    println!("{} Source {}", mark(s.failures().is_empty()), s.file_name);
    for f in s.fields.iter() {
        match &f.outcome {
            FieldOutcome::Match { found } => println!("    {}: {:?}", f.name, found),
            FieldOutcome::Mismatch { found } => {
                println!("    {}: {:?} (expected {:?})", f.name, found, f.expected)
            }
            FieldOutcome::NotFound => println!("    {}: not found", f.name),
        }
    }
    for l in s.literals.iter() {
        match &l.found {
            Some(t) => println!("    found {:?}", t),
            None => println!("    missing {:?}", l.text),
        }
    }
}

/// Prints the human readable report on the standard output.
pub fn print_report(report: &CheckReport) {
    if let Some(name) = &report.study_name {
        println!("{}", name);
    }
    if let Some(n) = report.responses {
        println!("{} responses", n);
    }
    if let Some(ds) = &report.datasheet {
        print_datasheet(ds);
    }
    for m in report.metrics.iter() {
        match m {
            MetricOutcome::Found(r) => print_metric(r),
            MetricOutcome::MissingColumn { name, fragments } => println!(
                "{} Metric {}: no column matching {:?}",
                mark(false),
                name,
                fragments
            ),
        }
    }
    if let Some(p) = &report.period {
        print_period(p);
    }
    for s in report.sources.iter() {
        print_source(s);
    }
    let failures = report.failures();
    if failures.is_empty() {
        println!("All the checks passed");
    } else {
        println!("{} failed checks:", failures.len());
        for f in failures.iter() {
            println!("    {}", f);
        }
    }
}

/// Writes the summary to a file, or to the standard output if `out` is `stdout`.
pub fn write_summary(pretty_js_summary: &str, out: &str) -> CheckResult<()> {
    if out == "stdout" {
        println!("summary:{}", pretty_js_summary);
    } else {
        info!("Writing summary to {:?}", out);
        fs::write(out, pretty_js_summary).context(WritingSummarySnafu { path: out })?;
    }
    Ok(())
}

pub fn read_summary(path: &str) -> CheckResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    debug!("read_summary: {} bytes", contents.len());
    serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})
}

/// Fails if the summary differs from the reference summary stored at `reference_path`.
pub fn compare_with_reference(pretty_js_summary: &str, reference_path: &str) -> CheckResult<()> {
    let summary_ref = read_summary(reference_path)?;
    let pretty_js_summary_ref =
        serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
    if pretty_js_summary_ref != pretty_js_summary {
        warn!("Found differences with the reference summary");
        print_diff(pretty_js_summary_ref.as_str(), pretty_js_summary, "\n");
        return ReferenceMismatchSnafu {
            path: reference_path,
        }
        .fail();
    }
    info!("The summary matches the reference {:?}", reference_path);
    Ok(())
}
