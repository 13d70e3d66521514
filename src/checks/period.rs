use std::collections::BTreeMap;
use std::fmt::Display;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use log::{debug, info};
use snafu::prelude::*;

use crate::checks::config_reader::PeriodConfig;
use crate::checks::io_common::SurveyTable;
use crate::checks::{CheckResult, InvalidDateSnafu, InvalidExpectedDateSnafu, MissingColumnSnafu};

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum PeriodVerdict {
    Exact,
    Acceptable,
    Review,
    Critical,
}

impl PeriodVerdict {
    pub fn from_differences(start_days: i64, end_days: i64) -> PeriodVerdict {
        let worst = start_days.max(end_days);
        if worst == 0 {
            PeriodVerdict::Exact
        } else if worst <= 1 {
            PeriodVerdict::Acceptable
        } else if worst <= 7 {
            PeriodVerdict::Review
        } else {
            PeriodVerdict::Critical
        }
    }
}

impl Display for PeriodVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeriodVerdict::Exact => write!(f, "exact"),
            PeriodVerdict::Acceptable => write!(f, "acceptable (1 day or less)"),
            PeriodVerdict::Review => write!(f, "review (7 days or less)"),
            PeriodVerdict::Critical => write!(f, "critical (more than 7 days)"),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct DayCount {
    pub day: NaiveDate,
    pub count: u64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct PeriodReport {
    pub column: String,
    pub first: NaiveDateTime,
    pub last: NaiveDateTime,
    pub duration_days: i64,
    pub expected_start: NaiveDate,
    pub expected_end: NaiveDate,
    pub start_difference_days: i64,
    pub end_difference_days: i64,
    pub verdict: PeriodVerdict,
    pub days_with_responses: u64,
    pub busiest_day: DayCount,
    pub quietest_day: DayCount,
    pub mean_per_day: f64,
    /// Responses per day, in date order.
    pub daily: Vec<DayCount>,
}

impl PeriodReport {
    pub fn passed(&self) -> bool {
        self.verdict != PeriodVerdict::Critical
    }
}

/// Parses a timestamp, accepting formats without a time of day.
pub fn parse_timestamp(value: &str, format: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(value, format).or_else(|e| {
        NaiveDate::parse_from_str(value, format)
            .map(|d| d.and_time(NaiveTime::MIN))
            .map_err(|_| e)
    })
}

fn parse_expected(value: &str) -> CheckResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").context(InvalidExpectedDateSnafu { value })
}

/// Compares the dates of the responses with the fieldwork period of the study.
pub fn check_period(table: &SurveyTable, cfg: &PeriodConfig) -> CheckResult<PeriodReport> {
    let col = table.column_index(&cfg.column).context(MissingColumnSnafu {
        column: cfg.column.as_str(),
    })?;
    let expected_start = parse_expected(&cfg.expected_start)?;
    let expected_end = parse_expected(&cfg.expected_end)?;
    let format = cfg.format();

    let mut timestamps: Vec<NaiveDateTime> = Vec::new();
    for (idx, cell) in table.column(col).enumerate() {
        let cell = cell.trim();
        if cell.is_empty() {
            continue;
        }
        // Line 1 is the header
        let lineno = idx + 2;
        let ts = parse_timestamp(cell, format).context(InvalidDateSnafu {
            value: cell,
            lineno,
        })?;
        timestamps.push(ts);
    }
    debug!("check_period: {} timestamps", timestamps.len());

    let (first, last) = match (timestamps.iter().min(), timestamps.iter().max()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => whatever!("No date found in column {:?}", cfg.column),
    };

    let mut per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for ts in timestamps.iter() {
        *per_day.entry(ts.date()).or_insert(0) += 1;
    }
    let daily: Vec<DayCount> = per_day
        .into_iter()
        .map(|(day, count)| DayCount { day, count })
        .collect();
    // Ties go to the earliest day.
    let mut busiest_day = daily[0];
    let mut quietest_day = daily[0];
    for dc in daily.iter() {
        if dc.count > busiest_day.count {
            busiest_day = *dc;
        }
        if dc.count < quietest_day.count {
            quietest_day = *dc;
        }
    }

    let start_difference_days = (first.date() - expected_start).num_days().abs();
    let end_difference_days = (last.date() - expected_end).num_days().abs();
    let verdict = PeriodVerdict::from_differences(start_difference_days, end_difference_days);
    info!(
        "Fieldwork from {} to {} (expected {} to {}): {}",
        first, last, expected_start, expected_end, verdict
    );

    Ok(PeriodReport {
        column: cfg.column.clone(),
        first,
        last,
        duration_days: (last - first).num_days(),
        expected_start,
        expected_end,
        start_difference_days,
        end_difference_days,
        verdict,
        days_with_responses: daily.len() as u64,
        busiest_day,
        quietest_day,
        mean_per_day: timestamps.len() as f64 / daily.len() as f64,
        daily,
    })
}
