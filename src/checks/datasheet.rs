use std::fmt::Display;

use log::{info, warn};
use sampling_error::*;
use snafu::prelude::*;

use crate::checks::config_reader::Datasheet;
use crate::checks::{CheckResult, SamplingSnafu};

/// Differences under this value (in percentage points) are rounding noise.
pub const CORRECT_MARGIN_DIFFERENCE: f64 = 0.1;
/// Differences under this value may come from a different calculation method.
pub const SLIGHT_MARGIN_DIFFERENCE: f64 = 0.5;
/// Tolerance on the reported response rate, in percentage points.
pub const RESPONSE_RATE_TOLERANCE: f64 = 0.5;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum MarginVerdict {
    Correct,
    SlightDifference,
    SignificantDiscrepancy,
}

impl MarginVerdict {
    pub fn from_difference(difference: f64) -> MarginVerdict {
        if difference < CORRECT_MARGIN_DIFFERENCE {
            MarginVerdict::Correct
        } else if difference < SLIGHT_MARGIN_DIFFERENCE {
            MarginVerdict::SlightDifference
        } else {
            MarginVerdict::SignificantDiscrepancy
        }
    }
}

impl Display for MarginVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarginVerdict::Correct => write!(f, "correct"),
            MarginVerdict::SlightDifference => write!(f, "slight difference"),
            MarginVerdict::SignificantDiscrepancy => write!(f, "significant discrepancy"),
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct DatasheetReport {
    pub result: MarginOfErrorResult,
    /// In percent.
    pub reported_margin: Option<f64>,
    /// Absolute differences with the reported margin, in percentage points.
    pub difference_uncorrected: Option<f64>,
    pub difference_corrected: Option<f64>,
    pub verdict: Option<MarginVerdict>,
    pub reported_response_rate: Option<f64>,
    pub response_rate_matches: Option<bool>,
    /// The number of responses found in the data sources.
    pub observed_responses: Option<u64>,
    pub simulation: Option<Simulation>,
}

impl DatasheetReport {
    pub fn sample_matches(&self) -> Option<bool> {
        self.observed_responses
            .map(|observed| observed == self.result.sample_size)
    }

    pub fn passed(&self) -> bool {
        self.verdict != Some(MarginVerdict::SignificantDiscrepancy)
            && self.response_rate_matches != Some(false)
            && self.sample_matches() != Some(false)
    }
}

/// Recomputes the margin of error of the datasheet and compares it with the reported values.
///
/// `observed_responses` is the number of rows in the data sources, if any were loaded.
pub fn check_datasheet(
    ds: &Datasheet,
    observed_responses: Option<u64>,
) -> CheckResult<DatasheetReport> {
    let design = SampleDesign {
        population_size: ds.universe_total,
        sample_size: ds.sample_size,
        confidence_level: ds.confidence_level.unwrap_or(DEFAULT_CONFIDENCE_LEVEL),
        assumed_proportion: ds.assumed_proportion.unwrap_or(DEFAULT_PROPORTION),
    };
    let result = run_margin_of_error(&design).context(SamplingSnafu {})?;
    info!(
        "Margin of error: {:.2}% without correction, {:.2}% with finite population correction",
        result.margin_uncorrected_pct(),
        result.margin_corrected_pct()
    );

    let difference_uncorrected = ds
        .reported_margin_of_error
        .map(|reported| (result.margin_uncorrected_pct() - reported).abs());
    let difference_corrected = ds
        .reported_margin_of_error
        .map(|reported| (result.margin_corrected_pct() - reported).abs());
    let verdict = difference_corrected.map(MarginVerdict::from_difference);
    if let Some(v) = verdict {
        if v != MarginVerdict::Correct {
            warn!(
                "Reported margin {:?}% vs computed {:.2}%: {}",
                ds.reported_margin_of_error,
                result.margin_corrected_pct(),
                v
            );
        }
    }

    // Datasheets publish the rate rounded to a whole percent.
    let response_rate_matches = ds.response_rate.map(|reported| {
        (result.response_rate.round() - reported).abs() <= RESPONSE_RATE_TOLERANCE
    });

    let observed_responses = if ds.check_sample_rows.unwrap_or(true) {
        observed_responses
    } else {
        None
    };

    let simulation = if ds.simulate.unwrap_or(false) {
        Some(simulate(ds.universe_total, ds.sample_size).context(SamplingSnafu {})?)
    } else {
        None
    };

    Ok(DatasheetReport {
        result,
        reported_margin: ds.reported_margin_of_error,
        difference_uncorrected,
        difference_corrected,
        verdict,
        reported_response_rate: ds.response_rate,
        response_rate_matches,
        observed_responses,
        simulation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::CheckError;

    fn datasheet(reported: Option<f64>) -> Datasheet {
        Datasheet {
            universe_total: 24067,
            sample_size: 1445,
            confidence_level: Some(0.95),
            assumed_proportion: None,
            reported_margin_of_error: reported,
            response_rate: Some(6.0),
            check_sample_rows: None,
            simulate: None,
        }
    }

    #[test]
    fn reported_margin_is_correct() {
        let r = check_datasheet(&datasheet(Some(2.5)), None).unwrap();
        assert_eq!(r.verdict, Some(MarginVerdict::Correct));
        assert!(r.difference_corrected.unwrap() < 0.01);
        assert!((r.difference_uncorrected.unwrap() - 0.078).abs() < 0.005);
        assert_eq!(r.response_rate_matches, Some(true));
        assert_eq!(r.sample_matches(), None);
        assert!(r.simulation.is_none());
        assert!(r.passed());
    }

    #[test]
    fn inconsistent_reported_margin() {
        let r = check_datasheet(&datasheet(Some(0.48)), None).unwrap();
        assert_eq!(r.verdict, Some(MarginVerdict::SignificantDiscrepancy));
        assert!(!r.passed());
        let r = check_datasheet(&datasheet(Some(2.8)), None).unwrap();
        assert_eq!(r.verdict, Some(MarginVerdict::SlightDifference));
        assert!(r.passed());
    }

    #[test]
    fn observed_rows() {
        let r = check_datasheet(&datasheet(None), Some(1445)).unwrap();
        assert_eq!(r.verdict, None);
        assert_eq!(r.sample_matches(), Some(true));
        let r = check_datasheet(&datasheet(None), Some(1500)).unwrap();
        assert!(!r.passed());
        let ds = Datasheet {
            check_sample_rows: Some(false),
            ..datasheet(None)
        };
        let r = check_datasheet(&ds, Some(1500)).unwrap();
        assert!(r.passed());
    }

    #[test]
    fn wrong_response_rate() {
        let ds = Datasheet {
            response_rate: Some(8.0),
            ..datasheet(None)
        };
        let r = check_datasheet(&ds, None).unwrap();
        assert_eq!(r.response_rate_matches, Some(false));
        assert!(!r.passed());
    }

    #[test]
    fn response_rate_is_rounded() {
        // 1445 / 24067 = 6.004%, published as 6%
        let cases = [
            (5.5, true),
            (6.0, true),
            (6.5, true),
            (5.4, false),
            (7.0, false),
        ];
        for (reported, expected) in cases {
            let ds = Datasheet {
                response_rate: Some(reported),
                ..datasheet(None)
            };
            let r = check_datasheet(&ds, None).unwrap();
            assert_eq!(r.response_rate_matches, Some(expected), "reported {}", reported);
        }
    }

    #[test]
    fn with_simulation() {
        let ds = Datasheet {
            simulate: Some(true),
            ..datasheet(None)
        };
        let r = check_datasheet(&ds, None).unwrap();
        let sim = r.simulation.unwrap();
        assert_eq!(sim.by_confidence_level[1], r.result);
    }

    #[test]
    fn invalid_design() {
        let ds = Datasheet {
            sample_size: 0,
            ..datasheet(None)
        };
        assert!(matches!(
            check_datasheet(&ds, None),
            Err(CheckError::Sampling {
                source: SamplingErrors::InvalidSample { .. }
            })
        ));
    }
}
