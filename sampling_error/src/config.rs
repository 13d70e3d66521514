// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// The confidence level used when none is requested.
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

/// The most conservative assumption for the proportion: it maximizes p * (1 - p).
pub const DEFAULT_PROPORTION: f64 = 0.5;

/// Critical value used when the confidence level is not in [`Z_TABLE`].
pub const DEFAULT_Z_VALUE: f64 = 1.96;

/// The recognized confidence levels and their two-sided critical values.
pub const Z_TABLE: [(f64, f64); 3] = [(0.90, 1.645), (0.95, 1.96), (0.99, 2.576)];

/// Parameters of a single margin of error calculation.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct SampleDesign {
    /// The total universe size (N).
    pub population_size: u64,
    /// The number of effective respondents (n).
    pub sample_size: u64,
    pub confidence_level: f64,
    pub assumed_proportion: f64,
}

impl SampleDesign {
    /// A design with the default confidence level (95%) and proportion (0.5).
    pub fn new(population_size: u64, sample_size: u64) -> SampleDesign {
        SampleDesign {
            population_size,
            sample_size,
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            assumed_proportion: DEFAULT_PROPORTION,
        }
    }
}

// ******** Output data structures *********

/// The outcome of a margin of error calculation.
///
/// All the margins are expressed as fractions (0.025 is 2.5%). The response
/// rate is already a percentage.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct MarginOfErrorResult {
    pub population_size: u64,
    pub sample_size: u64,
    pub confidence_level: f64,
    pub assumed_proportion: f64,
    pub z_value: f64,
    pub margin_uncorrected: f64,
    pub margin_corrected: f64,
    /// sqrt((N - n) / (N - 1))
    pub correction_factor: f64,
    pub response_rate: f64,
}

impl MarginOfErrorResult {
    /// The margin before the finite population correction, in percent.
    pub fn margin_uncorrected_pct(&self) -> f64 {
        self.margin_uncorrected * 100.0
    }

    /// The margin after the finite population correction, in percent.
    pub fn margin_corrected_pct(&self) -> f64 {
        self.margin_corrected * 100.0
    }

    /// True when the whole population answered.
    pub fn is_census(&self) -> bool {
        self.sample_size == self.population_size
    }
}

/// Errors that prevent a margin of error from being computed.
#[derive(PartialEq, Debug, Clone)]
pub enum SamplingErrors {
    /// The population must have at least 2 elements.
    InvalidPopulation { population_size: u64 },
    /// The sample must be between 1 and the population size.
    InvalidSample {
        sample_size: u64,
        population_size: u64,
    },
    /// The proportion must be strictly between 0 and 1.
    InvalidProportion { proportion: f64 },
}

impl Error for SamplingErrors {}

impl Display for SamplingErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SamplingErrors::InvalidPopulation { population_size } => write!(
                f,
                "invalid population size {}: at least 2 elements are required",
                population_size
            ),
            SamplingErrors::InvalidSample {
                sample_size,
                population_size,
            } => write!(
                f,
                "invalid sample size {}: it must be between 1 and the population size {}",
                sample_size, population_size
            ),
            SamplingErrors::InvalidProportion { proportion } => write!(
                f,
                "invalid proportion {}: it must be strictly between 0 and 1",
                proportion
            ),
        }
    }
}
