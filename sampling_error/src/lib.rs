/*!
Sampling error for survey studies.

The main entry point is [`run_margin_of_error`], which computes the margin of
error of a proportion estimated from a simple random sample, with and without
the finite population correction:

```
use sampling_error::*;

let res = run_margin_of_error(&SampleDesign::new(24067, 1445))?;
assert_eq!(res.z_value, 1.96);
assert!((res.margin_corrected_pct() - 2.50).abs() < 0.01);
# Ok::<(), SamplingErrors>(())
```

The [`builder`] module offers the same computation with optional parameters,
and [`stats`] holds the descriptive statistics used to summarize rating
questions. See the [`manual`] for the formulas.
*/

mod config;
use log::{debug, info};

pub use crate::config::*;

pub mod builder;
pub mod manual;
pub mod stats;

/// The confidence levels explored by [`simulate`].
pub const SWEEP_CONFIDENCE_LEVELS: [f64; 3] = [0.90, 0.95, 0.99];
/// The proportions explored by [`simulate`].
pub const SWEEP_PROPORTIONS: [f64; 5] = [0.1, 0.3, 0.5, 0.7, 0.9];
/// The sample sizes explored by [`simulate`]. Sizes above the population are skipped.
pub const SWEEP_SAMPLE_SIZES: [u64; 5] = [500, 1000, 1445, 2000, 3000];

/// Looks up the critical value of a confidence level.
///
/// Levels that are not in [`Z_TABLE`] silently use the 95% value.
pub fn z_value(confidence_level: f64) -> f64 {
    lookup_z_value(confidence_level).unwrap_or(DEFAULT_Z_VALUE)
}

fn lookup_z_value(confidence_level: f64) -> Option<f64> {
    Z_TABLE
        .iter()
        .find(|(level, _)| (level - confidence_level).abs() < 1e-9)
        .map(|(_, z)| *z)
}

/// Computes the margin of error of a design.
///
/// Arguments are checked in order: population, sample, then proportion.
pub fn run_margin_of_error(design: &SampleDesign) -> Result<MarginOfErrorResult, SamplingErrors> {
    let big_n = design.population_size;
    let n = design.sample_size;
    let p = design.assumed_proportion;

    if big_n <= 1 {
        return Err(SamplingErrors::InvalidPopulation {
            population_size: big_n,
        });
    }
    if n == 0 || n > big_n {
        return Err(SamplingErrors::InvalidSample {
            sample_size: n,
            population_size: big_n,
        });
    }
    if !(p > 0.0 && p < 1.0) {
        return Err(SamplingErrors::InvalidProportion { proportion: p });
    }

    let z = match lookup_z_value(design.confidence_level) {
        Some(z) => z,
        None => {
            debug!(
                "run_margin_of_error: unknown confidence level {}, using z = {}",
                design.confidence_level, DEFAULT_Z_VALUE
            );
            DEFAULT_Z_VALUE
        }
    };

    let margin_uncorrected = z * (p * (1.0 - p) / n as f64).sqrt();
    let correction_factor = ((big_n - n) as f64 / (big_n - 1) as f64).sqrt();
    let margin_corrected = margin_uncorrected * correction_factor;
    let response_rate = n as f64 / big_n as f64 * 100.0;

    let res = MarginOfErrorResult {
        population_size: big_n,
        sample_size: n,
        confidence_level: design.confidence_level,
        assumed_proportion: p,
        z_value: z,
        margin_uncorrected,
        margin_corrected,
        correction_factor,
        response_rate,
    };
    debug!("run_margin_of_error: {:?}", res);
    Ok(res)
}

/// Shortcut for [`run_margin_of_error`] with positional arguments.
pub fn margin_of_error(
    population_size: u64,
    sample_size: u64,
    confidence_level: f64,
    assumed_proportion: f64,
) -> Result<MarginOfErrorResult, SamplingErrors> {
    run_margin_of_error(&SampleDesign {
        population_size,
        sample_size,
        confidence_level,
        assumed_proportion,
    })
}

/// The margins obtained by varying one parameter of a design at a time.
#[derive(PartialEq, Debug, Clone)]
pub struct Simulation {
    pub by_confidence_level: Vec<MarginOfErrorResult>,
    pub by_proportion: Vec<MarginOfErrorResult>,
    pub by_sample_size: Vec<MarginOfErrorResult>,
}

/// Varies the confidence level, the proportion and the sample size of a design.
///
/// The confidence and proportion sweeps keep the sample size of the design,
/// the sample size sweep uses the 95% level and p = 0.5.
pub fn simulate(population_size: u64, sample_size: u64) -> Result<Simulation, SamplingErrors> {
    info!(
        "Simulating margins for population {} and sample {}",
        population_size, sample_size
    );
    let mut by_confidence_level = Vec::new();
    for confidence in SWEEP_CONFIDENCE_LEVELS {
        by_confidence_level.push(margin_of_error(
            population_size,
            sample_size,
            confidence,
            DEFAULT_PROPORTION,
        )?);
    }
    let mut by_proportion = Vec::new();
    for p in SWEEP_PROPORTIONS {
        by_proportion.push(margin_of_error(
            population_size,
            sample_size,
            DEFAULT_CONFIDENCE_LEVEL,
            p,
        )?);
    }
    let mut by_sample_size = Vec::new();
    for n in SWEEP_SAMPLE_SIZES.iter().filter(|n| **n <= population_size) {
        by_sample_size.push(run_margin_of_error(&SampleDesign::new(
            population_size,
            *n,
        ))?);
    }
    Ok(Simulation {
        by_confidence_level,
        by_proportion,
        by_sample_size,
    })
}
