pub use crate::config::*;

/// A builder for margin of error calculations.
///
/// The population and the sample are required, the confidence level and the
/// assumed proportion default to 95% and 0.5.
///
/// ```
/// pub use sampling_error::builder::Builder;
/// # use sampling_error::SamplingErrors;
///
/// let res = Builder::new(24067, 1445)?
///     .confidence_level(0.99)
///     .assumed_proportion(0.3)
///     .compute()?;
///
/// assert_eq!(res.z_value, 2.576);
/// # Ok::<(), SamplingErrors>(())
/// ```
pub struct Builder {
    pub(crate) _design: SampleDesign,
}

impl Builder {
    /// Fails early if the population or the sample cannot be used.
    pub fn new(population_size: u64, sample_size: u64) -> Result<Builder, SamplingErrors> {
        if population_size <= 1 {
            return Err(SamplingErrors::InvalidPopulation { population_size });
        }
        if sample_size == 0 || sample_size > population_size {
            return Err(SamplingErrors::InvalidSample {
                sample_size,
                population_size,
            });
        }
        Ok(Builder {
            _design: SampleDesign::new(population_size, sample_size),
        })
    }

    /// One of 0.90, 0.95 or 0.99. Other values use the critical value of 0.95.
    pub fn confidence_level(self, confidence_level: f64) -> Builder {
        Builder {
            _design: SampleDesign {
                confidence_level,
                ..self._design
            },
        }
    }

    pub fn assumed_proportion(self, assumed_proportion: f64) -> Builder {
        Builder {
            _design: SampleDesign {
                assumed_proportion,
                ..self._design
            },
        }
    }

    pub fn design(&self) -> &SampleDesign {
        &self._design
    }

    pub fn compute(&self) -> Result<MarginOfErrorResult, SamplingErrors> {
        crate::run_margin_of_error(&self._design)
    }
}
