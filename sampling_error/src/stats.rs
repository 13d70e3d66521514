//! Descriptive statistics for rating questions.
//!
//! All the functions work on the valid responses only. Missing answers should
//! be dropped by the caller before calling them.

use std::cmp::Ordering;

/// Share of `count` over `total`, in percent. Zero when there is nothing to count.
pub fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let n = sorted.len();
    if n % 2 == 0 {
        Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0)
    } else {
        Some(sorted[n / 2])
    }
}

/// The sample standard deviation (with n - 1 degrees of freedom).
///
/// Undefined for less than 2 values.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

pub fn min(values: &[f64]) -> Option<f64> {
    values.iter().cloned().reduce(f64::min)
}

pub fn max(values: &[f64]) -> Option<f64> {
    values.iter().cloned().reduce(f64::max)
}

/// Summary of a set of ratings.
#[derive(PartialEq, Debug, Clone)]
pub struct Summary {
    pub count: u64,
    pub mean: f64,
    pub median: f64,
    /// None with a single response.
    pub std_dev: Option<f64>,
    pub min: f64,
    pub max: f64,
}

/// Summarizes the values, or None if there are no values.
pub fn summarize(values: &[f64]) -> Option<Summary> {
    Some(Summary {
        count: values.len() as u64,
        mean: mean(values)?,
        median: median(values)?,
        std_dev: std_dev(values),
        min: min(values)?,
        max: max(values)?,
    })
}

/// The number and share of responses for one rating.
#[derive(PartialEq, Debug, Clone)]
pub struct RatingCount {
    pub rating: i64,
    pub count: u64,
    pub percentage: f64,
}

/// Counts the responses for each integer rating between `lowest` and
/// `highest` (inclusive).
///
/// Percentages are computed over all the values, so that ratings outside
/// the scale or with a fractional part lower the total share.
pub fn distribution(values: &[f64], lowest: i64, highest: i64) -> Vec<RatingCount> {
    let total = values.len() as u64;
    (lowest..=highest)
        .map(|rating| {
            let count = values.iter().filter(|v| **v == rating as f64).count() as u64;
            RatingCount {
                rating,
                count,
                percentage: percentage(count, total),
            }
        })
        .collect()
}

/// The number of values strictly outside `[lowest, highest]`.
pub fn count_out_of_range(values: &[f64], lowest: f64, highest: f64) -> u64 {
    values
        .iter()
        .filter(|v| **v < lowest || **v > highest)
        .count() as u64
}

/// The share of values greater than or equal to the threshold, in percent.
pub fn share_at_least(values: &[f64], threshold: f64) -> f64 {
    let count = values.iter().filter(|v| **v >= threshold).count() as u64;
    percentage(count, values.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATINGS: [f64; 8] = [5.0, 4.0, 4.0, 3.0, 5.0, 1.0, 2.0, 4.0];

    #[test]
    fn empty_inputs() {
        assert_eq!(mean(&[]), None);
        assert_eq!(median(&[]), None);
        assert_eq!(std_dev(&[3.0]), None);
        assert_eq!(min(&[]), None);
        assert_eq!(summarize(&[]), None);
        assert_eq!(percentage(3, 0), 0.0);
        assert_eq!(share_at_least(&[], 4.0), 0.0);
    }

    #[test]
    fn summary_of_ratings() {
        let s = summarize(&RATINGS).unwrap();
        assert_eq!(s.count, 8);
        assert_eq!(s.mean, 3.5);
        assert_eq!(s.median, 4.0);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 5.0);
        // sum of squares: 2.25 + 0.25 + 0.25 + 0.25 + 2.25 + 6.25 + 2.25 + 0.25 = 14
        let sd = s.std_dev.unwrap();
        assert!((sd - (14.0_f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn odd_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
    }

    #[test]
    fn rating_distribution() {
        let d = distribution(&RATINGS, 1, 5);
        let counts: Vec<u64> = d.iter().map(|rc| rc.count).collect();
        assert_eq!(counts, vec![1, 1, 1, 3, 2]);
        assert_eq!(d[3].rating, 4);
        assert_eq!(d[3].percentage, 37.5);
    }

    #[test]
    fn range_and_share() {
        assert_eq!(count_out_of_range(&[0.0, 1.0, 5.0, 6.0, 3.5], 1.0, 5.0), 2);
        assert_eq!(share_at_least(&RATINGS, 4.0), 62.5);
    }
}
