//! Empirical cumulative distribution curves for step plots.

use thiserror::Error;

use crate::sample::{sample_columns, SampleError};

#[derive(Debug, Error)]
pub enum CdfError {
    #[error("no non-NaN values to build a CDF from")]
    Empty,
    #[error("population total {total} is smaller than the {count} values given")]
    Total { total: usize, count: usize },
    #[error(transparent)]
    Sample(#[from] SampleError),
}

/// Sorted values with their cumulative weight as a fraction of a population.
///
/// The population may be larger than the value set, so the curve of a
/// subset ends below 1 and shares an axis with the curve of the whole.
#[derive(Debug, Clone, PartialEq)]
pub struct EmpiricalCdf {
    pub values: Vec<f64>,
    pub fractions: Vec<f64>,
}

impl EmpiricalCdf {
    /// Build the curve of `values` over a population of `total`. NaN is dropped.
    pub fn new(values: &[f64], total: usize) -> Result<Self, CdfError> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        if sorted.is_empty() {
            return Err(CdfError::Empty);
        }
        if total < sorted.len() {
            return Err(CdfError::Total {
                total,
                count: sorted.len(),
            });
        }
        sorted.sort_by(f64::total_cmp);
        let fractions = (1..=sorted.len())
            .map(|rank| rank as f64 / total as f64)
            .collect();
        Ok(Self {
            values: sorted,
            fractions,
        })
    }

    /// Build the curve of `values` over their own count.
    pub fn of(values: &[f64]) -> Result<Self, CdfError> {
        let count = values.iter().filter(|v| !v.is_nan()).count();
        Self::new(values, count)
    }

    /// Append a final point at the largest value with fraction 1.
    pub fn close(mut self) -> Self {
        if let Some(&last) = self.values.last() {
            self.values.push(last);
            self.fractions.push(1.0);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Reduce the curve with boundary sampling, returning `(value, fraction)`
    /// points ready to draw.
    pub fn sampled(&self, min_gap_frac: f64) -> Result<Vec<(f64, f64)>, CdfError> {
        let out = sample_columns(&[&self.values[..], &self.fractions[..]], min_gap_frac)?;
        Ok(out.values[0]
            .iter()
            .copied()
            .zip(out.values[1].iter().copied())
            .collect())
    }
}
