use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SampleError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

// ---------------------------------------------------------------------------
// AlignedSequences – k equal-length sequences sampled as one tuple
// ---------------------------------------------------------------------------

/// One or more borrowed sequences of identical length, where index `i` of
/// every sequence refers to the same logical sample.
#[derive(Debug, Clone)]
pub struct AlignedSequences<'a, T> {
    columns: Vec<&'a [T]>,
    len: usize,
}

impl<'a, T> AlignedSequences<'a, T> {
    /// Bundle `columns`, rejecting an empty set, empty sequences and
    /// mismatched lengths.
    pub fn new(columns: Vec<&'a [T]>) -> Result<Self, SampleError> {
        let len = match columns.first() {
            Some(first) => first.len(),
            None => {
                return Err(SampleError::InvalidArgument(
                    "at least one sequence is required".to_string(),
                ))
            }
        };
        if len == 0 {
            return Err(SampleError::InvalidArgument(
                "sequences must not be empty".to_string(),
            ));
        }
        if let Some((pos, other)) = columns.iter().enumerate().find(|(_, c)| c.len() != len) {
            return Err(SampleError::InvalidArgument(format!(
                "sequence {pos} has {} values but sequence 0 has {len}",
                other.len()
            )));
        }
        Ok(Self { columns, len })
    }

    /// Number of samples (`n`).
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false once constructed.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn tuple_eq(&self, a: usize, b: usize) -> bool
    where
        T: PartialEq,
    {
        self.columns.iter().all(|c| c[a] == c[b])
    }
}

// ---------------------------------------------------------------------------
// Sampled – kept indices and the values at them
// ---------------------------------------------------------------------------

/// Output of [`sample`]: strictly increasing kept indices and, per input
/// sequence, the values at those indices.
#[derive(Debug, Clone, PartialEq)]
pub struct Sampled<T> {
    pub indices: Vec<usize>,
    pub values: Vec<Vec<T>>,
}

impl<T> Sampled<T> {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Boundary sampling
// ---------------------------------------------------------------------------

/// Keep only the indices where the sample tuple changes or where at least
/// `n * min_gap_frac` indices have passed since the last kept one.
///
/// When a run of suppressed indices is broken, the index just before the
/// breaking one is emitted first, carrying the value of the last kept index,
/// so a line plot through the output draws a step instead of a diagonal.
/// The first and last indices are always kept.
pub fn sample<T: PartialEq + Clone>(
    sequences: &AlignedSequences<'_, T>,
    min_gap_frac: f64,
) -> Result<Sampled<T>, SampleError> {
    if !min_gap_frac.is_finite() || !(0.0..1.0).contains(&min_gap_frac) {
        return Err(SampleError::InvalidArgument(format!(
            "min_gap_frac must be in [0, 1), got {min_gap_frac}"
        )));
    }

    let size = sequences.len();
    let max_index = size - 1;
    let min_gap = size as f64 * min_gap_frac;

    // Kept positions are recorded first and materialised once the scan ends.
    // A boundary entry `(index, source)` carries the tuple at `source`
    // (the last kept index) rather than its own.
    let mut kept: Vec<(usize, usize)> = Vec::new();
    let mut old_index: Option<usize> = None;
    let mut retaining = false;

    for index in 0..size {
        let within_gap = old_index.is_some_and(|old| ((index - old) as f64) < min_gap);
        let no_change = old_index.is_some_and(|old| sequences.tuple_eq(index, old));
        if index != max_index && (no_change || within_gap) {
            retaining = true;
            continue;
        }

        if retaining {
            if let Some(old) = old_index {
                kept.push((index - 1, old));
            }
            retaining = false;
        }

        old_index = Some(index);
        kept.push((index, index));
    }

    let indices: Vec<usize> = kept.iter().map(|&(index, _)| index).collect();
    let values = sequences
        .columns
        .iter()
        .map(|column| kept.iter().map(|&(_, source)| column[source].clone()).collect())
        .collect();

    log::debug!(
        "boundary sampling kept {} of {size} points across {} sequences",
        indices.len(),
        sequences.columns.len()
    );
    Ok(Sampled { indices, values })
}

/// Validate `columns` as [`AlignedSequences`] and [`sample`] them.
pub fn sample_columns<T: PartialEq + Clone>(
    columns: &[&[T]],
    min_gap_frac: f64,
) -> Result<Sampled<T>, SampleError> {
    let aligned = AlignedSequences::new(columns.to_vec())?;
    sample(&aligned, min_gap_frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_run_keeps_boundary_before_change() {
        let out = sample_columns(&[&[1, 1, 1, 1, 5][..]], 0.0).unwrap();
        assert_eq!(out.indices, vec![0, 3, 4]);
        assert_eq!(out.values, vec![vec![1, 1, 5]]);
    }

    #[test]
    fn single_element() {
        let out = sample_columns(&[&[7][..]], 0.0).unwrap();
        assert_eq!(out.indices, vec![0]);
        assert_eq!(out.values, vec![vec![7]]);
    }

    #[test]
    fn constant_sequence_collapses_to_three_points() {
        let data = vec![2.5_f64; 10];
        let out = sample_columns(&[&data[..]], 0.0).unwrap();
        assert_eq!(out.indices, vec![0, 8, 9]);
        assert_eq!(out.values[0], vec![2.5, 2.5, 2.5]);
    }

    #[test]
    fn two_identical_points_are_both_kept() {
        let out = sample_columns(&[&[4, 4][..]], 0.0).unwrap();
        assert_eq!(out.indices, vec![0, 1]);
    }

    #[test]
    fn distinct_values_are_untouched() {
        let data: Vec<i32> = (0..20).collect();
        let out = sample_columns(&[&data[..]], 0.0).unwrap();
        assert_eq!(out.indices, (0..20).collect::<Vec<_>>());
        assert_eq!(out.values[0], data);
    }

    #[test]
    fn tuple_changes_in_any_sequence_count() {
        let x = [1, 1, 1, 1];
        let y = [0, 0, 9, 9];
        let out = sample_columns(&[&x[..], &y[..]], 0.0).unwrap();
        // idx1 suppressed, idx2 breaks the run, idx3 is the last index.
        assert_eq!(out.indices, vec![0, 1, 2, 3]);
        assert_eq!(out.values[0], vec![1, 1, 1, 1]);
        assert_eq!(out.values[1], vec![0, 0, 9, 9]);
    }

    #[test]
    fn gap_suppresses_changing_values() {
        let data: Vec<i32> = (0..10).collect();
        // min_gap = 10 * 0.3 = 3 -> keep every third index.
        let out = sample_columns(&[&data[..]], 0.3).unwrap();
        assert_eq!(out.indices, vec![0, 2, 3, 5, 6, 8, 9]);
        // Boundary points carry the value of the last kept index.
        assert_eq!(out.values[0], vec![0, 0, 3, 3, 6, 6, 9]);
    }

    #[test]
    fn nan_always_counts_as_change() {
        let data = [f64::NAN, f64::NAN, f64::NAN];
        let out = sample_columns(&[&data[..]], 0.0).unwrap();
        assert_eq!(out.indices, vec![0, 1, 2]);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let err = sample_columns(&[&[1, 2, 3][..], &[1, 2][..]], 0.0).unwrap_err();
        assert!(matches!(err, SampleError::InvalidArgument(_)));
    }

    #[test]
    fn empty_inputs_are_rejected() {
        let none: [&[i32]; 0] = [];
        assert!(matches!(
            sample_columns(&none, 0.0),
            Err(SampleError::InvalidArgument(_))
        ));
        let empty: &[i32] = &[];
        assert!(matches!(
            sample_columns(&[empty], 0.0),
            Err(SampleError::InvalidArgument(_))
        ));
    }

    #[test]
    fn gap_fraction_out_of_range_is_rejected() {
        for frac in [-0.1, 1.0, 2.0, f64::NAN, f64::INFINITY] {
            assert!(
                sample_columns(&[&[1, 2][..]], frac).is_err(),
                "min_gap_frac {frac} accepted"
            );
        }
    }
}
