use std::fmt::Write as _;

use anyhow::{Context, Result};
use itertools::Itertools;

use crate::data::model::Table;

/// Descriptive statistics for one numeric column, laid out like a
/// dataframe `describe()`.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub count: usize,
    /// Sum of the non-NaN values.
    pub sum: f64,
    pub mean: f64,
    /// Sample standard deviation (n - 1); `NaN` for a single value.
    pub std_dev: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

impl Summary {
    /// Compute statistics from values, filtering out NaN.
    pub fn compute(values: &[f64]) -> Option<Self> {
        let mut vals: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        if vals.is_empty() {
            return None;
        }
        vals.sort_by(f64::total_cmp);

        let count = vals.len();
        let sum = vals.iter().sum::<f64>();
        let mean = sum / count as f64;
        let std_dev = if count > 1 {
            let variance =
                vals.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
            variance.sqrt()
        } else {
            f64::NAN
        };

        Some(Summary {
            count,
            sum,
            mean,
            std_dev,
            min: vals[0],
            q25: quantile_sorted(&vals, 0.25),
            median: quantile_sorted(&vals, 0.5),
            q75: quantile_sorted(&vals, 0.75),
            max: vals[count - 1],
        })
    }
}

/// Linearly interpolated quantile of ascending, non-empty `sorted`.
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// A [`Summary`] for every numeric column, in column order.
pub fn describe(table: &Table) -> Vec<(String, Summary)> {
    table
        .column_names
        .iter()
        .enumerate()
        .filter(|&(idx, _)| table.is_numeric(idx))
        .filter_map(|(_, name)| {
            let values = table.numeric_column(name).ok()?;
            Summary::compute(&values).map(|s| (name.clone(), s))
        })
        .collect()
}

/// Render `describe` output as an aligned text table, one column per row.
pub fn describe_report(summaries: &[(String, Summary)]) -> String {
    let width = summaries
        .iter()
        .map(|(name, _)| name.len())
        .max()
        .unwrap_or(0)
        .max(6);
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<width$} {:>10} {:>14} {:>14} {:>12} {:>12} {:>12} {:>12} {:>14}",
        "column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"
    );
    for (name, s) in summaries {
        let _ = writeln!(
            out,
            "{:<width$} {:>10} {:>14.6} {:>14.6} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>14.4}",
            name, s.count, s.mean, s.std_dev, s.min, s.q25, s.median, s.q75, s.max
        );
    }
    out
}

/// Pearson correlation over positions where both values are finite.
/// `None` when lengths differ, fewer than two pairs remain, or either side
/// has zero variance.
pub fn correlation(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() {
        return None;
    }
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(&x, &y)| (x, y))
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_a = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_b = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        cov += (x - mean_a) * (y - mean_b);
        var_a += (x - mean_a).powi(2);
        var_b += (y - mean_b).powi(2);
    }
    if var_a == 0.0 || var_b == 0.0 {
        return None;
    }
    Some(cov / (var_a.sqrt() * var_b.sqrt()))
}

/// Row indices of the `n` largest values in `values`, largest first.
/// Ties keep row order; NaN rows are never selected.
pub fn nlargest(values: &[f64], n: usize) -> Vec<usize> {
    let mut rows: Vec<usize> = (0..values.len()).filter(|&i| !values[i].is_nan()).collect();
    // Stable sort keeps earlier rows ahead on ties.
    rows.sort_by(|&a, &b| values[b].total_cmp(&values[a]));
    rows.truncate(n);
    rows
}

/// `None` at a position means the pair has no defined correlation.
pub type CorrelationMatrix = Vec<Vec<Option<f64>>>;

/// Pairwise [`correlation`] of `columns`, row and column order as given.
pub fn correlation_matrix<S: AsRef<str>>(
    table: &Table,
    columns: &[S],
) -> Result<CorrelationMatrix> {
    let data = columns
        .iter()
        .map(|name| table.numeric_column(name.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    Ok(data
        .iter()
        .map(|a| data.iter().map(|b| correlation(a, b)).collect())
        .collect())
}

// ---------------------------------------------------------------------------
// Category coverage
// ---------------------------------------------------------------------------

/// How many rows fall in a subset and how much of the size column they carry.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Share {
    pub count: usize,
    pub size: f64,
}

impl Share {
    fn of(rows: impl Iterator<Item = usize>, sizes: &[f64]) -> Self {
        let selected: Vec<f64> = rows.map(|r| sizes[r]).collect();
        Share {
            count: selected.len(),
            size: Summary::compute(&selected).map_or(0.0, |s| s.sum),
        }
    }

    /// Percentage of `total` rows; 0 for an empty total.
    pub fn count_pct(&self, total: &Share) -> f64 {
        percent(self.count as f64, total.count as f64)
    }

    /// Percentage of `total` size; 0 for a zero total.
    pub fn size_pct(&self, total: &Share) -> f64 {
        percent(self.size, total.size)
    }
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        0.0
    } else {
        part * 100.0 / whole
    }
}

/// Script counts and size shares per flag column, per pair of flag columns,
/// and for rows outside every flag.
#[derive(Debug, Clone, PartialEq)]
pub struct Coverage {
    pub total: Share,
    pub singles: Vec<(String, Share)>,
    pub pairs: Vec<((String, String), Share)>,
    /// Rows with no flag set, labelled by the group of flags checked.
    pub uncovered: Vec<(String, Share)>,
}

/// Rows where column `name` holds 1 (or `true`).
fn flag_mask(table: &Table, name: &str) -> Result<Vec<bool>> {
    let cells = table
        .column(name)
        .with_context(|| format!("no flag column named '{name}'"))?;
    Ok(cells.iter().map(|c| c.as_f64() == Some(1.0)).collect())
}

/// Count rows and sum `size_column` for each flag, each pair of flags and
/// the rows where no flag is set.
pub fn category_coverage<S: AsRef<str>>(
    table: &Table,
    flag_columns: &[S],
    size_column: &str,
) -> Result<Coverage> {
    let sizes = table.numeric_column(size_column)?;
    let names: Vec<&str> = flag_columns.iter().map(AsRef::as_ref).collect();
    let masks = names
        .iter()
        .map(|name| flag_mask(table, name))
        .collect::<Result<Vec<_>>>()?;
    let rows = 0..table.len();

    let singles = names
        .iter()
        .zip(&masks)
        .map(|(name, mask)| {
            let share = Share::of(rows.clone().filter(|&r| mask[r]), &sizes);
            (name.to_string(), share)
        })
        .collect();
    let pairs = names
        .iter()
        .zip(&masks)
        .tuple_combinations()
        .map(|((a, mask_a), (b, mask_b))| {
            let share = Share::of(rows.clone().filter(|&r| mask_a[r] && mask_b[r]), &sizes);
            ((a.to_string(), b.to_string()), share)
        })
        .collect();
    let none = Share::of(rows.clone().filter(|&r| masks.iter().all(|m| !m[r])), &sizes);

    Ok(Coverage {
        total: Share::of(rows, &sizes),
        singles,
        pairs,
        uncovered: vec![("categories at all".to_string(), none)],
    })
}

/// Rows where none of `columns` is set.
pub fn uncovered<S: AsRef<str>>(table: &Table, columns: &[S], size_column: &str) -> Result<Share> {
    let sizes = table.numeric_column(size_column)?;
    let masks = columns
        .iter()
        .map(|name| flag_mask(table, name.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    Ok(Share::of(
        (0..table.len()).filter(|&r| masks.iter().all(|m| !m[r])),
        &sizes,
    ))
}

/// Render a [`Coverage`] as sentences, sizes in MB.
pub fn coverage_report(coverage: &Coverage) -> String {
    let total = &coverage.total;
    let mb = |size: f64| size / 1_000_000.0;
    let mut out = String::new();
    let _ = writeln!(out, "{} scripts in total ({:.1}MB).", total.count, mb(total.size));
    let last = coverage.singles.len().saturating_sub(1);
    for (i, (name, share)) in coverage.singles.iter().enumerate() {
        let _ = writeln!(
            out,
            "{} ({:.2}%) {name}, {:.1}MB ({:.2}%){}",
            share.count,
            share.count_pct(total),
            mb(share.size),
            share.size_pct(total),
            if i == last { "." } else { "," }
        );
    }
    for ((a, b), share) in &coverage.pairs {
        let _ = writeln!(
            out,
            "{} ({:.2}%) scripts have both {a} and {b}. Size: {:.1}MB ({:.2}%)",
            share.count,
            share.count_pct(total),
            mb(share.size),
            share.size_pct(total),
        );
    }
    for (label, share) in &coverage.uncovered {
        let _ = writeln!(
            out,
            "{} scripts ({:.2}%) are not in any {label}, {:.1}MB ({:.2}%).",
            share.count,
            share.count_pct(total),
            mb(share.size),
            share.size_pct(total),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::CellValue;

    #[test]
    fn summary_matches_describe() {
        let s = Summary::compute(&[1.0, 2.0, 3.0, 4.0, f64::NAN]).unwrap();
        assert_eq!(s.count, 4);
        assert_eq!(s.mean, 2.5);
        assert!((s.std_dev - 1.290_994_448_735_805_6).abs() < 1e-12);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.q25, 1.75);
        assert_eq!(s.median, 2.5);
        assert_eq!(s.q75, 3.25);
        assert_eq!(s.max, 4.0);
        assert_eq!(s.sum, 10.0);
    }

    #[test]
    fn single_value_has_undefined_spread() {
        let s = Summary::compute(&[7.0]).unwrap();
        assert!(s.std_dev.is_nan());
        assert_eq!(s.median, 7.0);
        assert!(Summary::compute(&[f64::NAN]).is_none());
    }

    #[test]
    fn describe_skips_text_columns() {
        let table = Table::from_rows(
            vec!["attr".into(), "total".into()],
            vec![
                vec![CellValue::String("document".into()), CellValue::Integer(3)],
                vec![CellValue::String("cookie".into()), CellValue::Integer(5)],
            ],
        );
        let summaries = describe(&table);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].0, "total");
        assert_eq!(summaries[0].1.mean, 4.0);
        assert!(describe_report(&summaries).contains("total"));
    }

    #[test]
    fn correlation_of_linear_columns() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [2.0, 4.0, 6.0, 8.0];
        let c = [8.0, 6.0, 4.0, 2.0];
        assert!((correlation(&a, &b).unwrap() - 1.0).abs() < 1e-12);
        assert!((correlation(&a, &c).unwrap() + 1.0).abs() < 1e-12);
        assert!(correlation(&a, &[1.0, 1.0, 1.0, 1.0]).is_none());
        assert!(correlation(&a, &b[..3]).is_none());
    }

    #[test]
    fn nlargest_orders_descending() {
        let totals = [5.0, f64::NAN, 9.0, 5.0, 1.0];
        assert_eq!(nlargest(&totals, 3), vec![2, 0, 3]);
        assert_eq!(nlargest(&totals, 10).len(), 4);
    }

    fn features() -> Table {
        let row = |size: i64, a: i64, b: bool| {
            vec![CellValue::Integer(size), CellValue::Integer(a), CellValue::Bool(b)]
        };
        Table::from_rows(
            vec!["size".into(), "frontend".into(), "storage".into()],
            vec![
                row(1_000_000, 1, true),
                row(2_000_000, 1, false),
                row(3_000_000, 0, true),
                row(4_000_000, 0, false),
            ],
        )
    }

    #[test]
    fn coverage_counts_singles_pairs_and_leftovers() {
        let coverage = category_coverage(&features(), &["frontend", "storage"], "size").unwrap();
        assert_eq!(coverage.total, Share { count: 4, size: 10_000_000.0 });
        assert_eq!(coverage.singles[0], ("frontend".into(), Share { count: 2, size: 3_000_000.0 }));
        assert_eq!(coverage.singles[1], ("storage".into(), Share { count: 2, size: 4_000_000.0 }));
        assert_eq!(coverage.pairs.len(), 1);
        assert_eq!(coverage.pairs[0].0, ("frontend".into(), "storage".into()));
        assert_eq!(coverage.pairs[0].1, Share { count: 1, size: 1_000_000.0 });
        assert_eq!(coverage.uncovered[0].1, Share { count: 1, size: 4_000_000.0 });

        let only_frontend = uncovered(&features(), &["frontend"], "size").unwrap();
        assert_eq!(only_frontend, Share { count: 2, size: 7_000_000.0 });
    }

    #[test]
    fn coverage_report_sentences() {
        let coverage = category_coverage(&features(), &["frontend", "storage"], "size").unwrap();
        let report = coverage_report(&coverage);
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(
            lines,
            [
                "4 scripts in total (10.0MB).",
                "2 (50.00%) frontend, 3.0MB (30.00%),",
                "2 (50.00%) storage, 4.0MB (40.00%).",
                "1 (25.00%) scripts have both frontend and storage. Size: 1.0MB (10.00%)",
                "1 scripts (25.00%) are not in any categories at all, 4.0MB (40.00%).",
            ]
        );
    }

    #[test]
    fn coverage_of_empty_table_reports_zero_percent() {
        let empty = features().select_rows(&[]);
        let coverage = category_coverage(&empty, &["frontend"], "size").unwrap();
        assert_eq!(coverage.singles[0].1.count_pct(&coverage.total), 0.0);
        assert!(coverage_report(&coverage).contains("0 (0.00%) frontend, 0.0MB (0.00%)."));
    }

    #[test]
    fn coverage_rejects_unknown_flag() {
        let err = category_coverage(&features(), &["missing"], "size").unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn correlation_matrix_is_symmetric() {
        let m = correlation_matrix(&features(), &["size", "frontend", "storage"]).unwrap();
        assert_eq!(m.len(), 3);
        assert!((m[0][0].unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(m[0][1], m[1][0]);
        assert!(m[0][1].unwrap() < 0.0);
        assert!(correlation_matrix(&features(), &["nope"]).is_err());
    }
}
