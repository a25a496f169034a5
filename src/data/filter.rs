use std::collections::{BTreeMap, BTreeSet};

use anyhow::{bail, Result};

use super::model::{CellValue, Table};

// ---------------------------------------------------------------------------
// Filter predicate: which unique values are selected per column
// ---------------------------------------------------------------------------

/// Per-column selection state: maps column_name → set of selected values.
/// A column absent from the map is unconstrained.
pub type FilterState = BTreeMap<String, BTreeSet<CellValue>>;

/// Parse a `column=value` expression into a single-column selection.
/// The value is type-guessed the same way CSV cells are, so `silent=1`
/// matches integer cells.
pub fn parse_filter(expr: &str) -> Result<(String, CellValue)> {
    let Some((column, value)) = expr.split_once('=') else {
        bail!("filter '{expr}' is not of the form column=value");
    };
    let column = column.trim();
    if column.is_empty() {
        bail!("filter '{expr}' has an empty column name");
    }
    Ok((column.to_string(), CellValue::guess(value.trim())))
}

/// Fold `column=value` expressions into a [`FilterState`]. Repeating a column
/// widens its selection.
pub fn filter_state_from_exprs<S: AsRef<str>>(exprs: &[S]) -> Result<FilterState> {
    let mut state = FilterState::new();
    for expr in exprs {
        let (column, value) = parse_filter(expr.as_ref())?;
        state.entry(column).or_default().insert(value);
    }
    Ok(state)
}

/// Return indices of rows that pass all active filters.
///
/// A row passes a column filter when:
/// * The filter set for that column is empty → nothing selected → fails
/// * Every unique value of the column is selected → passes
/// * The row's value for that column is in the selected set → passes
/// * The row holds an integer or float numerically equal to a selected
///   integer or float → passes, so `x=1.0` matches `1` and vice versa
/// * The table lacks the column → passes only if `Null` is selected
pub fn filtered_indices(table: &Table, filters: &FilterState) -> Vec<usize> {
    let mut active: Vec<(Option<&[CellValue]>, &BTreeSet<CellValue>, Vec<f64>)> = Vec::new();
    for (col, selected) in filters {
        if selected.is_empty() {
            // Nothing selected for this column → hide everything
            return Vec::new();
        }
        let column = table.column(col);
        if column.is_some() && table.unique_values(col).is_subset(selected) {
            continue; // everything selected, no filtering needed
        }
        let numbers = selected.iter().filter_map(number).collect();
        active.push((column, selected, numbers));
    }

    (0..table.len())
        .filter(|&row| {
            active.iter().all(|(column, selected, numbers)| match column {
                Some(cells) => {
                    let cell = &cells[row];
                    selected.contains(cell) || number(cell).is_some_and(|v| numbers.contains(&v))
                }
                None => selected.contains(&CellValue::Null),
            })
        })
        .collect()
}

fn number(cell: &CellValue) -> Option<f64> {
    match *cell {
        CellValue::Integer(i) => Some(i as f64),
        CellValue::Float(v) => Some(v),
        _ => None,
    }
}

/// Apply `filters` and materialise the passing rows.
pub fn apply(table: &Table, filters: &FilterState) -> Table {
    if filters.is_empty() {
        return table.clone();
    }
    let rows = filtered_indices(table, filters);
    log::debug!("filter kept {} of {} rows", rows.len(), table.len());
    table.select_rows(&rows)
}
