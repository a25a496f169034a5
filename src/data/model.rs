use std::collections::BTreeSet;
use std::fmt;

use anyhow::{bail, Result};

// ---------------------------------------------------------------------------
// CellValue – a single cell of a loaded table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring the dtypes a CSV reader infers.
/// Used as a `BTreeSet` key by the row filter, so `CellValue` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

// -- Manual Eq/Ord so we can put CellValue in BTreeSet --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::String(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => Ok(()),
        }
    }
}

impl CellValue {
    /// Interpret the cell as a number. Booleans count as 0/1 so flag
    /// columns can be summed and correlated; `Null` is `NaN`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            CellValue::Null => Some(f64::NAN),
            CellValue::String(_) => None,
        }
    }

    /// Guess the type of a raw text cell: empty → `Null`, then integer,
    /// float, boolean, falling back to string.
    pub fn guess(s: &str) -> Self {
        if s.is_empty() {
            return CellValue::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return CellValue::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return CellValue::Float(f);
        }
        match s {
            "true" | "True" => CellValue::Bool(true),
            "false" | "False" => CellValue::Bool(false),
            _ => CellValue::String(s.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Table – named, equal-length columns
// ---------------------------------------------------------------------------

/// A loaded dataset stored column-wise.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// Column names in file order.
    pub column_names: Vec<String>,
    /// One vector per column, each `n_rows` long.
    pub columns: Vec<Vec<CellValue>>,
}

impl Table {
    /// Build a table from names and columns, checking the columns line up.
    pub fn new(column_names: Vec<String>, columns: Vec<Vec<CellValue>>) -> Result<Self> {
        if column_names.len() != columns.len() {
            bail!(
                "{} column names for {} columns",
                column_names.len(),
                columns.len()
            );
        }
        if let Some(first) = columns.first() {
            for (name, col) in column_names.iter().zip(&columns) {
                if col.len() != first.len() {
                    bail!(
                        "column '{name}' has {} rows, expected {}",
                        col.len(),
                        first.len()
                    );
                }
            }
        }
        Ok(Table {
            column_names,
            columns,
        })
    }

    /// Build a table from row-major records; short rows are padded with `Null`.
    pub fn from_rows(column_names: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let mut columns: Vec<Vec<CellValue>> = column_names
            .iter()
            .map(|_| Vec::with_capacity(rows.len()))
            .collect();
        for row in rows {
            let mut cells = row.into_iter();
            for col in columns.iter_mut() {
                col.push(cells.next().unwrap_or(CellValue::Null));
            }
        }
        Table {
            column_names,
            columns,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_names.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<&[CellValue]> {
        self.column_index(name).map(|i| self.columns[i].as_slice())
    }

    /// Extract a column as `f64`, failing on the first non-numeric cell.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<f64>> {
        let Some(col) = self.column(name) else {
            bail!("no column named '{name}'");
        };
        col.iter()
            .enumerate()
            .map(|(row, cell)| match cell.as_f64() {
                Some(v) => Ok(v),
                None => bail!("column '{name}', row {row}: '{cell}' is not numeric"),
            })
            .collect()
    }

    /// Whether every cell in column `idx` is numeric (or null).
    pub fn is_numeric(&self, idx: usize) -> bool {
        let col = &self.columns[idx];
        col.iter().all(|c| c.as_f64().is_some()) && col.iter().any(|c| *c != CellValue::Null)
    }

    /// The sorted set of distinct values in a column.
    pub fn unique_values(&self, name: &str) -> BTreeSet<CellValue> {
        self.column(name)
            .map(|col| col.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Copy the given rows, in the given order, into a new table.
    pub fn select_rows(&self, indices: &[usize]) -> Table {
        Table {
            column_names: self.column_names.clone(),
            columns: self
                .columns
                .iter()
                .map(|col| indices.iter().map(|&i| col[i].clone()).collect())
                .collect(),
        }
    }
}
