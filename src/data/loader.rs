use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::DataType;
use flate2::read::GzDecoder;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CellValue, Table};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Parsing knobs for delimited text files.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Field delimiter; `None` picks tab for `.tsv` and comma otherwise.
    pub delimiter: Option<u8>,
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a table from a file.  Dispatch by extension, looking through a
/// trailing `.gz` for delimited text.
///
/// Supported formats:
/// * `.csv` / `.tsv` / `.txt` (optionally `.gz`) – header row then records
/// * `.json`    – `[{ "col": value, ... }, ...]`
/// * `.parquet` – flat scalar columns
pub fn load_table(path: &Path, options: LoadOptions) -> Result<Table> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    let (stem, gzipped) = match name.strip_suffix(".gz") {
        Some(stem) => (stem, true),
        None => (name.as_str(), false),
    };
    let ext = stem.rsplit_once('.').map(|(_, e)| e).unwrap_or("");

    let table = match (ext, gzipped) {
        ("csv" | "txt", _) => load_delimited(path, gzipped, options.delimiter.unwrap_or(b','))?,
        ("tsv", _) => load_delimited(path, gzipped, options.delimiter.unwrap_or(b'\t'))?,
        ("json", false) => load_json(path)?,
        ("parquet" | "pq", false) => load_parquet(path)?,
        (other, _) => bail!("Unsupported file extension: .{other}"),
    };
    log::info!(
        "loaded {} rows x {} columns from {}",
        table.len(),
        table.column_names.len(),
        path.display()
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// Delimited text loader
// ---------------------------------------------------------------------------

fn load_delimited(path: &Path, gzipped: bool, delimiter: u8) -> Result<Table> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let input: Box<dyn Read> = if gzipped {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    read_delimited(input, delimiter).with_context(|| format!("parsing {}", path.display()))
}

/// Parse delimited text with a header row. Every cell is type-guessed.
pub fn read_delimited<R: Read>(input: R, delimiter: u8) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(input);
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        if record.len() > headers.len() {
            bail!(
                "CSV row {row_no}: {} fields but only {} columns",
                record.len(),
                headers.len()
            );
        }
        rows.push(record.iter().map(CellValue::guess).collect());
    }

    Ok(Table::from_rows(headers, rows))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "api_type": "Get", "this": "Window", "attr": "document", "total": 42 },
///   ...
/// ]
/// ```
///
/// Columns are ordered by first appearance; keys missing from a record are `Null`.
fn load_json(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut column_names: Vec<String> = Vec::new();
    let mut positions: BTreeMap<String, usize> = BTreeMap::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !positions.contains_key(key) {
                positions.insert(key.clone(), column_names.len());
                column_names.push(key.clone());
            }
        }
    }

    let mut columns: Vec<Vec<CellValue>> = column_names
        .iter()
        .map(|_| vec![CellValue::Null; records.len()])
        .collect();
    for (row, rec) in records.iter().enumerate() {
        if let Some(obj) = rec.as_object() {
            for (key, val) in obj {
                columns[positions[key]][row] = json_to_cell(val);
            }
        }
    }

    Table::new(column_names, columns)
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of flat scalar columns.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`). Nested columns are kept as their
/// debug rendering.
fn load_parquet(path: &Path) -> Result<Table> {
    let file = File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let column_names: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut columns: Vec<Vec<CellValue>> = column_names.iter().map(|_| Vec::new()).collect();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for (col_idx, column) in columns.iter_mut().enumerate() {
            let array = batch.column(col_idx);
            for row in 0..batch.num_rows() {
                column.push(extract_cell(array, row)?);
            }
        }
    }

    Table::new(column_names, columns)
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> Result<CellValue> {
    if col.is_null(row) {
        return Ok(CellValue::Null);
    }
    let cell = match col.data_type() {
        DataType::Utf8 => {
            let s = col
                .as_any()
                .downcast_ref::<StringArray>()
                .context("expected StringArray")?;
            CellValue::String(s.value(row).to_string())
        }
        DataType::LargeUtf8 => {
            let s = col.as_string::<i64>();
            CellValue::String(s.value(row).to_string())
        }
        DataType::Int32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int32Array>()
                .context("expected Int32Array")?;
            CellValue::Integer(arr.value(row) as i64)
        }
        DataType::Int64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int64Array>()
                .context("expected Int64Array")?;
            CellValue::Integer(arr.value(row))
        }
        DataType::Float32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float32Array>()
                .context("expected Float32Array")?;
            CellValue::Float(arr.value(row) as f64)
        }
        DataType::Float64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float64Array>()
                .context("expected Float64Array")?;
            CellValue::Float(arr.value(row))
        }
        DataType::Boolean => {
            let arr = col
                .as_any()
                .downcast_ref::<BooleanArray>()
                .context("expected BooleanArray")?;
            CellValue::Bool(arr.value(row))
        }
        _ => CellValue::String(format!("{:?}", col.slice(row, 1))),
    };
    Ok(cell)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::write::GzEncoder;
    use flate2::Compression;

    use super::*;

    const API_CALLS: &str = "api_type,this,attr,total,interact\n\
                             Get,Window,document,120,4\n\
                             Function,Document,querySelector,75,\n";

    #[test]
    fn reads_plain_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api_calls.csv");
        std::fs::write(&path, API_CALLS).unwrap();

        let table = load_table(&path, LoadOptions::default()).unwrap();
        assert_eq!(table.column_names, ["api_type", "this", "attr", "total", "interact"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.numeric_column("total").unwrap(), vec![120.0, 75.0]);
        assert_eq!(table.column("interact").unwrap()[1], CellValue::Null);
    }

    #[test]
    fn reads_gzipped_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api_calls.csv.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(API_CALLS.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let table = load_table(&path, LoadOptions::default()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.column("attr").unwrap()[0],
            CellValue::String("document".into())
        );
    }

    #[test]
    fn tab_delimiter_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script_features2.csv");
        std::fs::write(&path, "id\tsize\ttotal_call\n1\t334\t0\n2\t2217\t5\n").unwrap();

        let options = LoadOptions {
            delimiter: Some(b'\t'),
        };
        let table = load_table(&path, options).unwrap();
        assert_eq!(table.numeric_column("size").unwrap(), vec![334.0, 2217.0]);
    }

    #[test]
    fn reads_json_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.json");
        std::fs::write(&path, r#"[{"a": 1, "b": "x"}, {"b": "y", "c": true}]"#).unwrap();

        let table = load_table(&path, LoadOptions::default()).unwrap();
        assert_eq!(table.column_names, ["a", "b", "c"]);
        assert_eq!(table.column("a").unwrap()[1], CellValue::Null);
        assert_eq!(table.column("c").unwrap()[1], CellValue::Bool(true));
    }

    #[test]
    fn reads_parquet_columns() {
        use arrow::datatypes::{Field, Schema};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::ArrowWriter;

        let schema = Arc::new(Schema::new(vec![
            Field::new("size", DataType::Int64, false),
            Field::new("api_type", DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(vec![9, 334])),
                Arc::new(StringArray::from(vec![Some("Get"), None])),
            ],
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.parquet");
        let mut writer = ArrowWriter::try_new(File::create(&path).unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let table = load_table(&path, LoadOptions::default()).unwrap();
        assert_eq!(table.numeric_column("size").unwrap(), vec![9.0, 334.0]);
        assert_eq!(table.column("api_type").unwrap()[1], CellValue::Null);
    }

    #[test]
    fn rejects_unknown_extension() {
        let err = load_table(Path::new("data.xlsx"), LoadOptions::default()).unwrap_err();
        assert!(err.to_string().contains(".xlsx"));
    }

    #[test]
    fn rejects_overlong_rows() {
        let err = read_delimited("a,b\n1,2,3\n".as_bytes(), b',').unwrap_err();
        assert!(format!("{err:#}").contains("row 0"));
    }
}
