use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use jsphere_data::cdf::EmpiricalCdf;
use jsphere_data::color;
use jsphere_data::config::{parse_delimiter, Config};
use jsphere_data::data::fetch::{ensure_all, CsvFile};
use jsphere_data::data::filter::{self, filter_state_from_exprs};
use jsphere_data::data::loader::{load_table, LoadOptions};
use jsphere_data::data::model::Table;
use jsphere_data::sample::sample_columns;
use jsphere_data::stats;

#[derive(Parser)]
#[command(name = "jsphere-data")]
#[command(about = "Fetch, summarise and downsample the browser API usage datasets")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Number of download threads
    #[arg(short, long, global = true)]
    threads: Option<usize>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Download configured datasets that are not on disk yet
    Fetch {
        /// Dataset names (all configured datasets when omitted)
        names: Vec<String>,
    },

    /// Print descriptive statistics for every numeric column
    Describe {
        /// Dataset name from the configuration, or a file path
        source: String,

        /// Field delimiter override (e.g. "tab")
        #[arg(long)]
        delimiter: Option<String>,

        /// Keep only rows matching column=value (repeatable)
        #[arg(long = "where")]
        filters: Vec<String>,
    },

    /// Boundary-sample one or more columns and write index,columns... CSV
    Sample {
        source: String,

        /// Comma-separated column names sampled together
        #[arg(long, value_delimiter = ',', required = true)]
        columns: Vec<String>,

        /// Minimum index gap as a fraction of the row count
        #[arg(long)]
        min_gap_frac: Option<f64>,

        #[arg(long)]
        delimiter: Option<String>,

        #[arg(long = "where")]
        filters: Vec<String>,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Write a sampled empirical CDF of a column as value,fraction CSV
    Cdf {
        source: String,

        /// Column to build the distribution from
        #[arg(long)]
        column: String,

        /// Keep only rows matching column=value; fractions stay relative
        /// to the unfiltered row count
        #[arg(long = "where")]
        filters: Vec<String>,

        /// Append a final point at fraction 1
        #[arg(long)]
        close: bool,

        #[arg(long)]
        min_gap_frac: Option<f64>,

        #[arg(long)]
        delimiter: Option<String>,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Report how many scripts, and how much size, each flag column covers
    Coverage {
        source: String,

        /// Comma-separated 0/1 flag columns
        #[arg(long, value_delimiter = ',', required = true)]
        flags: Vec<String>,

        /// Column summed for the size shares
        #[arg(long, default_value = "size")]
        size_column: String,

        /// Also count scripts outside every one of these flags
        #[arg(long, value_delimiter = ',')]
        none_of: Vec<String>,

        #[arg(long)]
        delimiter: Option<String>,

        #[arg(long = "where")]
        filters: Vec<String>,
    },

    /// Write the rows with the largest values of a column as CSV
    Top {
        source: String,

        #[arg(long)]
        column: String,

        /// Number of rows to keep
        #[arg(short, default_value_t = 20)]
        n: usize,

        #[arg(long)]
        delimiter: Option<String>,

        #[arg(long = "where")]
        filters: Vec<String>,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Write the pairwise correlation matrix of numeric columns as CSV
    Corr {
        source: String,

        /// Comma-separated columns (every numeric column when omitted)
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,

        #[arg(long)]
        delimiter: Option<String>,

        #[arg(long = "where")]
        filters: Vec<String>,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print the blended colour of every sphere combination
    Colors,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let mut config = Config::discover(cli.config.as_deref())?;
    if cli.threads.is_some() {
        config.fetch.threads = cli.threads;
    }

    match cli.command {
        Commands::Fetch { names } => fetch(&config, &names),
        Commands::Describe {
            source,
            delimiter,
            filters,
        } => {
            let table = open(&config, &source, delimiter.as_deref(), &filters)?;
            print!("{}", stats::describe_report(&stats::describe(&table)));
            Ok(())
        }
        Commands::Sample {
            source,
            columns,
            min_gap_frac,
            delimiter,
            filters,
            out,
        } => {
            let table = open(&config, &source, delimiter.as_deref(), &filters)?;
            let gap = min_gap_frac.unwrap_or(config.sample.min_gap_frac);
            write_sampled(&table, &columns, gap, output(out.as_deref())?)
        }
        Commands::Cdf {
            source,
            column,
            filters,
            close,
            min_gap_frac,
            delimiter,
            out,
        } => {
            let full = open(&config, &source, delimiter.as_deref(), &[])?;
            let subset = filter::apply(&full, &filter_state_from_exprs(&filters)?);
            let mut cdf = EmpiricalCdf::new(&subset.numeric_column(&column)?, full.len())?;
            if close {
                cdf = cdf.close();
            }
            let gap = min_gap_frac.unwrap_or(config.sample.min_gap_frac);
            let mut writer = csv::Writer::from_writer(output(out.as_deref())?);
            writer.write_record([column.as_str(), "fraction"])?;
            for (value, fraction) in cdf.sampled(gap)? {
                writer.write_record([value.to_string(), fraction.to_string()])?;
            }
            writer.flush()?;
            Ok(())
        }
        Commands::Coverage {
            source,
            flags,
            size_column,
            none_of,
            delimiter,
            filters,
        } => {
            let table = open(&config, &source, delimiter.as_deref(), &filters)?;
            let mut coverage = stats::category_coverage(&table, &flags, &size_column)?;
            if !none_of.is_empty() {
                let share = stats::uncovered(&table, &none_of, &size_column)?;
                coverage
                    .uncovered
                    .insert(0, (format!("of {}", none_of.join(", ")), share));
            }
            print!("{}", stats::coverage_report(&coverage));
            Ok(())
        }
        Commands::Top {
            source,
            column,
            n,
            delimiter,
            filters,
            out,
        } => {
            let table = open(&config, &source, delimiter.as_deref(), &filters)?;
            let rows = stats::nlargest(&table.numeric_column(&column)?, n);
            write_table(&table.select_rows(&rows), output(out.as_deref())?)
        }
        Commands::Corr {
            source,
            columns,
            delimiter,
            filters,
            out,
        } => {
            let table = open(&config, &source, delimiter.as_deref(), &filters)?;
            let columns = if columns.is_empty() {
                numeric_columns(&table)
            } else {
                columns
            };
            let matrix = stats::correlation_matrix(&table, &columns)?;
            let mut writer = csv::Writer::from_writer(output(out.as_deref())?);
            let mut header = vec![String::new()];
            header.extend(columns.iter().cloned());
            writer.write_record(&header)?;
            for (name, row) in columns.iter().zip(&matrix) {
                let mut record = vec![name.clone()];
                record.extend(row.iter().map(|r| r.map(|v| format!("{v:.6}")).unwrap_or_default()));
                writer.write_record(&record)?;
            }
            writer.flush()?;
            Ok(())
        }
        Commands::Colors => {
            for (name, c) in color::default_sphere_colors() {
                println!("{} {name}", color::to_hex(c));
            }
            Ok(())
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn fetch(config: &Config, names: &[String]) -> Result<()> {
    let files: Vec<CsvFile> = if names.is_empty() {
        config.datasets.iter().map(|d| d.csv_file()).collect()
    } else {
        names
            .iter()
            .map(|name| {
                config
                    .dataset(name)
                    .map(|d| d.csv_file())
                    .with_context(|| format!("no dataset named '{name}' in configuration"))
            })
            .collect::<Result<_>>()?
    };
    ensure_all(&files, config.fetch.threads)?;
    Ok(())
}

/// Resolve `source` to a file (fetching configured datasets first), load it
/// and apply `filters`.
fn open(config: &Config, source: &str, delimiter: Option<&str>, filters: &[String]) -> Result<Table> {
    let (path, mut options) = match config.dataset(source) {
        Some(ds) => {
            ds.csv_file().download_if_missing()?;
            (ds.path.clone(), ds.load_options()?)
        }
        None => {
            let path = PathBuf::from(source);
            if !path.exists() {
                bail!("'{source}' is neither a configured dataset nor an existing file");
            }
            (path, LoadOptions::default())
        }
    };
    if let Some(d) = delimiter {
        options.delimiter = Some(parse_delimiter(d)?);
    }
    let table = load_table(&path, options)?;
    Ok(filter::apply(&table, &filter_state_from_exprs(filters)?))
}

fn output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) => Box::new(File::create(p).with_context(|| format!("creating {}", p.display()))?),
        None => Box::new(io::stdout().lock()),
    })
}

fn write_sampled(table: &Table, columns: &[String], gap: f64, out: Box<dyn Write>) -> Result<()> {
    let data = columns
        .iter()
        .map(|name| table.numeric_column(name))
        .collect::<Result<Vec<_>>>()?;
    let slices: Vec<&[f64]> = data.iter().map(Vec::as_slice).collect();
    let sampled = sample_columns(&slices, gap)
        .with_context(|| format!("sampling columns {}", columns.join(",")))?;
    log::info!("kept {} of {} rows", sampled.len(), table.len());

    let mut writer = csv::Writer::from_writer(out);
    let mut header = vec!["index".to_string()];
    header.extend(columns.iter().cloned());
    writer.write_record(&header)?;
    for (pos, index) in sampled.indices.iter().enumerate() {
        let mut record = vec![index.to_string()];
        record.extend(sampled.values.iter().map(|col| col[pos].to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn numeric_columns(table: &Table) -> Vec<String> {
    table
        .column_names
        .iter()
        .enumerate()
        .filter(|&(idx, _)| table.is_numeric(idx))
        .map(|(_, name)| name.clone())
        .collect()
}

fn write_table(table: &Table, out: Box<dyn Write>) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(&table.column_names)?;
    for row in 0..table.len() {
        writer.write_record(table.columns.iter().map(|col| col[row].to_string()))?;
    }
    writer.flush()?;
    Ok(())
}
