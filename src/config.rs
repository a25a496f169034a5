//! Configuration handling
//!
//! Datasets and defaults come from a `jsphere-data.toml` file when present,
//! falling back to the datasets of the published report.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::fetch::CsvFile;
use crate::data::loader::LoadOptions;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "jsphere-data.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub sample: SampleConfig,
    #[serde(default = "default_datasets")]
    pub datasets: Vec<DatasetConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Download pool size; unset means one thread per core.
    #[serde(default)]
    pub threads: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleConfig {
    /// Default minimum gap, as a fraction of sequence length.
    #[serde(default)]
    pub min_gap_frac: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub name: String,
    pub path: PathBuf,
    pub url: String,
    /// Single-character field delimiter, e.g. `"\t"`.
    #[serde(default)]
    pub delimiter: Option<String>,
}

impl DatasetConfig {
    pub fn csv_file(&self) -> CsvFile {
        CsvFile::new(self.path.clone(), self.url.clone())
    }

    pub fn load_options(&self) -> Result<LoadOptions> {
        Ok(LoadOptions {
            delimiter: self.delimiter.as_deref().map(parse_delimiter).transpose()?,
        })
    }
}

fn default_datasets() -> Vec<DatasetConfig> {
    vec![
        DatasetConfig {
            name: "api_calls".into(),
            path: "api_calls.csv.gz".into(),
            url: "https://github.com/user-attachments/files/17322038/api_calls.csv.gz".into(),
            delimiter: None,
        },
        DatasetConfig {
            name: "script_features".into(),
            path: "script_features2.csv.gz".into(),
            url: "https://github.com/user-attachments/files/17381468/script_features2.csv.gz"
                .into(),
            delimiter: Some("\t".into()),
        },
        DatasetConfig {
            name: "youtube_script_api_calls".into(),
            path: "youtube_script_api_calls.csv".into(),
            url: "https://github.com/user-attachments/files/17320225/youtube_script_api_calls.csv"
                .into(),
            delimiter: None,
        },
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            sample: SampleConfig::default(),
            datasets: default_datasets(),
        }
    }
}

impl Config {
    /// Parse a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = toml::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `explicit` if given, else [`DEFAULT_CONFIG_FILE`] if it exists,
    /// else the built-in defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::load(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let frac = self.sample.min_gap_frac;
        if !(0.0..1.0).contains(&frac) {
            bail!("sample.min_gap_frac must be in [0, 1), got {frac}");
        }
        if self.fetch.threads == Some(0) {
            bail!("fetch.threads must be at least 1");
        }
        for ds in &self.datasets {
            ds.load_options()
                .with_context(|| format!("dataset '{}'", ds.name))?;
        }
        Ok(())
    }

    pub fn dataset(&self, name: &str) -> Option<&DatasetConfig> {
        self.datasets.iter().find(|d| d.name == name)
    }
}

/// Accept a single byte, or the escapes `\t` and `tab`.
pub fn parse_delimiter(s: &str) -> Result<u8> {
    match s {
        "\\t" | "tab" => Ok(b'\t'),
        _ if s.len() == 1 => Ok(s.as_bytes()[0]),
        _ => bail!("delimiter must be a single byte, got {s:?}"),
    }
}
