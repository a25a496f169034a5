use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("GET {url} returned HTTP {status}")]
    Http { url: String, status: u16 },
    #[error("GET {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("building download pool: {0}")]
    Pool(String),
}

impl FetchError {
    fn io(path: &Path, source: io::Error) -> Self {
        FetchError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// CsvFile – a dataset that lives at a URL and is cached at a local path
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvFile {
    pub path: PathBuf,
    pub url: String,
}

impl CsvFile {
    pub fn new(path: impl Into<PathBuf>, url: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            url: url.into(),
        }
    }

    /// Download the file unless it already exists. Returns whether a
    /// download happened.
    pub fn download_if_missing(&self) -> Result<bool, FetchError> {
        ensure_local(&self.path, &self.url)
    }
}

/// Make sure `path` exists, fetching `url` into it if it does not.
///
/// The body is streamed into a `.part` sibling and renamed into place, so an
/// interrupted transfer never leaves a file at `path`.
pub fn ensure_local(path: &Path, url: &str) -> Result<bool, FetchError> {
    if path.exists() {
        log::debug!("{} already present", path.display());
        return Ok(false);
    }

    let response = ureq::get(url).call().map_err(|err| match err {
        ureq::Error::Status(status, _) => FetchError::Http {
            url: url.to_string(),
            status,
        },
        ureq::Error::Transport(transport) => FetchError::Transport {
            url: url.to_string(),
            message: transport.to_string(),
        },
    })?;
    let status = response.status();
    if !(200..300).contains(&status) {
        return Err(FetchError::Http {
            url: url.to_string(),
            status,
        });
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| FetchError::io(parent, e))?;
    }

    let partial = partial_path(path);
    let mut file = fs::File::create(&partial).map_err(|e| FetchError::io(&partial, e))?;
    let copied = io::copy(&mut response.into_reader(), &mut file);
    drop(file);
    let bytes = match copied {
        Ok(bytes) => bytes,
        Err(e) => {
            discard(&partial);
            return Err(FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            });
        }
    };
    if let Err(e) = fs::rename(&partial, path) {
        discard(&partial);
        return Err(FetchError::io(path, e));
    }

    log::info!("Downloaded {url} -> {} ({bytes} bytes)", path.display());
    Ok(true)
}

fn discard(partial: &Path) {
    if let Err(e) = fs::remove_file(partial) {
        log::warn!("could not remove {}: {e}", partial.display());
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

/// Fetch every missing file in parallel, one task per file.
///
/// `threads` caps the pool; `None` sizes it to the available parallelism.
/// Returns the number of files actually downloaded, or the first error.
pub fn ensure_all(files: &[CsvFile], threads: Option<usize>) -> Result<usize, FetchError> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    let pool = builder
        .build()
        .map_err(|e| FetchError::Pool(e.to_string()))?;

    let fetched: Vec<bool> = pool.install(|| {
        files
            .par_iter()
            .map(CsvFile::download_if_missing)
            .collect::<Result<_, _>>()
    })?;
    let downloaded = fetched.into_iter().filter(|&f| f).count();
    log::info!("{downloaded} of {} datasets downloaded", files.len());
    Ok(downloaded)
}
