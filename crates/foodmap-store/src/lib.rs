//! JSON persistence for scraped establishments.
//!
//! Each postal code owns two files under the store root:
//! `restaurants_{postal}.json` and `stores_{postal}.json`. A missing file reads
//! as an empty array. Every mutation is a full read-modify-write; callers must
//! not run two writers for the same postal code at once.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use foodmap_core::{EstablishmentKind, EstablishmentRecord};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Result of [`JsonStore::append`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppendOutcome {
    pub restaurants_added: usize,
    pub stores_added: usize,
    /// Records whose URL was already on disk or earlier in the same batch.
    pub skipped: usize,
    pub restaurants_file: PathBuf,
    pub stores_file: PathBuf,
}

/// Totals for one output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub file: PathBuf,
    pub exists: bool,
    pub establishments: usize,
    pub items: usize,
    /// Up to five known names, in file order.
    pub sample_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostalSummary {
    pub postal_code: String,
    pub restaurants: FileSummary,
    pub stores: FileSummary,
}

const SAMPLE_NAMES: usize = 5;

#[derive(Debug, Clone)]
pub struct JsonStore {
    root: PathBuf,
}

impl JsonStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn path_for(&self, kind: EstablishmentKind, postal_code: &str) -> PathBuf {
        let prefix = match kind {
            EstablishmentKind::Restaurant => "restaurants",
            EstablishmentKind::Store => "stores",
        };
        self.root.join(format!("{prefix}_{postal_code}.json"))
    }

    /// Reads every record of `kind` persisted for `postal_code`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the file exists but cannot be read and
    /// [`StoreError::Json`] when its content is not a record array.
    pub fn load(
        &self,
        kind: EstablishmentKind,
        postal_code: &str,
    ) -> Result<Vec<EstablishmentRecord>, StoreError> {
        let path = self.path_for(kind, postal_code);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&path, e)),
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|e| StoreError::json(&path, e))
    }

    /// Replaces the file for `kind` with `records`.
    ///
    /// The array is written pretty-printed to a temporary file in the same
    /// directory and renamed over the target, so readers never observe a
    /// half-written file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when serialization or any file operation fails.
    pub fn save(
        &self,
        kind: EstablishmentKind,
        postal_code: &str,
        records: &[EstablishmentRecord],
    ) -> Result<PathBuf, StoreError> {
        let path = self.path_for(kind, postal_code);
        std::fs::create_dir_all(&self.root).map_err(|e| StoreError::io(&self.root, e))?;

        let json = serde_json::to_vec_pretty(records).map_err(|e| StoreError::json(&path, e))?;

        let mut tmp =
            tempfile::NamedTempFile::new_in(&self.root).map_err(|e| StoreError::io(&path, e))?;
        tmp.write_all(&json).map_err(|e| StoreError::io(&path, e))?;
        tmp.persist(&path)
            .map_err(|e| StoreError::io(&path, e.error))?;

        tracing::debug!(
            path = %path.display(),
            records = records.len(),
            "saved establishment file"
        );
        Ok(path)
    }

    /// Appends `records` to the files of their respective types, skipping any
    /// URL already present in either file for this postal code.
    ///
    /// Both files are written, so they exist after a successful append even
    /// when nothing new was added.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when an existing file cannot be read or a file
    /// cannot be written. Records are not consumed, so the caller may retry.
    pub fn append(
        &self,
        postal_code: &str,
        records: &[EstablishmentRecord],
    ) -> Result<AppendOutcome, StoreError> {
        let mut restaurants = self.load(EstablishmentKind::Restaurant, postal_code)?;
        let mut stores = self.load(EstablishmentKind::Store, postal_code)?;

        let mut known: HashSet<String> = restaurants
            .iter()
            .chain(stores.iter())
            .map(|r| r.url.clone())
            .collect();

        let mut outcome = AppendOutcome::default();
        for record in records {
            if !known.insert(record.url.clone()) {
                tracing::debug!(url = %record.url, "duplicate URL skipped on save");
                outcome.skipped += 1;
                continue;
            }
            match record.kind() {
                EstablishmentKind::Restaurant => {
                    restaurants.push(record.clone());
                    outcome.restaurants_added += 1;
                }
                EstablishmentKind::Store => {
                    stores.push(record.clone());
                    outcome.stores_added += 1;
                }
            }
        }

        outcome.restaurants_file =
            self.save(EstablishmentKind::Restaurant, postal_code, &restaurants)?;
        outcome.stores_file = self.save(EstablishmentKind::Store, postal_code, &stores)?;

        tracing::info!(
            postal_code,
            restaurants_added = outcome.restaurants_added,
            stores_added = outcome.stores_added,
            skipped = outcome.skipped,
            "appended establishments"
        );
        Ok(outcome)
    }

    /// Counts what is currently on disk for `postal_code`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when an existing file cannot be read or parsed.
    pub fn summary(&self, postal_code: &str) -> Result<PostalSummary, StoreError> {
        Ok(PostalSummary {
            postal_code: postal_code.to_string(),
            restaurants: self.file_summary(EstablishmentKind::Restaurant, postal_code)?,
            stores: self.file_summary(EstablishmentKind::Store, postal_code)?,
        })
    }

    fn file_summary(
        &self,
        kind: EstablishmentKind,
        postal_code: &str,
    ) -> Result<FileSummary, StoreError> {
        let file = self.path_for(kind, postal_code);
        let exists = file.exists();
        let records = self.load(kind, postal_code)?;
        Ok(FileSummary {
            exists,
            establishments: records.len(),
            items: records.iter().map(EstablishmentRecord::items_count).sum(),
            sample_names: records
                .iter()
                .filter_map(|r| r.name.clone())
                .take(SAMPLE_NAMES)
                .collect(),
            file,
        })
    }
}
