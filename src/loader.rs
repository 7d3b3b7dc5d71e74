use crate::error::{PlaybookError, Result};
use crate::merge::merge_sources;
use crate::schema::{Table, KEY_COLUMNS};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

const BOM: char = '\u{feff}';

/// Locations of the three source tables. Also the memoization key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourcePaths {
    /// Merchant master data, joined on merchant id.
    pub merchants: PathBuf,
    /// Monthly usage metrics, keyed by merchant id and period.
    pub usage: PathBuf,
    /// Monthly customer and context metrics, keyed by merchant id and period.
    pub monthly: PathBuf,
}

impl SourcePaths {
    pub fn new(
        merchants: impl Into<PathBuf>,
        usage: impl Into<PathBuf>,
        monthly: impl Into<PathBuf>,
    ) -> Self {
        Self {
            merchants: merchants.into(),
            usage: usage.into(),
            monthly: monthly.into(),
        }
    }

    /// The conventional `data1.csv`, `data2.csv`, `data3.csv` layout under `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(
            dir.join("data1.csv"),
            dir.join("data2.csv"),
            dir.join("data3.csv"),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        [&self.merchants, &self.usage, &self.monthly]
            .into_iter()
            .map(PathBuf::as_path)
    }
}

impl Default for SourcePaths {
    fn default() -> Self {
        Self::in_dir("data")
    }
}

/// Parses one delimited file. Header names are trimmed and the merchant and
/// period key columns have their values trimmed.
pub fn load_table(path: &Path) -> Result<Table> {
    if !path.exists() {
        return Err(PlaybookError::MissingSource {
            path: path.to_path_buf(),
        });
    }

    let parse_err = |source: csv::Error| PlaybookError::Parse {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(parse_err)?;

    let columns: Vec<String> = reader
        .headers()
        .map_err(parse_err)?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let h = if i == 0 { h.trim_start_matches(BOM) } else { h };
            h.trim().to_string()
        })
        .collect();

    if columns.iter().all(String::is_empty) {
        return Err(parse_err(csv::Error::from(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "missing header record",
        ))));
    }

    let key_indices: Vec<usize> = columns
        .iter()
        .enumerate()
        .filter(|(_, name)| KEY_COLUMNS.contains(&name.as_str()))
        .map(|(i, _)| i)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(parse_err)?;
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        for &idx in &key_indices {
            row[idx] = row[idx].trim().to_string();
        }
        rows.push(row);
    }

    debug!(
        "Loaded {} rows x {} columns from {}",
        rows.len(),
        columns.len(),
        path.display()
    );

    Ok(Table::new(columns, rows))
}

/// Verifies all three files exist, then parses and merges them.
pub fn load_merged(paths: &SourcePaths) -> Result<Table> {
    if let Some(missing) = paths.iter().find(|p| !p.exists()) {
        return Err(PlaybookError::MissingSource {
            path: missing.to_path_buf(),
        });
    }

    let merchants = load_table(&paths.merchants)?;
    let usage = load_table(&paths.usage)?;
    let monthly = load_table(&paths.monthly)?;

    merge_sources(&merchants, &usage, &monthly)
}

/// Process-lifetime memo of merged datasets keyed by their source paths.
/// Entries are never evicted; failed loads are not cached.
#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: Mutex<HashMap<SourcePaths, Arc<Table>>>,
    loads: AtomicUsize,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared cache used by [`crate::PlaybookPipeline::new`].
    pub fn global() -> &'static DatasetCache {
        static CACHE: OnceLock<DatasetCache> = OnceLock::new();
        CACHE.get_or_init(DatasetCache::new)
    }

    pub fn get_or_load(&self, paths: &SourcePaths) -> Result<Arc<Table>> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(table) = entries.get(paths) {
            return Ok(Arc::clone(table));
        }

        info!("Loading merchant datasets from {:?}", paths);
        let table = Arc::new(load_merged(paths)?);
        self.loads.fetch_add(1, Ordering::SeqCst);
        entries.insert(paths.clone(), Arc::clone(&table));

        Ok(table)
    }

    /// Number of times files were actually read and merged.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}
