//! Read-through caching of loaded artifacts.
//!
//! Loading the cleaned dataset and the pipeline is the only expensive work a
//! page does, and pages re-render on every interaction. Each artifact is
//! loaded on first use, kept behind an `Arc`, and only read again after its
//! entry is invalidated or the whole cache is cleared.

use crate::data::{DataError, FeatureTable};
use crate::pipeline::{PipelineError, PricePipeline};
use ahash::AHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A path-keyed cache over a fallible loader.
///
/// Failed loads are returned to the caller and never stored, so the next
/// request retries the file.
pub struct ReadThroughCache<T, E> {
    entries: AHashMap<PathBuf, Arc<T>>,
    loader: fn(&Path) -> Result<T, E>,
    loads: usize,
    hits: usize,
}

impl<T, E> ReadThroughCache<T, E> {
    pub fn new(loader: fn(&Path) -> Result<T, E>) -> Self {
        Self {
            entries: AHashMap::new(),
            loader,
            loads: 0,
            hits: 0,
        }
    }

    pub fn get(&mut self, path: &Path) -> Result<Arc<T>, E> {
        if let Some(entry) = self.entries.get(path) {
            self.hits += 1;
            return Ok(Arc::clone(entry));
        }
        self.loads += 1;
        log::debug!("Cache miss for '{}'", path.display());
        let loaded = Arc::new((self.loader)(path)?);
        self.entries.insert(path.to_path_buf(), Arc::clone(&loaded));
        Ok(loaded)
    }

    /// Drops the entry for `path`. Returns whether one was present.
    pub fn invalidate(&mut self, path: &Path) -> bool {
        self.entries.remove(path).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of times the loader has been invoked, successful or not.
    pub fn loads(&self) -> usize {
        self.loads
    }

    pub fn hits(&self) -> usize {
        self.hits
    }
}

/// The two artifact kinds the pages read.
pub struct ArtifactCache {
    pub tables: ReadThroughCache<FeatureTable, DataError>,
    pub pipelines: ReadThroughCache<PricePipeline, PipelineError>,
}

impl Default for ArtifactCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactCache {
    pub fn new() -> Self {
        Self {
            tables: ReadThroughCache::new(FeatureTable::from_csv),
            pipelines: ReadThroughCache::new(PricePipeline::load),
        }
    }

    pub fn table(&mut self, path: &Path) -> Result<Arc<FeatureTable>, DataError> {
        self.tables.get(path)
    }

    pub fn pipeline(&mut self, path: &Path) -> Result<Arc<PricePipeline>, PipelineError> {
        self.pipelines.get(path)
    }

    pub fn invalidate(&mut self, path: &Path) -> bool {
        let table = self.tables.invalidate(path);
        let pipeline = self.pipelines.invalidate(path);
        table || pipeline
    }

    pub fn clear(&mut self) {
        log::info!(
            "Clearing artifact cache ({} tables, {} pipelines)",
            self.tables.len(),
            self.pipelines.len()
        );
        self.tables.clear();
        self.pipelines.clear();
    }

    pub fn loads(&self) -> usize {
        self.tables.loads() + self.pipelines.loads()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn read_len(path: &Path) -> Result<usize, std::io::Error> {
        fs::read_to_string(path).map(|text| text.len())
    }

    #[test]
    fn second_read_is_served_from_memory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "abc").unwrap();

        let mut cache = ReadThroughCache::new(read_len);
        assert_eq!(*cache.get(&path).unwrap(), 3);
        fs::write(&path, "abcdef").unwrap();
        assert_eq!(*cache.get(&path).unwrap(), 3);
        assert_eq!(cache.loads(), 1);
        assert_eq!(cache.hits(), 1);

        assert!(cache.invalidate(&path));
        assert_eq!(*cache.get(&path).unwrap(), 6);
        assert_eq!(cache.loads(), 2);
    }

    #[test]
    fn failures_are_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("late.txt");

        let mut cache = ReadThroughCache::new(read_len);
        assert!(cache.get(&path).is_err());
        assert!(cache.is_empty());

        fs::write(&path, "ok").unwrap();
        assert_eq!(*cache.get(&path).unwrap(), 2);
        assert_eq!(cache.loads(), 2);
    }

    #[test]
    fn clear_forgets_every_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("houses.csv");
        fs::write(&path, "GrLivArea,SalePrice\n1500,200000\n").unwrap();

        let mut cache = ArtifactCache::new();
        assert_eq!(cache.table(&path).unwrap().height(), 1);
        assert_eq!(cache.tables.len(), 1);
        cache.clear();
        assert!(cache.tables.is_empty());
        assert!(!cache.invalidate(&path));
    }
}
