//! Artifact files on disk.
//!
//! Writes go to a uniquely named sibling temp file that is synced and
//! renamed into place, so readers never observe a half-written artifact and
//! concurrent writers never share a temp file. The index file is
//! memory-mapped for decoding, falling back to a plain read when mapping is
//! unavailable.

use crate::catalog::ItemCatalog;
use crate::error::{Result, SearchError};
use crate::index::{Index, IndexStructure};
use crate::persistence::artifact::{self, ArtifactHeader};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Default file name of the index artifact inside a data directory.
pub const INDEX_FILE: &str = "index.ssix";

/// Default file name of the catalog artifact inside a data directory.
pub const CATALOG_FILE: &str = "catalog.json";

/// Locations of the two artifacts loaded at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub index_path: PathBuf,
    pub catalog_path: PathBuf,
}

impl ArtifactPaths {
    pub fn new(index_path: impl Into<PathBuf>, catalog_path: impl Into<PathBuf>) -> Self {
        Self {
            index_path: index_path.into(),
            catalog_path: catalog_path.into(),
        }
    }

    /// The default artifact names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join(INDEX_FILE), dir.join(CATALOG_FILE))
    }
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self::in_dir("data")
    }
}

/// Persist an index and its catalog to `paths`.
pub fn write_artifacts(
    paths: &ArtifactPaths,
    index: &IndexStructure,
    catalog: &ItemCatalog,
) -> Result<()> {
    let artifacts = artifact::save(index, catalog)?;
    write_atomic(&paths.index_path, &artifacts.index)?;
    write_atomic(&paths.catalog_path, &artifacts.catalog)?;

    tracing::info!(
        index = %paths.index_path.display(),
        catalog = %paths.catalog_path.display(),
        vectors = index.len(),
        bytes = artifacts.index.len(),
        "wrote artifacts"
    );
    Ok(())
}

/// Load both artifacts. A missing or unreadable file is `AssetsUnavailable`.
pub fn read_artifacts(paths: &ArtifactPaths) -> Result<(IndexStructure, ItemCatalog)> {
    let index_bytes = read_index_bytes(&paths.index_path)?;
    let catalog_bytes = fs::read(&paths.catalog_path)
        .map_err(|e| unavailable(&paths.catalog_path, e))?;
    artifact::load(&index_bytes, &catalog_bytes)
}

/// Read only the header of an index artifact file.
pub fn read_header(path: impl AsRef<Path>) -> Result<ArtifactHeader> {
    let bytes = read_index_bytes(path.as_ref())?;
    artifact::inspect(&bytes)
}

/// Borrowed view of the index file contents.
enum IndexBytes {
    Mapped(memmap2::Mmap),
    Read(Vec<u8>),
}

impl std::ops::Deref for IndexBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            IndexBytes::Mapped(map) => &map[..],
            IndexBytes::Read(buf) => &buf[..],
        }
    }
}

fn read_index_bytes(path: &Path) -> Result<IndexBytes> {
    let file = File::open(path).map_err(|e| unavailable(path, e))?;
    // SAFETY: the mapping is read-only and dropped before this load returns;
    // artifacts are replaced by rename, never rewritten in place.
    match unsafe { memmap2::Mmap::map(&file) } {
        Ok(map) => Ok(IndexBytes::Mapped(map)),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "mmap unavailable, reading file");
            fs::read(path)
                .map(IndexBytes::Read)
                .map_err(|e| unavailable(path, e))
        }
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            fs::create_dir_all(parent)?;
            parent
        }
        None => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn unavailable(path: &Path, err: std::io::Error) -> SearchError {
    SearchError::AssetsUnavailable(format!("{}: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogEntry;
    use crate::distance::DistanceMetric;
    use crate::flat_index::FlatIndex;
    use crate::store::VectorStore;
    use crate::vector::Vector;
    use tempfile::TempDir;

    fn sample() -> (IndexStructure, ItemCatalog) {
        let store = VectorStore::from_flat(2, vec![0.0, 0.0, 1.0, 0.0]).unwrap();
        let index = FlatIndex::new(store, DistanceMetric::L2).unwrap().into();
        let catalog = vec![CatalogEntry::new("a", "x"), CatalogEntry::new("b", "y")].into();
        (index, catalog)
    }

    #[test]
    fn test_write_and_read() {
        let dir = TempDir::new().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path().join("nested"));
        let (index, catalog) = sample();

        write_artifacts(&paths, &index, &catalog).unwrap();
        assert!(paths.index_path.exists());
        assert!(paths.catalog_path.exists());

        let (loaded, loaded_catalog) = read_artifacts(&paths).unwrap();
        assert_eq!(loaded_catalog, catalog);
        let q = Vector::new(vec![0.9, 0.0]);
        assert_eq!(loaded.search(&q, 2).unwrap(), index.search(&q, 2).unwrap());

        let header = read_header(&paths.index_path).unwrap();
        assert_eq!(header.count, 2);
    }

    #[test]
    fn test_missing_files() {
        let dir = TempDir::new().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());
        assert!(matches!(
            read_artifacts(&paths),
            Err(SearchError::AssetsUnavailable(_))
        ));

        let (index, catalog) = sample();
        write_artifacts(&paths, &index, &catalog).unwrap();
        fs::remove_file(&paths.catalog_path).unwrap();
        assert!(matches!(
            read_artifacts(&paths),
            Err(SearchError::AssetsUnavailable(_))
        ));
    }

    #[test]
    fn test_concurrent_writers_leave_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());
        let (index, catalog) = sample();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| write_artifacts(&paths, &index, &catalog)))
                .collect();
            for handle in handles {
                handle.join().unwrap().unwrap();
            }
        });

        let (loaded, loaded_catalog) = read_artifacts(&paths).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded_catalog, catalog);

        let mut names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, vec![CATALOG_FILE.to_string(), INDEX_FILE.to_string()]);
    }

    #[test]
    fn test_empty_index_file_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());
        let (index, catalog) = sample();
        write_artifacts(&paths, &index, &catalog).unwrap();
        fs::write(&paths.index_path, b"").unwrap();

        assert!(matches!(
            read_artifacts(&paths),
            Err(SearchError::CorruptArtifact(_))
        ));
    }
}
