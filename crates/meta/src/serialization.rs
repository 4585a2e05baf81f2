//! Serialization and deserialization for catalog files
//!
//! Catalogs are stored as JSON files wrapping the projection list with a
//! schema version. A directory of catalog files can be loaded at once; the
//! projections of every file are merged into one catalog.

use crate::{MetadataCatalog, ProjectionMetadata, SCHEMA_VERSION};
use metamorph_core::{EngineError, EngineResult, Persistable};
use serde::{Deserialize, Serialize};
use std::path::Path;
use walkdir::WalkDir;

// ============================================================================
// Constants
// ============================================================================

/// File extension for catalog files
pub const CATALOG_EXTENSION: &str = "json";

// ============================================================================
// Catalog File Wrapper
// ============================================================================

/// Wrapper for catalog files that includes version information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFile {
    /// Schema version for migration purposes
    pub schema_version: u32,

    /// The projections stored in the file
    #[serde(default)]
    pub projections: Vec<ProjectionMetadata>,
}

impl CatalogFile {
    /// Create a new catalog file from projections
    pub fn new(projections: Vec<ProjectionMetadata>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            projections,
        }
    }

    /// Check if migration is needed
    pub fn needs_migration(&self) -> bool {
        self.schema_version < SCHEMA_VERSION
    }

    /// Migrate to the latest schema version
    pub fn migrate(&mut self) -> EngineResult<()> {
        if self.schema_version > SCHEMA_VERSION {
            return Err(EngineError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION,
                found: self.schema_version,
            });
        }
        while self.schema_version < SCHEMA_VERSION {
            self.migrate_one_version()?;
        }
        Ok(())
    }

    /// Migrate one version at a time
    fn migrate_one_version(&mut self) -> EngineResult<()> {
        match self.schema_version {
            // Version 0 files predate the wrapper fields; the layout is unchanged.
            0 => self.schema_version = 1,
            _ => self.schema_version = SCHEMA_VERSION,
        }
        Ok(())
    }
}

impl Persistable for CatalogFile {
    fn file_extension() -> &'static str {
        CATALOG_EXTENSION
    }

    fn schema_version() -> u32 {
        SCHEMA_VERSION
    }
}

// ============================================================================
// Save Functions
// ============================================================================

/// Save a catalog to a file
///
/// # Example
///
/// ```rust,ignore
/// use metamorph_meta::{MetadataCatalog, save_catalog};
///
/// let catalog = MetadataCatalog::empty();
/// save_catalog(&catalog, "catalog.json").unwrap();
/// ```
pub fn save_catalog(catalog: &MetadataCatalog, path: impl AsRef<Path>) -> EngineResult<()> {
    let path = path.as_ref();
    let file = CatalogFile::new(catalog.projections().to_vec());

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| EngineError::FileWrite {
                path: parent.to_path_buf(),
                message: e.to_string(),
            })?;
        }
    }

    file.save_to_file(path)?;
    tracing::info!(path = %path.display(), "catalog saved");
    Ok(())
}

/// Save a catalog to a JSON string
pub fn save_catalog_to_string(catalog: &MetadataCatalog) -> EngineResult<String> {
    CatalogFile::new(catalog.projections().to_vec()).to_json()
}

// ============================================================================
// Load Functions
// ============================================================================

/// Load a catalog from a file
pub fn load_catalog(path: impl AsRef<Path>) -> EngineResult<MetadataCatalog> {
    let projections = read_projections(path.as_ref())?;
    MetadataCatalog::new(projections)
}

/// Load a catalog from a JSON string
///
/// Accepts either a `CatalogFile` wrapper or a bare projection list.
pub fn load_catalog_from_string(json: &str) -> EngineResult<MetadataCatalog> {
    MetadataCatalog::new(parse_projections(json)?)
}

/// Load and merge every catalog file under a directory
pub fn load_catalog_dir(dir: impl AsRef<Path>) -> EngineResult<MetadataCatalog> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(EngineError::FileRead {
            path: dir.to_path_buf(),
            message: "not a directory".to_string(),
        });
    }

    let mut files: Vec<_> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Skipping unreadable catalog entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_catalog_path(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    // Deterministic merge order
    files.sort();

    let mut projections = Vec::new();
    for file in &files {
        let mut loaded = read_projections(file)?;
        tracing::debug!(path = %file.display(), projections = loaded.len(), "catalog file loaded");
        projections.append(&mut loaded);
    }

    tracing::info!(
        files = files.len(),
        projections = projections.len(),
        "catalog directory loaded"
    );
    MetadataCatalog::new(projections)
}

/// Load a catalog from a file or a directory of files
pub fn load_catalog_path(path: impl AsRef<Path>) -> EngineResult<MetadataCatalog> {
    let path = path.as_ref();
    if path.is_dir() {
        load_catalog_dir(path)
    } else {
        load_catalog(path)
    }
}

// ============================================================================
// Utility Functions
// ============================================================================

/// Check if a path carries the catalog file extension
pub fn is_catalog_path(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .is_some_and(|ext| ext == CATALOG_EXTENSION)
}

fn read_projections(path: &Path) -> EngineResult<Vec<ProjectionMetadata>> {
    if !path.exists() {
        return Err(EngineError::FileRead {
            path: path.to_path_buf(),
            message: "file does not exist".to_string(),
        });
    }

    let json = std::fs::read_to_string(path).map_err(|e| EngineError::FileRead {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    parse_projections(&json).map_err(|e| match e {
        EngineError::JsonSerialization(je) => EngineError::FileRead {
            path: path.to_path_buf(),
            message: format!("Invalid catalog file format: {}", je),
        },
        other => other,
    })
}

fn parse_projections(json: &str) -> EngineResult<Vec<ProjectionMetadata>> {
    if let Ok(mut file) = serde_json::from_str::<CatalogFile>(json) {
        if file.schema_version != SCHEMA_VERSION {
            file.migrate()?;
        }
        return Ok(file.projections);
    }

    // Bare projection list
    let projections: Vec<ProjectionMetadata> = serde_json::from_str(json)?;
    Ok(projections)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EntityMetadata, FieldMetadata};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sample_catalog() -> MetadataCatalog {
        MetadataCatalog::new(vec![
            ProjectionMetadata::new("P1", "sales").with_entity(
                EntityMetadata::new("PRD", "Product", "208")
                    .with_field(FieldMetadata::direct("id", "id"))
                    .with_field(FieldMetadata::direct("sku", "sku").mandatory())
                    .with_field(FieldMetadata::reference("category", "category", "CAT")),
            ),
            ProjectionMetadata::new("P2", "catalog")
                .with_entity(EntityMetadata::new("CAT", "Category", "209")),
        ])
        .unwrap()
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("catalog.json");

        save_catalog(&sample_catalog(), &path).unwrap();
        let loaded = load_catalog(&path).unwrap();

        assert_eq!(loaded.projections(), sample_catalog().projections());
        assert_eq!(
            loaded.entity("PRD").unwrap().field_names(),
            vec!["id", "sku", "category"]
        );
    }

    #[test]
    fn test_load_bare_projection_list() {
        let json = r#"[{"id":"P1","name":"sales","entities":[
            {"id":"PRD","name":"Product","table_id":"208",
             "fields":[{"name":"sku","property":"sku","mapping_kind":"Direct"}]}]}]"#;
        let catalog = load_catalog_from_string(json).unwrap();
        assert_eq!(catalog.entity_count(), 1);
    }

    #[test]
    fn test_migrates_old_schema() {
        let json = r#"{"schema_version":0,"projections":[]}"#;
        assert!(load_catalog_from_string(json).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_future_schema() {
        let json = r#"{"schema_version":99,"projections":[]}"#;
        assert!(matches!(
            load_catalog_from_string(json),
            Err(EngineError::SchemaVersionMismatch { found: 99, .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_catalog("/definitely/not/here.json").unwrap_err();
        assert!(err.is_io());
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_catalog(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid catalog file format"));
    }

    #[test]
    fn test_load_directory_merges_files() {
        let dir = TempDir::new().unwrap();
        let catalog = sample_catalog();
        let projections = catalog.into_projections();

        let first = MetadataCatalog::new(vec![projections[0].clone()]).unwrap();
        let second = MetadataCatalog::new(vec![projections[1].clone()]).unwrap();
        save_catalog(&first, dir.path().join("a.json")).unwrap();
        save_catalog(&second, dir.path().join("sub").join("b.json")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let merged = load_catalog_path(dir.path()).unwrap();
        assert_eq!(merged.projection_count(), 2);
        assert_eq!(merged.projections()[0].name, "sales");
        assert!(merged.entity("CAT").is_some());
    }

    #[test]
    fn test_is_catalog_path() {
        assert!(is_catalog_path("catalog.json"));
        assert!(!is_catalog_path("catalog.toml"));
        assert!(!is_catalog_path("catalog"));
    }
}
