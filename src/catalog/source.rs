//! Catalog sources.

use super::{parse_catalog, CatalogError, CatalogFormat, KnownSolids};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Something that can produce a known-solids table for a catalog key.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch(&self, key: &str) -> Result<KnownSolids, CatalogError>;
}

/// Catalogs stored as `<dir>/<key>.json`, `.yaml` or `.yml`.
#[derive(Debug, Clone)]
pub struct FileCatalog {
    dir: PathBuf,
}

impl FileCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileCatalog { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Find the file backing `key`. Keys are single path components.
    pub fn resolve(&self, key: &str) -> Result<(PathBuf, CatalogFormat), CatalogError> {
        if !is_valid_key(key) {
            return Err(CatalogError::InvalidKey(key.to_string()));
        }
        CatalogFormat::EXTENSIONS
            .iter()
            .map(|(ext, format)| (self.dir.join(format!("{}.{}", key, ext)), *format))
            .find(|(path, _)| path.is_file())
            .ok_or_else(|| CatalogError::NotFound(key.to_string()))
    }
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key != "."
        && key != ".."
        && !key.contains(['/', '\\', '\0'])
        && !key.starts_with('.')
}

#[async_trait]
impl CatalogSource for FileCatalog {
    async fn fetch(&self, key: &str) -> Result<KnownSolids, CatalogError> {
        let (path, format) = self.resolve(key)?;
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| CatalogError::Io {
                path: path.display().to_string(),
                source,
            })?;
        let solids = parse_catalog(&text, format)?;
        tracing::info!(key, path = %path.display(), entries = solids.len(), "catalog loaded");
        Ok(solids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("baking.json"), r#"{"sugar": 0.63}"#).unwrap();
        let cat = FileCatalog::new(dir.path());
        let solids = cat.fetch("baking").await.unwrap();
        assert_eq!(solids["sugar"], 0.63);
    }

    #[tokio::test]
    async fn test_fetch_prefers_json_over_yaml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("k.json"), r#"{"a": 1.0}"#).unwrap();
        std::fs::write(dir.path().join("k.yaml"), "b: 2.0\n").unwrap();
        let solids = FileCatalog::new(dir.path()).fetch("k").await.unwrap();
        assert!(solids.contains_key("a"));
    }

    #[tokio::test]
    async fn test_fetch_yml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("k.yml"), "salt: 0.46\n").unwrap();
        let solids = FileCatalog::new(dir.path()).fetch("k").await.unwrap();
        assert_eq!(solids["salt"], 0.46);
    }

    #[tokio::test]
    async fn test_fetch_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileCatalog::new(dir.path()).fetch("ghost").await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(ref k) if k == "ghost"));
    }

    #[tokio::test]
    async fn test_fetch_bad_contents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), "not json").unwrap();
        let err = FileCatalog::new(dir.path()).fetch("bad").await.unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
    }

    #[test]
    fn test_rejects_path_keys() {
        let cat = FileCatalog::new("/tmp");
        for key in ["", ".", "..", "../etc/passwd", "a/b", "a\\b", ".hidden"] {
            assert!(
                matches!(cat.resolve(key), Err(CatalogError::InvalidKey(_))),
                "key {:?} should be rejected",
                key
            );
        }
    }
}
