//! Known-solids catalog: a name → displacement lookup table used to pre-fill
//! solids. Never required for computing a recipe.

pub mod fetcher;
pub mod source;

use indexmap::IndexMap;
use std::path::Path;

pub use fetcher::CatalogFetcher;
pub use source::{CatalogSource, FileCatalog};

/// Known solid names and their displacement, in catalog order.
pub type KnownSolids = IndexMap<String, f64>;

/// Why a catalog could not be produced.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("invalid catalog key '{0}'")]
    InvalidKey(String),
    #[error("no catalog named '{0}'")]
    NotFound(String),
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("catalog parse error: {0}")]
    Parse(String),
    #[error("catalog entry '{0}' has a non-finite displacement")]
    NonFinite(String),
    #[error("catalog task failed: {0}")]
    Task(String),
    #[error("catalog fetch aborted")]
    Aborted,
    #[error("no catalog fetch in flight")]
    Idle,
}

/// On-disk catalog encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogFormat {
    Json,
    Yaml,
}

impl CatalogFormat {
    /// Extensions tried, in order, when resolving a key.
    pub const EXTENSIONS: [(&'static str, CatalogFormat); 3] = [
        ("json", CatalogFormat::Json),
        ("yaml", CatalogFormat::Yaml),
        ("yml", CatalogFormat::Yaml),
    ];

    pub fn from_path(path: &Path) -> Option<CatalogFormat> {
        let ext = path.extension()?.to_str()?;
        Self::EXTENSIONS
            .iter()
            .find(|(e, _)| e.eq_ignore_ascii_case(ext))
            .map(|(_, f)| *f)
    }
}

/// Parse catalog text. Every displacement must be finite.
pub fn parse_catalog(text: &str, format: CatalogFormat) -> Result<KnownSolids, CatalogError> {
    let solids: KnownSolids = match format {
        CatalogFormat::Json => {
            serde_json::from_str(text).map_err(|e| CatalogError::Parse(e.to_string()))?
        }
        CatalogFormat::Yaml => {
            serde_yaml_ng::from_str(text).map_err(|e| CatalogError::Parse(e.to_string()))?
        }
    };
    if let Some((name, _)) = solids.iter().find(|(_, d)| !d.is_finite()) {
        return Err(CatalogError::NonFinite(name.clone()));
    }
    Ok(solids)
}
