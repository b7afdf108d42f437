//! Picture Catalog Cache
//!
//! The full list of pictures the analysis service can serve, fetched once at
//! startup and read-only afterwards. The reveal gate reads prefixes of it.
//!
//! Entries live behind an `Arc<[PictureEntry]>`, so cloning the catalog
//! never copies the list.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::service::AnalysisService;

/// One picture as listed by `GET /pictures`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PictureEntry {
    /// File name, e.g. `horse_01.jpg`
    pub name: String,
    /// Server-relative path, e.g. `/data/horse_01.jpg`
    pub url: String,
    /// Category label (`flowers`, `animals`, `general`, ...)
    #[serde(rename = "type")]
    pub kind: String,
    /// Descriptive tags, in server order
    #[serde(default)]
    pub tags: Vec<String>,
}

impl PictureEntry {
    /// Tags joined for display
    #[must_use]
    pub fn tag_line(&self) -> String {
        self.tags.join(", ")
    }
}

/// Read-only cache of the service's picture list
#[derive(Clone, Debug)]
pub struct PictureCatalog {
    entries: Arc<[PictureEntry]>,
    loaded: bool,
}

impl Default for PictureCatalog {
    fn default() -> Self {
        Self {
            entries: Arc::from(Vec::new()),
            loaded: false,
        }
    }
}

impl PictureCatalog {
    /// An empty, not-yet-loaded catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from already-fetched entries
    #[must_use]
    pub fn from_entries(entries: Vec<PictureEntry>) -> Self {
        Self {
            entries: entries.into(),
            loaded: true,
        }
    }

    /// Fetch the picture list from the service
    ///
    /// On failure the cache is cleared to empty rather than left partially
    /// populated, and the error is returned for logging. Callers treat the
    /// empty catalog as the degraded state; nothing is retried.
    pub async fn load<S>(&mut self, service: &S) -> Result<&[PictureEntry], FetchError>
    where
        S: AnalysisService + ?Sized,
    {
        match service.pictures().await {
            Ok(entries) => {
                tracing::info!(count = entries.len(), "Picture catalog loaded");
                self.entries = entries.into();
                self.loaded = true;
                Ok(&self.entries[..])
            }
            Err(e) => {
                tracing::warn!(error = %e, "Picture catalog unavailable, using empty catalog");
                self.entries = Arc::from(Vec::new());
                self.loaded = true;
                Err(e)
            }
        }
    }

    /// All entries in catalog order
    #[must_use]
    pub fn all(&self) -> &[PictureEntry] {
        &self.entries
    }

    /// The first `min(n, len)` entries
    #[must_use]
    pub fn prefix(&self, n: usize) -> &[PictureEntry] {
        &self.entries[..n.min(self.entries.len())]
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a load has been attempted (successfully or not)
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::test_support::StaticService;

    fn entry(name: &str) -> PictureEntry {
        PictureEntry {
            name: name.to_string(),
            url: format!("/data/{name}"),
            kind: "general".to_string(),
            tags: vec!["image".to_string()],
        }
    }

    #[test]
    fn test_picture_entry_wire_shape() {
        let json = r#"{"name":"horse.jpg","type":"animals","tags":["horse","animal"],"url":"/data/horse.jpg","score":null}"#;
        let parsed: PictureEntry = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.kind, "animals");
        assert_eq!(parsed.tag_line(), "horse, animal");
    }

    #[test]
    fn test_prefix_is_clamped() {
        let catalog = PictureCatalog::from_entries(vec![entry("a"), entry("b"), entry("c")]);
        assert_eq!(catalog.prefix(2).len(), 2);
        assert_eq!(catalog.prefix(10).len(), 3);
        assert!(catalog.prefix(0).is_empty());
        assert_eq!(catalog.prefix(1)[0].name, "a");
    }

    #[tokio::test]
    async fn test_load_success() {
        let service = StaticService::with_pictures(vec![entry("a"), entry("b")]);
        let mut catalog = PictureCatalog::new();
        assert!(!catalog.is_loaded());

        let loaded = catalog.load(&service).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(catalog.is_loaded());
        assert_eq!(catalog.all()[1].name, "b");
    }

    #[tokio::test]
    async fn test_load_failure_clears_catalog() {
        let mut catalog = PictureCatalog::from_entries(vec![entry("stale")]);
        let service = StaticService::failing();

        assert!(catalog.load(&service).await.is_err());
        assert!(catalog.is_empty());
        assert!(catalog.is_loaded());
    }
}
