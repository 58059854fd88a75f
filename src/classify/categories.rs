//! Extension → category mapping
//!
//! The category configuration is a JSON object of category name to a list of
//! extensions:
//!
//! ```json
//! { "documents": ["txt", "pdf"], "images": ["jpg", "png"] }
//! ```
//!
//! [`CategoryMap::load`] inverts it into an extension lookup. Extensions are
//! normalized to lowercase without a leading dot. If an extension is listed
//! under more than one category the later category wins and the clash is kept
//! in [`CategoryMap::conflicts`] so the caller can flag it.

use crate::core::error::{CollectorError, Result};
use log::{debug, warn};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Built-in category configuration used when no file is configured
pub const DEFAULT_CATEGORIES_JSON: &str = include_str!("../../categories.default.json");

/// Category used when an extension is not in the map
pub const DEFAULT_CATEGORY: &str = "other";

/// Source of the raw category configuration
///
/// Loading mechanics stay behind this trait so the classifier only sees text.
pub trait CategoryProvider {
    /// Name used in logs and errors (a path, or "built-in")
    fn describe(&self) -> String;

    /// Read the raw JSON text
    fn read_raw(&self) -> std::io::Result<String>;
}

/// Reads the category configuration from a JSON file
#[derive(Debug, Clone)]
pub struct FileCategoryProvider {
    path: PathBuf,
}

impl FileCategoryProvider {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CategoryProvider for FileCategoryProvider {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn read_raw(&self) -> std::io::Result<String> {
        fs::read_to_string(&self.path)
    }
}

/// Serves a category configuration held in memory
#[derive(Debug, Clone)]
pub struct InlineCategoryProvider {
    name: String,
    json: String,
}

impl InlineCategoryProvider {
    pub fn new(name: impl Into<String>, json: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            json: json.into(),
        }
    }

    /// The mapping compiled into the binary
    pub fn builtin() -> Self {
        Self::new("built-in categories", DEFAULT_CATEGORIES_JSON)
    }
}

impl CategoryProvider for InlineCategoryProvider {
    fn describe(&self) -> String {
        self.name.clone()
    }

    fn read_raw(&self) -> std::io::Result<String> {
        Ok(self.json.clone())
    }
}

/// An extension listed under more than one category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryConflict {
    pub extension: String,
    /// Category that lost
    pub previous: String,
    /// Category now in effect
    pub winner: String,
}

/// Immutable extension → category lookup
#[derive(Debug, Clone, Default)]
pub struct CategoryMap {
    by_extension: HashMap<String, String>,
    categories: Vec<String>,
    conflicts: Vec<CategoryConflict>,
    default_category: String,
}

impl CategoryMap {
    /// Load and invert the category configuration from `provider`
    ///
    /// Fails with `ConfigLoad` if the text cannot be read, is not JSON, or is
    /// not an object of string arrays.
    pub fn load(provider: &dyn CategoryProvider) -> Result<Self> {
        let source_name = provider.describe();
        let config_error = |message: String| CollectorError::ConfigLoad {
            source_name: source_name.clone(),
            message,
        };

        let raw = provider
            .read_raw()
            .map_err(|e| config_error(e.to_string()))?;
        let value: Value =
            serde_json::from_str(&raw).map_err(|e| config_error(format!("invalid JSON: {}", e)))?;

        let object = value
            .as_object()
            .ok_or_else(|| config_error("expected an object of category → [extensions]".into()))?;

        let mut map = Self {
            default_category: DEFAULT_CATEGORY.to_string(),
            ..Self::default()
        };

        for (category, extensions) in object {
            let list = extensions.as_array().ok_or_else(|| {
                config_error(format!("category '{}' must be an array of strings", category))
            })?;

            map.categories.push(category.clone());

            for ext in list {
                let ext = ext.as_str().ok_or_else(|| {
                    config_error(format!(
                        "category '{}' contains a non-string extension",
                        category
                    ))
                })?;
                map.insert(ext, category);
            }
        }

        for conflict in &map.conflicts {
            warn!(
                "Extension '{}' is listed under both '{}' and '{}'; using '{}'",
                conflict.extension, conflict.previous, conflict.winner, conflict.winner
            );
        }

        debug!(
            "Loaded {} extensions in {} categories from {}",
            map.by_extension.len(),
            map.categories.len(),
            source_name
        );

        Ok(map)
    }

    /// Override the category returned for unknown extensions
    pub fn with_default_category(mut self, category: impl Into<String>) -> Self {
        self.default_category = category.into();
        self
    }

    fn insert(&mut self, extension: &str, category: &str) {
        let extension = normalize_extension(extension);
        if extension.is_empty() {
            return;
        }

        if let Some(previous) = self
            .by_extension
            .insert(extension.clone(), category.to_string())
        {
            if previous != category {
                self.conflicts.push(CategoryConflict {
                    extension,
                    previous,
                    winner: category.to_string(),
                });
            }
        }
    }

    /// Category for `extension`, or the default category when unmapped
    pub fn resolve_category(&self, extension: &str) -> &str {
        self.by_extension
            .get(&normalize_extension(extension))
            .map(String::as_str)
            .unwrap_or(&self.default_category)
    }

    /// Category for `extension` if it is mapped
    pub fn get(&self, extension: &str) -> Option<&str> {
        self.by_extension
            .get(&normalize_extension(extension))
            .map(String::as_str)
    }

    /// Category names in configuration order
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Extensions mapped to `category`, sorted
    pub fn extensions_for(&self, category: &str) -> Vec<&str> {
        let mut exts: Vec<&str> = self
            .by_extension
            .iter()
            .filter(|(_, c)| c.as_str() == category)
            .map(|(e, _)| e.as_str())
            .collect();
        exts.sort_unstable();
        exts
    }

    /// Extensions that appeared under several categories
    pub fn conflicts(&self) -> &[CategoryConflict] {
        &self.conflicts
    }

    pub fn default_category(&self) -> &str {
        &self.default_category
    }

    pub fn len(&self) -> usize {
        self.by_extension.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_extension.is_empty()
    }
}

/// Lowercase and strip a leading dot
pub fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn load(json: &str) -> Result<CategoryMap> {
        CategoryMap::load(&InlineCategoryProvider::new("test", json))
    }

    #[test]
    fn test_inverts_categories() {
        let map = load(r#"{"documents": ["txt", "pdf"], "images": ["jpg"]}"#).unwrap();

        assert_eq!(map.resolve_category("txt"), "documents");
        assert_eq!(map.resolve_category("pdf"), "documents");
        assert_eq!(map.resolve_category("jpg"), "images");
        assert_eq!(map.len(), 3);
        assert_eq!(map.categories(), &["documents".to_string(), "images".to_string()]);
        assert!(map.conflicts().is_empty());
    }

    #[test]
    fn test_unknown_extension_falls_back_to_default() {
        let map = load(r#"{"images": ["jpg"]}"#).unwrap();

        assert_eq!(map.resolve_category("xyz"), DEFAULT_CATEGORY);
        assert_eq!(map.resolve_category(""), DEFAULT_CATEGORY);
        assert!(map.get("xyz").is_none());

        let map = map.with_default_category("misc");
        assert_eq!(map.resolve_category("xyz"), "misc");
    }

    #[test]
    fn test_extensions_are_normalized() {
        let map = load(r#"{"images": [".JPG", "Png"]}"#).unwrap();

        assert_eq!(map.resolve_category("jpg"), "images");
        assert_eq!(map.resolve_category("JPG"), "images");
        assert_eq!(map.resolve_category(".png"), "images");
    }

    #[test]
    fn test_duplicate_extension_last_wins_and_is_reported() {
        let map = load(r#"{"documents": ["txt"], "notes": ["txt"]}"#).unwrap();

        assert_eq!(map.resolve_category("txt"), "notes");
        assert_eq!(
            map.conflicts(),
            &[CategoryConflict {
                extension: "txt".to_string(),
                previous: "documents".to_string(),
                winner: "notes".to_string(),
            }]
        );
    }

    #[test]
    fn test_malformed_config_is_config_load_error() {
        for bad in [
            "not json",
            r#"["txt"]"#,
            r#"{"documents": "txt"}"#,
            r#"{"documents": [1, 2]}"#,
        ] {
            assert!(
                matches!(load(bad), Err(CollectorError::ConfigLoad { .. })),
                "expected ConfigLoad for {}",
                bad
            );
        }
    }

    #[test]
    fn test_missing_file_is_config_load_error() {
        let temp_dir = TempDir::new().unwrap();
        let provider = FileCategoryProvider::new(temp_dir.path().join("missing.json"));

        assert!(matches!(
            CategoryMap::load(&provider),
            Err(CollectorError::ConfigLoad { .. })
        ));
    }

    #[test]
    fn test_file_provider_reads_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("categories.json");
        fs::write(&path, r#"{"audio": ["mp3", "flac"]}"#).unwrap();

        let map = CategoryMap::load(&FileCategoryProvider::new(&path)).unwrap();
        assert_eq!(map.extensions_for("audio"), vec!["flac", "mp3"]);
    }

    #[test]
    fn test_builtin_categories_load() {
        let map = CategoryMap::load(&InlineCategoryProvider::builtin()).unwrap();

        assert!(!map.is_empty());
        assert_eq!(map.resolve_category("jpg"), "images");
        assert_eq!(map.resolve_category("txt"), "documents");
        assert_eq!(
            map.resolve_category(crate::classify::sniff::media_subtype("audio/mpeg")),
            "audio"
        );
        assert!(map.conflicts().is_empty());
    }
}
