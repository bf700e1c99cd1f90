//! Shared test fixtures and utilities for integration tests.
//!
//! # Available Fixtures
//!
//! - `registry`: an empty registry with default (strict) decode options
//! - `fixture_registry`: a registry loaded from `tests/fixtures/search-index.js`
//!
//! [`TempWorkspace`] provides a temp directory for tests that write scripts or
//! snapshots to disk.

use docsearch_index::SearchRegistry;
use docsearch_index::script::load_script;
use rstest::fixture;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Returns the project root directory (where Cargo.toml lives).
pub fn project_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

/// Path of the checked-in search-index script.
pub fn fixture_script() -> PathBuf {
    project_root().join("tests/fixtures/search-index.js")
}

/// A temporary directory that is removed when dropped.
#[allow(dead_code)] // Methods used across different integration test crates
pub struct TempWorkspace {
    _temp: TempDir,
    root: PathBuf,
}

#[allow(dead_code)] // Methods used across different integration test crates
impl TempWorkspace {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let root = temp.path().to_path_buf();
        Self { _temp: temp, root }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Creates a file with the given content, creating parent directories as needed.
    ///
    /// # Panics
    /// Panics if file creation fails.
    pub fn create_file(&self, path: &str, content: &str) -> PathBuf {
        let full_path = self.root.join(path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).unwrap_or_else(|e| {
                panic!("Failed to create parent directory for '{}': {}", path, e)
            });
        }
        std::fs::write(&full_path, content)
            .unwrap_or_else(|e| panic!("Failed to write file '{}': {}", path, e));
        full_path
    }
}

impl Default for TempWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a single-item payload whose only item is named `name`.
#[allow(dead_code)]
pub fn single_item(name: &str) -> Value {
    json!({
        "items": [[3, name, "demo", "", null, null]],
        "paths": [],
    })
}

#[allow(dead_code)]
#[fixture]
pub fn registry() -> SearchRegistry {
    SearchRegistry::default()
}

#[allow(dead_code)]
#[fixture]
pub fn fixture_registry() -> SearchRegistry {
    let registry = SearchRegistry::default();
    load_script(&registry, &fixture_script()).expect("fixture script should load");
    registry
}
