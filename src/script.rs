//! Reading and writing `search-index.js` scripts.
//!
//! The documentation generator emits one script for all libraries:
//!
//! ```text
//! var searchIndex = {};
//! searchIndex['actors'] = {"items":[...],"paths":[...]};
//! initSearch(searchIndex);
//! ```
//!
//! Each assignment is one registration, and the trailing `initSearch` call is
//! the finalize step.

use crate::error::{LibraryError, LoadError, ScriptError};
use crate::index::{Encoding, encode};
use crate::registry::{FinalizedRegistry, Registration, SearchRegistry};
use ignore::WalkBuilder;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"searchIndex\[\s*(?:'([^']+)'|"([^"]+)")\s*\]\s*=\s*"#)
        .expect("assignment pattern is valid")
});

static INIT_SEARCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"initSearch\s*\(\s*searchIndex\s*\)").expect("initSearch pattern is valid")
});

/// One `searchIndex['<name>'] = <payload>;` assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptEntry {
    pub crate_name: String,
    pub raw: Value,
}

/// Everything extracted from a script.
#[derive(Debug, Default)]
pub struct ScriptContents {
    pub entries: Vec<ScriptEntry>,
    /// Assignments whose payload could not be read as JSON.
    pub failed: Vec<ScriptError>,
    /// Whether the script hands the index to the search front-end.
    pub init_search: bool,
}

/// Extracts the per-library payloads from a script's source text.
///
/// Payload bodies are consumed as JSON, so text inside descriptions is never
/// mistaken for another assignment. A body that is not valid JSON is recorded
/// in [`ScriptContents::failed`] and scanning resumes right after its
/// assignment, so the libraries around it are still extracted.
pub fn parse_script(source: &str) -> ScriptContents {
    let mut contents = ScriptContents::default();
    let mut position = 0;

    while let Some(captures) = ASSIGNMENT.captures_at(source, position) {
        let crate_name = captures
            .get(1)
            .or_else(|| captures.get(2))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        let body_start = captures.get(0).map_or(position, |m| m.end());

        let mut stream =
            serde_json::Deserializer::from_str(&source[body_start..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(raw)) => {
                position = body_start + stream.byte_offset();
                contents.entries.push(ScriptEntry { crate_name, raw });
            }
            Some(Err(e)) => {
                contents.failed.push(ScriptError::Json {
                    crate_name,
                    offset: body_start + stream.byte_offset(),
                    source: e,
                });
                position = body_start;
            }
            None => {
                contents.failed.push(ScriptError::MissingValue {
                    crate_name,
                    offset: body_start,
                });
                position = body_start;
            }
        }
    }

    contents.init_search = INIT_SEARCH.is_match(&source[position..]);
    contents
}

/// Outcome of loading one script into a registry.
#[derive(Debug, Default)]
pub struct LoadSummary {
    pub path: PathBuf,
    pub registered: Vec<(String, Registration)>,
    /// Libraries that were skipped. Other libraries in the same script are
    /// still registered.
    pub failed: Vec<LibraryError>,
    pub init_search: bool,
}

impl LoadSummary {
    /// Total number of references neutralized across all registered libraries.
    pub fn dangling_count(&self) -> usize {
        self.registered
            .iter()
            .map(|(_, registration)| registration.dangling.len())
            .sum()
    }
}

/// Reads a script and registers every library it contains.
///
/// Only an unreadable file is an error; problems with individual libraries
/// end up in [`LoadSummary::failed`].
pub fn load_script(registry: &SearchRegistry, path: &Path) -> Result<LoadSummary, LoadError> {
    let source = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let contents = parse_script(&source);

    let mut summary = LoadSummary {
        path: path.to_path_buf(),
        init_search: contents.init_search,
        ..LoadSummary::default()
    };
    for e in contents.failed {
        tracing::warn!("{}: {}", path.display(), e);
        summary.failed.push(e.into());
    }
    for entry in contents.entries {
        match registry.register(&entry.crate_name, &entry.raw) {
            Ok(registration) => summary.registered.push((entry.crate_name, registration)),
            Err(e) => {
                tracing::warn!("{}: {}", path.display(), e);
                summary.failed.push(e.into());
            }
        }
    }

    tracing::info!(
        "Loaded {} ({} registered, {} failed, {} dangling references)",
        path.display(),
        summary.registered.len(),
        summary.failed.len(),
        summary.dangling_count()
    );
    Ok(summary)
}

/// Problems reported by a load, kept alongside a snapshot so that a cached
/// run reports the same thing as the run that built it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadDiagnostics {
    /// One line per library or script that could not be loaded.
    pub failures: Vec<String>,
    /// Scripts that never call `initSearch`.
    pub missing_init: Vec<PathBuf>,
}

impl LoadDiagnostics {
    pub fn collect(summaries: &[LoadSummary], errors: &[LoadError]) -> Self {
        let mut diagnostics = Self::default();
        for summary in summaries {
            diagnostics.failures.extend(
                summary
                    .failed
                    .iter()
                    .map(|failure| format!("{}: {}", summary.path.display(), failure)),
            );
            if !summary.init_search {
                diagnostics.missing_init.push(summary.path.clone());
            }
        }
        diagnostics
            .failures
            .extend(errors.iter().map(ToString::to_string));
        diagnostics
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty() && self.missing_init.is_empty()
    }
}

/// Finds `search-index*.js` files below `dir`, sorted by path.
pub fn find_scripts(dir: &Path) -> Vec<PathBuf> {
    let mut scripts: Vec<PathBuf> = WalkBuilder::new(dir)
        .standard_filters(false)
        .build()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_some_and(|t| t.is_file()))
        .map(ignore::DirEntry::into_path)
        .filter(|path| is_script_name(path))
        .collect();
    scripts.sort();
    scripts
}

/// Expands command-line sources: files are kept as given, directories are searched.
pub fn resolve_sources(sources: &[PathBuf]) -> Vec<PathBuf> {
    let mut scripts = Vec::new();
    for source in sources {
        if source.is_dir() {
            let found = find_scripts(source);
            if found.is_empty() {
                tracing::warn!("No search-index scripts found under {}", source.display());
            }
            scripts.extend(found);
        } else {
            scripts.push(source.clone());
        }
    }
    scripts
}

fn is_script_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with("search-index") && name.ends_with(".js"))
}

/// Renders a finalized registry back into the script format.
pub fn render_script(registry: &FinalizedRegistry, encoding: Encoding) -> String {
    let mut output = String::from("var searchIndex = {};\n");
    for index in registry.iter() {
        let _ = writeln!(
            output,
            "searchIndex['{}'] = {};",
            index.name(),
            encode(index, encoding)
        );
    }
    output.push_str("initSearch(searchIndex);\n");
    output
}
