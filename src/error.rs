//! Error handling types and utilities.

use std::fmt;
use std::path::PathBuf;

/// A specialized Result type for application-level plumbing (CLI, config, snapshots).
///
/// This is an alias for `anyhow::Result` with context added via `.context()` and
/// `.with_context()` methods. Decoding and registration use the typed errors below.
pub type Result<T> = anyhow::Result<T>;

/// Which table a malformed tuple was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Items,
    Paths,
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Items => f.write_str("items"),
            Self::Paths => f.write_str("paths"),
        }
    }
}

/// Structural violation in a raw index. Fatal to decoding that library.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("index payload must be a JSON object")]
    NotAnObject,
    #[error("missing `{0}` table")]
    MissingTable(Table),
    #[error("`{0}` must be an array")]
    TableNotArray(Table),
    #[error("{table}[{index}]: expected a tuple of {expected} elements, found {found}")]
    Arity {
        table: Table,
        index: usize,
        expected: usize,
        found: usize,
    },
    #[error("{table}[{index}]: `{field}` must be {expected}")]
    FieldType {
        table: Table,
        index: usize,
        field: &'static str,
        expected: &'static str,
    },
    #[error("{table}[{index}]: unknown kind {code}")]
    UnknownKind {
        table: Table,
        index: usize,
        code: u64,
    },
    #[error("schema version must be an unsigned integer")]
    InvalidVersion,
    #[error("unsupported schema version {0}")]
    UnsupportedVersion(u64),
}

/// Where in an item a dangling reference was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefSite {
    Parent,
    Input(usize),
    Output,
}

impl fmt::Display for RefSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parent => f.write_str("parent"),
            Self::Input(position) => write!(f, "input #{}", position),
            Self::Output => f.write_str("output"),
        }
    }
}

/// A reference pointing outside the path table.
///
/// Non-fatal: the decoder replaces the reference with the unknown sentinel and
/// reports one of these per occurrence.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("items[{item}]: {site} references path {index}, but only {paths_len} paths exist")]
pub struct DanglingReferenceError {
    pub item: usize,
    pub site: RefSite,
    pub index: i128,
    pub paths_len: usize,
}

/// Error returned by [`crate::SearchRegistry::register`].
///
/// On any of these the registry is left exactly as it was before the call.
#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error("failed to decode search index for '{crate_name}': {source}")]
    Format {
        crate_name: String,
        #[source]
        source: FormatError,
    },
    #[error("invalid library name '{0}'")]
    InvalidName(String),
    #[error("registry already finalized, cannot register '{0}'")]
    Finalized(String),
}

/// Error while extracting one library's payload from a search-index script.
///
/// Only that library is skipped; scanning resumes at the next assignment.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("invalid JSON for '{crate_name}' at byte {offset}: {source}")]
    Json {
        crate_name: String,
        offset: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("missing value for '{crate_name}' at byte {offset}")]
    MissingValue { crate_name: String, offset: usize },
}

/// Why one library in a script was not registered.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error(transparent)]
    Register(#[from] RegisterError),
}

/// Error returned when a search-index script cannot be read at all.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
