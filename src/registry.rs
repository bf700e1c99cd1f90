//! Registry of decoded search indices, keyed by library name.
//!
//! The lifecycle is: create (or lazily obtain the process-wide instance), call
//! [`SearchRegistry::register`] once per library during the load phase, then
//! call [`SearchRegistry::finalize`] to obtain the read-only
//! [`FinalizedRegistry`] that the query engine works from.

use crate::config::DecodeOptions;
use crate::error::{DanglingReferenceError, RegisterError};
use crate::index::{self, CrateIndex};
use ahash::AHashMap;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock, OnceLock, PoisonError, RwLock};
use xxhash_rust::xxh3::xxh3_64;

static GLOBAL: OnceLock<SearchRegistry> = OnceLock::new();

static CRATE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("crate name pattern is valid"));

/// What a successful registration did to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// First registration under this name.
    Inserted,
    /// A different index was already registered under this name and was replaced.
    Replaced,
    /// The same content was registered again.
    Unchanged,
}

/// Result of a successful [`SearchRegistry::register`] call.
#[derive(Debug, Clone)]
pub struct Registration {
    pub outcome: RegistrationOutcome,
    /// References neutralized to the unknown sentinel while decoding.
    pub dangling: Vec<DanglingReferenceError>,
}

struct Entry {
    index: Arc<CrateIndex>,
    fingerprint: u64,
}

#[derive(Default)]
struct State {
    crates: AHashMap<String, Entry>,
    finalized: bool,
}

/// Mutable registry used during the load phase.
pub struct SearchRegistry {
    options: DecodeOptions,
    state: RwLock<State>,
    snapshot: OnceLock<Arc<FinalizedRegistry>>,
}

impl std::fmt::Debug for SearchRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("SearchRegistry")
            .field("options", &self.options)
            .field("crate_count", &state.crates.len())
            .field("finalized", &state.finalized)
            .finish()
    }
}

impl Default for SearchRegistry {
    fn default() -> Self {
        Self::new(DecodeOptions::default())
    }
}

impl SearchRegistry {
    pub fn new(options: DecodeOptions) -> Self {
        Self {
            options,
            state: RwLock::new(State::default()),
            snapshot: OnceLock::new(),
        }
    }

    /// The process-wide registry, created with default options on first use.
    pub fn global() -> &'static Self {
        GLOBAL.get_or_init(Self::default)
    }

    pub const fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Decodes `raw` and stores it under `crate_name`, replacing any previous entry.
    ///
    /// Decoding happens before the registry is touched, so on error the previous
    /// entry (or its absence) is preserved.
    pub fn register(&self, crate_name: &str, raw: &Value) -> Result<Registration, RegisterError> {
        if !is_valid_crate_name(crate_name) {
            return Err(RegisterError::InvalidName(crate_name.to_string()));
        }
        if self.is_finalized() {
            return Err(RegisterError::Finalized(crate_name.to_string()));
        }

        let decoded =
            index::decode(crate_name, raw, &self.options).map_err(|source| RegisterError::Format {
                crate_name: crate_name.to_string(),
                source,
            })?;
        let fingerprint = xxh3_64(raw.to_string().as_bytes());

        let outcome = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if state.finalized {
                return Err(RegisterError::Finalized(crate_name.to_string()));
            }
            let previous = state.crates.insert(
                crate_name.to_string(),
                Entry {
                    index: Arc::new(decoded.index),
                    fingerprint,
                },
            );
            match previous {
                None => RegistrationOutcome::Inserted,
                Some(entry) if entry.fingerprint == fingerprint => RegistrationOutcome::Unchanged,
                Some(_) => RegistrationOutcome::Replaced,
            }
        };

        match outcome {
            RegistrationOutcome::Inserted => {
                tracing::debug!("Registered search index for '{}'", crate_name);
            }
            RegistrationOutcome::Unchanged => {
                tracing::debug!("Search index for '{}' registered again, unchanged", crate_name);
            }
            RegistrationOutcome::Replaced => {
                tracing::warn!(
                    "Search index for '{}' registered twice, replacing previous index",
                    crate_name
                );
            }
        }

        Ok(Registration {
            outcome,
            dangling: decoded.dangling,
        })
    }

    /// Like [`register`](Self::register), taking the payload as JSON text.
    pub fn register_str(&self, crate_name: &str, text: &str) -> Result<Registration, RegisterError> {
        let raw: Value = serde_json::from_str(text).map_err(|e| RegisterError::Format {
            crate_name: crate_name.to_string(),
            source: e.into(),
        })?;
        self.register(crate_name, &raw)
    }

    pub fn get(&self, crate_name: &str) -> Option<Arc<CrateIndex>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.crates.get(crate_name).map(|entry| entry.index.clone())
    }

    pub fn len(&self) -> usize {
        self.state.read().unwrap_or_else(PoisonError::into_inner).crates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered library names, sorted.
    pub fn crate_names(&self) -> Vec<String> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = state.crates.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_finalized(&self) -> bool {
        self.state.read().unwrap_or_else(PoisonError::into_inner).finalized
    }

    /// Closes registration and returns the read-only view for querying.
    ///
    /// Idempotent: every call returns the same snapshot. An empty registry
    /// finalizes to an empty snapshot.
    pub fn finalize(&self) -> Arc<FinalizedRegistry> {
        self.snapshot
            .get_or_init(|| {
                let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
                state.finalized = true;
                let crates: BTreeMap<String, Arc<CrateIndex>> = state
                    .crates
                    .iter()
                    .map(|(name, entry)| (name.clone(), entry.index.clone()))
                    .collect();
                tracing::info!("Search registry finalized with {} libraries", crates.len());
                Arc::new(FinalizedRegistry { crates })
            })
            .clone()
    }
}

fn is_valid_crate_name(name: &str) -> bool {
    CRATE_NAME.is_match(name)
}

/// Read-only set of decoded indices handed to the query engine.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FinalizedRegistry {
    crates: BTreeMap<String, Arc<CrateIndex>>,
}

impl FinalizedRegistry {
    pub(crate) fn from_indices(indices: impl IntoIterator<Item = CrateIndex>) -> Self {
        Self {
            crates: indices
                .into_iter()
                .map(|index| (index.name().to_string(), Arc::new(index)))
                .collect(),
        }
    }

    pub fn get(&self, crate_name: &str) -> Option<&CrateIndex> {
        self.crates.get(crate_name).map(|index| &**index)
    }

    pub fn len(&self) -> usize {
        self.crates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.crates.is_empty()
    }

    /// Indices in library-name order.
    pub fn iter(&self) -> impl Iterator<Item = &CrateIndex> {
        self.crates.values().map(|index| &**index)
    }

    pub fn crate_names(&self) -> impl Iterator<Item = &str> {
        self.crates.keys().map(String::as_str)
    }

    /// Human-readable per-library overview.
    pub fn describe(&self) -> String {
        if self.crates.is_empty() {
            return "No libraries registered.\n".to_string();
        }

        let mut output = format!("Libraries ({}):\n", self.crates.len());
        for index in self.iter() {
            output.push_str(&format!(
                "  • {} ({} items, {} paths",
                index.name(),
                index.items().len(),
                index.paths().len()
            ));
            match index.unknown_reference_count() {
                0 => output.push_str(")\n"),
                unknown => output.push_str(&format!(", {} unresolved references)\n", unknown)),
            }
        }
        output
    }
}
