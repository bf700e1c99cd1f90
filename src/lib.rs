//! Decoder, validator and registry for client-side documentation search indices.
//!
//! A documentation generator emits, per library, a column-compressed table of
//! documented items plus a table of the paths they refer to. This crate turns
//! that compact form into fully-resolved [`CrateIndex`] values, collects them in
//! a [`SearchRegistry`], and hands a read-only [`FinalizedRegistry`] to whatever
//! performs the actual lookups.

pub mod cli;
pub mod config;
pub mod error;
pub mod index;
pub mod registry;
pub mod script;
pub mod snapshot;
pub mod tracing;

pub use config::{Config, DecodeOptions};
pub use error::{
    DanglingReferenceError, FormatError, LibraryError, LoadError, RegisterError, Result, ScriptError,
};
pub use index::{CrateIndex, Encoding, EntityRef, ItemKind, ItemRecord, PathRecord, TypeRef};
pub use registry::{FinalizedRegistry, Registration, RegistrationOutcome, SearchRegistry};
