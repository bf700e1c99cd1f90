//! Search-index data model and its compact wire codec.
//!
//! Each library's index is a pair of tables: `items` (documented entities in
//! declaration order) and `paths` (named types and modules that items refer to
//! by position). On the wire, items are fixed-arity tuples whose empty `name`
//! and module-path fields repeat the previous item's value.

pub(crate) mod decode;
pub(crate) mod encode;
pub(crate) mod kind;
pub(crate) mod model;

pub use decode::{Decoded, SCHEMA_VERSION, decode, decode_str};
pub use encode::{Encoding, encode};
pub use kind::ItemKind;
pub use model::{CrateIndex, EntityRef, ItemRecord, PathRecord, Signature, TypeRef, UNKNOWN_ENTITY};
