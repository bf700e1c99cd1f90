//! Decoded, fully-resolved search index for a single library.
//!
//! Every value in here has already passed through the decoder: run-length
//! placeholders are expanded and out-of-range references are replaced by
//! [`EntityRef::Unknown`]. Nothing downstream needs to know about the compact
//! wire form.

use super::kind::ItemKind;
use serde::{Deserialize, Serialize};

/// Label shown for references that could not be resolved.
pub const UNKNOWN_ENTITY: &str = "{unknown}";

/// A named entity (type or module) interned in the path table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRecord {
    pub kind: ItemKind,
    pub name: String,
}

/// Reference from an item into the path table of the same library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityRef {
    /// A valid position in `paths`.
    Path(usize),
    /// Sentinel for a dangling index. `raw` is the value found on the wire.
    Unknown { raw: i128 },
}

impl EntityRef {
    pub const fn is_unknown(self) -> bool {
        matches!(self, Self::Unknown { .. })
    }
}

/// One entry of a function signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeRef {
    /// Primitive or otherwise unindexed type name, e.g. `u8` or `str`.
    Primitive(String),
    /// Lowercased type name from older generators (`{"name": "vec"}`).
    Named(String),
    /// Reference into the path table.
    Entity(EntityRef),
}

/// Input and output types of a callable item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub inputs: Vec<TypeRef>,
    pub output: Option<TypeRef>,
}

/// A documented entity with all placeholders resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub kind: ItemKind,
    pub name: String,
    /// Module path the item lives in, e.g. `actors::channel`.
    pub module_path: String,
    pub description: String,
    pub parent: Option<EntityRef>,
    pub signature: Option<Signature>,
}

/// The item and path tables of one library.
///
/// Constructed only by the decoder and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrateIndex {
    name: String,
    items: Vec<ItemRecord>,
    paths: Vec<PathRecord>,
}

impl CrateIndex {
    pub(crate) const fn new(name: String, items: Vec<ItemRecord>, paths: Vec<PathRecord>) -> Self {
        Self { name, items, paths }
    }

    /// Library name this index was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn items(&self) -> &[ItemRecord] {
        &self.items
    }

    pub fn paths(&self) -> &[PathRecord] {
        &self.paths
    }

    pub fn path(&self, index: usize) -> Option<&PathRecord> {
        self.paths.get(index)
    }

    /// Resolve a reference to its path record. `None` for the unknown sentinel.
    pub fn resolve(&self, entity: EntityRef) -> Option<&PathRecord> {
        match entity {
            EntityRef::Path(index) => self.paths.get(index),
            EntityRef::Unknown { .. } => None,
        }
    }

    /// The parent type or trait of an associated item.
    pub fn parent_of(&self, item: &ItemRecord) -> Option<&PathRecord> {
        item.parent.and_then(|parent| self.resolve(parent))
    }

    /// Display name of a type reference, as the search front-end shows it.
    pub fn type_name<'a>(&'a self, ty: &'a TypeRef) -> &'a str {
        match ty {
            TypeRef::Primitive(name) | TypeRef::Named(name) => name.as_str(),
            TypeRef::Entity(entity) => self
                .resolve(*entity)
                .map_or(UNKNOWN_ENTITY, |path| path.name.as_str()),
        }
    }

    /// Fully qualified path of an item, e.g. `actors::channel::ActorCell::create`.
    ///
    /// Items with a dangling parent are qualified with [`UNKNOWN_ENTITY`].
    pub fn qualified_path(&self, item: &ItemRecord) -> String {
        let mut segments: Vec<&str> = Vec::with_capacity(3);
        if !item.module_path.is_empty() {
            segments.push(&item.module_path);
        }
        if let Some(parent) = item.parent {
            segments.push(
                self.resolve(parent)
                    .map_or(UNKNOWN_ENTITY, |path| path.name.as_str()),
            );
        }
        if !item.name.is_empty() {
            segments.push(&item.name);
        }
        segments.join("::")
    }

    /// Items whose parent is the path entry at `index`.
    pub fn children_of(&self, index: usize) -> impl Iterator<Item = &ItemRecord> {
        self.items
            .iter()
            .filter(move |item| item.parent == Some(EntityRef::Path(index)))
    }

    /// Number of references that were neutralized to the unknown sentinel.
    pub fn unknown_reference_count(&self) -> usize {
        self.items
            .iter()
            .map(|item| {
                let parent = usize::from(item.parent.is_some_and(EntityRef::is_unknown));
                let signature = item.signature.as_ref().map_or(0, |sig| {
                    sig.inputs
                        .iter()
                        .chain(sig.output.iter())
                        .filter(|ty| matches!(ty, TypeRef::Entity(e) if e.is_unknown()))
                        .count()
                });
                parent + signature
            })
            .sum()
    }
}
