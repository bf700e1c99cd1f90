//! Item kind enumeration shared with the search front-end.
//!
//! The numeric codes follow rustdoc's item-type table, which is the convention
//! the query engine uses to label results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a documented entity or path entry.
///
/// Codes outside the known table are carried as [`ItemKind::Unknown`] so that a
/// consumer never has to deal with an open integer space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    Module,
    ExternCrate,
    Import,
    Struct,
    Enum,
    Function,
    TypeAlias,
    Static,
    Trait,
    Impl,
    TyMethod,
    Method,
    StructField,
    Variant,
    Macro,
    Primitive,
    AssocType,
    Constant,
    AssocConst,
    Unknown(u8),
}

/// Known kinds in code order. `KNOWN[code]` is the kind for `code`.
const KNOWN: [ItemKind; 19] = [
    ItemKind::Module,
    ItemKind::ExternCrate,
    ItemKind::Import,
    ItemKind::Struct,
    ItemKind::Enum,
    ItemKind::Function,
    ItemKind::TypeAlias,
    ItemKind::Static,
    ItemKind::Trait,
    ItemKind::Impl,
    ItemKind::TyMethod,
    ItemKind::Method,
    ItemKind::StructField,
    ItemKind::Variant,
    ItemKind::Macro,
    ItemKind::Primitive,
    ItemKind::AssocType,
    ItemKind::Constant,
    ItemKind::AssocConst,
];

impl ItemKind {
    /// Map a wire code to a kind, falling back to `Unknown` for codes outside the table.
    pub fn from_code(code: u8) -> Self {
        KNOWN
            .get(usize::from(code))
            .copied()
            .unwrap_or(Self::Unknown(code))
    }

    /// The wire code for this kind.
    pub fn code(self) -> u8 {
        match self {
            Self::Unknown(code) => code,
            known => KNOWN
                .iter()
                .position(|k| *k == known)
                .and_then(|pos| u8::try_from(pos).ok())
                .unwrap_or(u8::MAX),
        }
    }

    pub const fn is_known(self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    /// Short label used by the search front-end (e.g. `fn`, `struct`).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Module => "mod",
            Self::ExternCrate => "externcrate",
            Self::Import => "import",
            Self::Struct => "struct",
            Self::Enum => "enum",
            Self::Function => "fn",
            Self::TypeAlias => "type",
            Self::Static => "static",
            Self::Trait => "trait",
            Self::Impl => "impl",
            Self::TyMethod => "tymethod",
            Self::Method => "method",
            Self::StructField => "structfield",
            Self::Variant => "variant",
            Self::Macro => "macro",
            Self::Primitive => "primitive",
            Self::AssocType => "associatedtype",
            Self::Constant => "constant",
            Self::AssocConst => "associatedconstant",
            Self::Unknown(_) => "unknown",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "unknown({})", code),
            known => f.write_str(known.as_str()),
        }
    }
}
