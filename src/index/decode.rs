//! Decoder from the compact tuple representation to a [`CrateIndex`].

use super::kind::ItemKind;
use super::model::{CrateIndex, EntityRef, ItemRecord, PathRecord, Signature, TypeRef};
use crate::config::DecodeOptions;
use crate::error::{DanglingReferenceError, FormatError, RefSite, Table};
use serde_json::{Map, Value};

/// Schema version written by the encoder. Payloads without a `"v"` field are version 1.
pub const SCHEMA_VERSION: u64 = 1;

/// `[kind, name, module_path, description, parent_index, type_signature]`
const ITEM_ARITY: usize = 6;
/// `[kind, name]`
const PATH_ARITY: usize = 2;

/// Result of a successful decode.
#[derive(Debug, Clone)]
pub struct Decoded {
    pub index: CrateIndex,
    /// References that were out of bounds and replaced by the unknown sentinel.
    pub dangling: Vec<DanglingReferenceError>,
}

/// Parses JSON text and decodes it. See [`decode`].
pub fn decode_str(
    crate_name: &str,
    text: &str,
    options: &DecodeOptions,
) -> Result<Decoded, FormatError> {
    let raw: Value = serde_json::from_str(text)?;
    decode(crate_name, &raw, options)
}

/// Decodes and validates one library's raw search index.
///
/// Structural problems (arity, field types, unknown kinds, unsupported version)
/// abort with a [`FormatError`]. Out-of-range path references do not: they are
/// replaced by [`EntityRef::Unknown`] and reported in [`Decoded::dangling`].
pub fn decode(
    crate_name: &str,
    raw: &Value,
    options: &DecodeOptions,
) -> Result<Decoded, FormatError> {
    let object = raw.as_object().ok_or(FormatError::NotAnObject)?;
    check_version(object)?;

    let raw_paths = table(object, Table::Paths)?;
    let raw_items = table(object, Table::Items)?;

    let paths = raw_paths
        .iter()
        .enumerate()
        .map(|(index, value)| decode_path(index, value, options))
        .collect::<Result<Vec<_>, _>>()?;

    let mut decoder = ItemDecoder::new(paths.len(), options);
    let items = raw_items
        .iter()
        .enumerate()
        .map(|(index, value)| decoder.item(index, value))
        .collect::<Result<Vec<_>, _>>()?;

    for dangling in &decoder.dangling {
        tracing::warn!("Search index for '{}': {}", crate_name, dangling);
    }
    tracing::debug!(
        "Decoded search index for '{}' ({} items, {} paths, {} dangling references)",
        crate_name,
        items.len(),
        paths.len(),
        decoder.dangling.len()
    );

    Ok(Decoded {
        index: CrateIndex::new(crate_name.to_string(), items, paths),
        dangling: decoder.dangling,
    })
}

fn check_version(object: &Map<String, Value>) -> Result<(), FormatError> {
    match object.get("v") {
        None => Ok(()),
        Some(value) => match value.as_u64() {
            Some(SCHEMA_VERSION) => Ok(()),
            Some(other) => Err(FormatError::UnsupportedVersion(other)),
            None => Err(FormatError::InvalidVersion),
        },
    }
}

fn table(object: &Map<String, Value>, table: Table) -> Result<&[Value], FormatError> {
    let key = match table {
        Table::Items => "items",
        Table::Paths => "paths",
    };
    object
        .get(key)
        .ok_or(FormatError::MissingTable(table))?
        .as_array()
        .map(Vec::as_slice)
        .ok_or(FormatError::TableNotArray(table))
}

fn tuple(table: Table, index: usize, value: &Value, arity: usize) -> Result<&[Value], FormatError> {
    let elements = value.as_array().ok_or(FormatError::FieldType {
        table,
        index,
        field: "entry",
        expected: "an array",
    })?;
    if elements.len() != arity {
        return Err(FormatError::Arity {
            table,
            index,
            expected: arity,
            found: elements.len(),
        });
    }
    Ok(elements.as_slice())
}

fn kind(
    table: Table,
    index: usize,
    value: &Value,
    options: &DecodeOptions,
) -> Result<ItemKind, FormatError> {
    let code = value.as_u64().ok_or(FormatError::FieldType {
        table,
        index,
        field: "kind",
        expected: "an unsigned integer",
    })?;
    let kind = u8::try_from(code)
        .map(ItemKind::from_code)
        .map_err(|_| FormatError::UnknownKind { table, index, code })?;

    if kind.is_known() {
        Ok(kind)
    } else if options.allow_unknown_kinds {
        tracing::debug!("{}[{}]: keeping unrecognized kind {}", table, index, code);
        Ok(kind)
    } else {
        Err(FormatError::UnknownKind { table, index, code })
    }
}

fn string<'a>(
    table: Table,
    index: usize,
    field: &'static str,
    value: &'a Value,
) -> Result<&'a str, FormatError> {
    value.as_str().ok_or(FormatError::FieldType {
        table,
        index,
        field,
        expected: "a string",
    })
}

fn decode_path(index: usize, value: &Value, options: &DecodeOptions) -> Result<PathRecord, FormatError> {
    let fields = tuple(Table::Paths, index, value, PATH_ARITY)?;
    Ok(PathRecord {
        kind: kind(Table::Paths, index, &fields[0], options)?,
        name: string(Table::Paths, index, "name", &fields[1])?.to_string(),
    })
}

/// Expands the "empty means same as before" convention of one column.
#[derive(Default)]
struct RunLength {
    last: String,
}

impl RunLength {
    fn resolve(&mut self, raw: &str) -> String {
        if !raw.is_empty() {
            raw.clone_into(&mut self.last);
        }
        self.last.clone()
    }
}

struct ItemDecoder<'a> {
    paths_len: usize,
    options: &'a DecodeOptions,
    names: RunLength,
    module_paths: RunLength,
    dangling: Vec<DanglingReferenceError>,
}

impl<'a> ItemDecoder<'a> {
    fn new(paths_len: usize, options: &'a DecodeOptions) -> Self {
        Self {
            paths_len,
            options,
            names: RunLength::default(),
            module_paths: RunLength::default(),
            dangling: Vec::new(),
        }
    }

    fn item(&mut self, index: usize, value: &Value) -> Result<ItemRecord, FormatError> {
        let fields = tuple(Table::Items, index, value, ITEM_ARITY)?;

        let kind = kind(Table::Items, index, &fields[0], self.options)?;
        let name = string(Table::Items, index, "name", &fields[1])?;
        let module_path = string(Table::Items, index, "module path", &fields[2])?;
        let description = string(Table::Items, index, "description", &fields[3])?;

        let parent = match &fields[4] {
            Value::Null => None,
            value => Some(self.reference(index, RefSite::Parent, "parent index", value)?),
        };
        let signature = match &fields[5] {
            Value::Null => None,
            value => Some(self.signature(index, value)?),
        };

        Ok(ItemRecord {
            kind,
            name: self.names.resolve(name),
            module_path: self.module_paths.resolve(module_path),
            description: description.to_string(),
            parent,
            signature,
        })
    }

    fn signature(&mut self, index: usize, value: &Value) -> Result<Signature, FormatError> {
        let invalid = |field| FormatError::FieldType {
            table: Table::Items,
            index,
            field,
            expected: "an object with an `inputs` array",
        };
        let object = value.as_object().ok_or_else(|| invalid("type signature"))?;
        let raw_inputs = object
            .get("inputs")
            .and_then(Value::as_array)
            .ok_or_else(|| invalid("inputs"))?;

        let inputs = raw_inputs
            .iter()
            .enumerate()
            .map(|(position, ty)| self.type_ref(index, RefSite::Input(position), ty))
            .collect::<Result<Vec<_>, _>>()?;
        let output = match object.get("output") {
            None | Some(Value::Null) => None,
            Some(ty) => Some(self.type_ref(index, RefSite::Output, ty)?),
        };

        Ok(Signature { inputs, output })
    }

    fn type_ref(&mut self, index: usize, site: RefSite, value: &Value) -> Result<TypeRef, FormatError> {
        match value {
            Value::String(name) => Ok(TypeRef::Primitive(name.clone())),
            Value::Number(_) => Ok(TypeRef::Entity(self.reference(index, site, "type", value)?)),
            Value::Object(object) => match object.get("name") {
                Some(Value::String(name)) => Ok(TypeRef::Named(name.clone())),
                _ => Err(FormatError::FieldType {
                    table: Table::Items,
                    index,
                    field: "type",
                    expected: "an object with a `name` string",
                }),
            },
            _ => Err(FormatError::FieldType {
                table: Table::Items,
                index,
                field: "type",
                expected: "a type name or path index",
            }),
        }
    }

    /// Bounds-checks a path index. Out-of-range values become the unknown sentinel.
    fn reference(
        &mut self,
        index: usize,
        site: RefSite,
        field: &'static str,
        value: &Value,
    ) -> Result<EntityRef, FormatError> {
        let raw = if let Some(unsigned) = value.as_u64() {
            match usize::try_from(unsigned) {
                Ok(position) if position < self.paths_len => return Ok(EntityRef::Path(position)),
                _ => i128::from(unsigned),
            }
        } else if let Some(negative) = value.as_i64() {
            i128::from(negative)
        } else {
            return Err(FormatError::FieldType {
                table: Table::Items,
                index,
                field,
                expected: "an integer",
            });
        };

        self.dangling.push(DanglingReferenceError {
            item: index,
            site,
            index: raw,
            paths_len: self.paths_len,
        });
        Ok(EntityRef::Unknown { raw })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};
    use rstest::rstest;
    use serde_json::json;

    fn strict() -> DecodeOptions {
        DecodeOptions::default()
    }

    #[test]
    fn test_run_length_expansion() {
        let raw = json!({
            "items": [
                [3, "Foo", "mod::a", "A foo.", null, null],
                [11, "", "", "", null, null],
                [11, "bar", "", "", null, null],
                [3, "Baz", "mod::b", "", null, null],
            ],
            "paths": [],
        });
        let_assert!(Ok(decoded) = decode("demo", &raw, &strict()));
        let items = decoded.index.items();

        check!(items[1].name == "Foo");
        check!(items[1].module_path == "mod::a");
        check!(items[1].description.is_empty());
        check!(items[2].name == "bar");
        check!(items[2].module_path == "mod::a");
        check!(items[3].module_path == "mod::b");
    }

    #[test]
    fn test_leading_empty_name_stays_empty() {
        let raw = json!({
            "items": [[0, "", "actors", "Root module.", null, null]],
            "paths": [],
        });
        let_assert!(Ok(decoded) = decode("actors", &raw, &strict()));
        check!(decoded.index.items()[0].name.is_empty());
        check!(decoded.index.items()[0].module_path == "actors");
    }

    #[test]
    fn test_parent_resolves_to_path() {
        let raw = json!({
            "items": [[11, "send", "demo", "", 1, null]],
            "paths": [[3, "Cell"], [8, "Sender"]],
        });
        let_assert!(Ok(decoded) = decode("demo", &raw, &strict()));
        let item = &decoded.index.items()[0];
        let_assert!(Some(parent) = decoded.index.parent_of(item));
        check!(parent.name == "Sender");
        check!(parent.kind == ItemKind::Trait);
        check!(decoded.dangling.is_empty());
    }

    #[rstest]
    #[case(json!(999), 999)]
    #[case(json!(2), 2)]
    #[case(json!(-1), -1)]
    #[case(json!(u64::MAX), i128::from(u64::MAX))]
    #[case(json!(i64::MIN), i128::from(i64::MIN))]
    fn test_dangling_parent_becomes_unknown(#[case] parent: Value, #[case] raw_index: i128) {
        let raw = json!({
            "items": [
                [11, "send", "demo", "", parent, null],
                [11, "recv", "demo", "", 0, null],
            ],
            "paths": [[3, "Cell"], [8, "Sender"]],
        });
        let_assert!(Ok(decoded) = decode("demo", &raw, &strict()));
        let items = decoded.index.items();

        check!(items[0].parent == Some(EntityRef::Unknown { raw: raw_index }));
        check!(decoded.index.parent_of(&items[0]).is_none());
        check!(items[1].parent == Some(EntityRef::Path(0)));

        let_assert!([dangling] = decoded.dangling.as_slice());
        check!(dangling.item == 0);
        check!(dangling.site == RefSite::Parent);
        check!(dangling.index == raw_index);
        check!(dangling.paths_len == 2);
    }

    #[test]
    fn test_signature_decoding() {
        let raw = json!({
            "items": [[5, "spawn", "demo", "", null, {
                "inputs": [0, "usize", {"name": "fnmut"}, 7],
                "output": 0,
            }]],
            "paths": [[3, "Handle"]],
        });
        let_assert!(Ok(decoded) = decode("demo", &raw, &strict()));
        let_assert!(Some(signature) = &decoded.index.items()[0].signature);

        check!(
            signature.inputs
                == vec![
                    TypeRef::Entity(EntityRef::Path(0)),
                    TypeRef::Primitive("usize".to_string()),
                    TypeRef::Named("fnmut".to_string()),
                    TypeRef::Entity(EntityRef::Unknown { raw: 7 }),
                ]
        );
        check!(signature.output == Some(TypeRef::Entity(EntityRef::Path(0))));

        let_assert!([dangling] = decoded.dangling.as_slice());
        check!(dangling.site == RefSite::Input(3));
    }

    #[test]
    fn test_dangling_output_becomes_unknown() {
        let raw = json!({
            "items": [[5, "build", "demo", "", null, {"inputs": [0], "output": 7}]],
            "paths": [[3, "Builder"]],
        });
        let_assert!(Ok(decoded) = decode("demo", &raw, &strict()));
        let_assert!(Some(signature) = &decoded.index.items()[0].signature);

        check!(signature.inputs == vec![TypeRef::Entity(EntityRef::Path(0))]);
        check!(signature.output == Some(TypeRef::Entity(EntityRef::Unknown { raw: 7 })));
        check!(decoded.index.unknown_reference_count() == 1);

        let_assert!([dangling] = decoded.dangling.as_slice());
        check!(dangling.item == 0);
        check!(dangling.site == RefSite::Output);
        check!(dangling.index == 7);
        check!(dangling.paths_len == 1);
    }

    #[test]
    fn test_signature_without_output() {
        let raw = json!({
            "items": [[10, "process", "demo", "", null, {"inputs": [], "output": null}]],
            "paths": [],
        });
        let_assert!(Ok(decoded) = decode("demo", &raw, &strict()));
        check!(decoded.index.items()[0].signature == Some(Signature::default()));
    }

    #[rstest]
    #[case::short_item(json!({"items": [[0, "a", "b"]], "paths": []}))]
    #[case::long_path(json!({"items": [], "paths": [[3, "A", "extra"]]}))]
    #[case::item_not_array(json!({"items": ["oops"], "paths": []}))]
    #[case::name_not_string(json!({"items": [[0, 5, "", "", null, null]], "paths": []}))]
    #[case::parent_not_integer(json!({"items": [[0, "a", "", "", "x", null]], "paths": []}))]
    #[case::parent_float(json!({"items": [[0, "a", "", "", 1.5, null]], "paths": [[3, "A"]]}))]
    #[case::bad_type_ref(json!({"items": [[5, "f", "", "", null, {"inputs": [true]}]], "paths": []}))]
    #[case::missing_inputs(json!({"items": [[5, "f", "", "", null, {"output": null}]], "paths": []}))]
    #[case::negative_kind(json!({"items": [[-1, "f", "", "", null, null]], "paths": []}))]
    #[case::missing_items(json!({"paths": []}))]
    #[case::missing_paths(json!({"items": []}))]
    #[case::items_not_array(json!({"items": {}, "paths": []}))]
    #[case::not_object(json!([[0, "a"]]))]
    fn test_format_errors(#[case] raw: Value) {
        check!(decode("demo", &raw, &strict()).is_err());
    }

    #[test]
    fn test_arity_error_details() {
        let raw = json!({"items": [[0, "a", "", "", null, null], [0, "b", "c"]], "paths": []});
        let_assert!(Err(FormatError::Arity { table, index, expected, found }) = decode("demo", &raw, &strict()));
        check!(table == Table::Items);
        check!(index == 1);
        check!(expected == 6);
        check!(found == 3);
    }

    #[rstest]
    #[case(json!({"items": [[42, "a", "", "", null, null]], "paths": []}), Table::Items, 42)]
    #[case(json!({"items": [], "paths": [[19, "A"]]}), Table::Paths, 19)]
    #[case(json!({"items": [], "paths": [[1000, "A"]]}), Table::Paths, 1000)]
    fn test_unknown_kind_rejected(#[case] raw: Value, #[case] expected_table: Table, #[case] expected_code: u64) {
        let_assert!(Err(FormatError::UnknownKind { table, code, .. }) = decode("demo", &raw, &strict()));
        check!(table == expected_table);
        check!(code == expected_code);
    }

    #[test]
    fn test_unknown_kind_allowed_by_option() {
        let raw = json!({"items": [[42, "a", "", "", 0, null]], "paths": [[19, "A"]]});
        let options = DecodeOptions {
            allow_unknown_kinds: true,
        };
        let_assert!(Ok(decoded) = decode("demo", &raw, &options));
        check!(decoded.index.items()[0].kind == ItemKind::Unknown(42));
        check!(decoded.index.paths()[0].kind == ItemKind::Unknown(19));
    }

    #[rstest]
    #[case(json!({"v": 1, "items": [], "paths": []}), true)]
    #[case(json!({"v": 2, "items": [], "paths": []}), false)]
    #[case(json!({"v": "1", "items": [], "paths": []}), false)]
    fn test_schema_version(#[case] raw: Value, #[case] accepted: bool) {
        check!(decode("demo", &raw, &strict()).is_ok() == accepted);
    }

    #[test]
    fn test_decode_str_invalid_json() {
        let_assert!(Err(FormatError::Json(_)) = decode_str("demo", "{\"items\": [", &strict()));
    }

    #[test]
    fn test_empty_index() {
        let_assert!(Ok(decoded) = decode_str("demo", r#"{"items": [], "paths": []}"#, &strict()));
        check!(decoded.index.items().is_empty());
        check!(decoded.index.paths().is_empty());
        check!(decoded.index.name() == "demo");
    }
}
