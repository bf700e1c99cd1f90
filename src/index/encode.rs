//! Encoder from a [`CrateIndex`] back to the compact tuple representation.

use super::decode::SCHEMA_VERSION;
use super::model::{CrateIndex, EntityRef, ItemRecord, Signature, TypeRef};
use serde_json::{Value, json};

/// How repeated column values are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    /// Re-apply run-length placeholders: a name or module path equal to the
    /// previous item's is written as `""`.
    #[default]
    Compact,
    /// Write every field explicitly.
    Expanded,
}

/// Encodes an index into the literal the search front-end loads.
pub fn encode(index: &CrateIndex, encoding: Encoding) -> Value {
    let mut previous: Option<&ItemRecord> = None;
    let items: Vec<Value> = index
        .items()
        .iter()
        .map(|item| {
            let (name, module_path) = match (encoding, previous) {
                (Encoding::Compact, Some(prev)) => (
                    placeholder(&item.name, &prev.name),
                    placeholder(&item.module_path, &prev.module_path),
                ),
                _ => (item.name.as_str(), item.module_path.as_str()),
            };
            previous = Some(item);

            json!([
                item.kind.code(),
                name,
                module_path,
                item.description,
                item.parent.map(entity),
                item.signature.as_ref().map(signature),
            ])
        })
        .collect();

    let paths: Vec<Value> = index
        .paths()
        .iter()
        .map(|path| json!([path.kind.code(), path.name]))
        .collect();

    json!({
        "v": SCHEMA_VERSION,
        "items": items,
        "paths": paths,
    })
}

fn placeholder<'a>(value: &'a str, previous: &str) -> &'a str {
    if value == previous { "" } else { value }
}

fn entity(entity: EntityRef) -> Value {
    match entity {
        EntityRef::Path(index) => json!(index),
        // Decoded sentinels always fit in a u64 or an i64.
        EntityRef::Unknown { raw } => u64::try_from(raw)
            .map(Value::from)
            .or_else(|_| i64::try_from(raw).map(Value::from))
            .unwrap_or(Value::Null),
    }
}

fn type_ref(ty: &TypeRef) -> Value {
    match ty {
        TypeRef::Primitive(name) => json!(name),
        TypeRef::Named(name) => json!({ "name": name }),
        TypeRef::Entity(target) => entity(*target),
    }
}

fn signature(signature: &Signature) -> Value {
    json!({
        "inputs": signature.inputs.iter().map(type_ref).collect::<Vec<_>>(),
        "output": signature.output.as_ref().map(type_ref),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecodeOptions;
    use crate::index::decode::decode;
    use assert2::{check, let_assert};
    use rstest::rstest;

    fn sample() -> Value {
        json!({
            "items": [
                [0, "", "actors", "Actor-like concurrency for rust.", null, null],
                [0, "channel", "", "Channel-based actor-ref implementations", null, null],
                [3, "ActorCell", "actors::channel", "A simplistic environment.", null, null],
                [11, "create", "", "Create an ActorCell.", 0, {
                    "inputs": [{"name": "actorcell"}, "a"],
                    "output": {"name": "arc"},
                }],
                [11, "send", "", "", 0, {"inputs": [0, 1], "output": null}],
                [8, "ActorRef", "actors", "A handle.", null, null],
                [10, "send", "", "Send a message.", 1, {"inputs": [1], "output": 5}],
            ],
            "paths": [[3, "ActorCell"], [8, "ActorRef"]],
        })
    }

    #[rstest]
    #[case(Encoding::Compact)]
    #[case(Encoding::Expanded)]
    fn test_round_trip_preserves_content(#[case] encoding: Encoding) {
        let options = DecodeOptions::default();
        let_assert!(Ok(first) = decode("actors", &sample(), &options));
        let encoded = encode(&first.index, encoding);
        let_assert!(Ok(second) = decode("actors", &encoded, &options));

        check!(first.index == second.index);
        check!(first.dangling == second.dangling);
    }

    #[test]
    fn test_expanded_has_no_placeholders() {
        let_assert!(Ok(decoded) = decode("actors", &sample(), &DecodeOptions::default()));
        let encoded = encode(&decoded.index, Encoding::Expanded);
        let_assert!(Some(items) = encoded["items"].as_array());

        check!(items[3][1] == "create");
        check!(items[3][2] == "actors::channel");
        check!(items[4][2] == "actors::channel");
    }

    #[test]
    fn test_compact_reapplies_placeholders() {
        let_assert!(Ok(decoded) = decode("actors", &sample(), &DecodeOptions::default()));
        let encoded = encode(&decoded.index, Encoding::Compact);
        let_assert!(Some(items) = encoded["items"].as_array());

        check!(items[1][2] == "");
        check!(items[3][2] == "");
        check!(items[5][2] == "actors");
        check!(encoded["v"] == 1);
    }

    #[test]
    fn test_unknown_sentinel_keeps_raw_index() {
        let raw = json!({
            "items": [[11, "send", "demo", "", 999, {"inputs": [-3], "output": null}]],
            "paths": [[3, "Cell"], [8, "Sender"]],
        });
        let_assert!(Ok(decoded) = decode("demo", &raw, &DecodeOptions::default()));
        let encoded = encode(&decoded.index, Encoding::Expanded);

        check!(encoded["items"][0][4] == 999);
        check!(encoded["items"][0][5]["inputs"][0] == -3);
    }

    #[rstest]
    #[case(json!(u64::MAX))]
    #[case(json!(i64::MIN))]
    fn test_extreme_sentinels_round_trip(#[case] parent: Value) {
        let raw = json!({
            "items": [[11, "send", "demo", "", parent, {"inputs": [], "output": parent}]],
            "paths": [],
        });
        let options = DecodeOptions::default();
        let_assert!(Ok(decoded) = decode("demo", &raw, &options));
        let encoded = encode(&decoded.index, Encoding::Expanded);

        check!(encoded["items"][0][4] == parent);
        check!(encoded["items"][0][5]["output"] == parent);
        let_assert!(Ok(again) = decode("demo", &encoded, &options));
        check!(again.index == decoded.index);
    }
}
