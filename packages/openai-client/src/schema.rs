//! Strict JSON schemas for structured output, generated with `schemars`.
//!
//! OpenAI's strict mode wants every object closed (`additionalProperties:
//! false`), every property listed in `required` and no `$ref` indirection.
//! `schemars` emits none of that by default, so the generated schema is
//! rewritten before it is sent.

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Types that can be requested as structured output.
///
/// Blanket-implemented for everything that is `JsonSchema + DeserializeOwned`.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    /// Strict-mode schema for this type.
    fn openai_schema() -> Value {
        let mut value = serde_json::to_value(schema_for!(Self)).unwrap_or_default();
        let definitions = value
            .as_object_mut()
            .and_then(|root| {
                root.remove("$schema");
                root.remove("definitions")
            })
            .unwrap_or(Value::Null);
        make_strict(&mut value, &definitions);
        value
    }

    /// Name used for the `json_schema.name` field.
    fn type_name() -> String {
        <Self as JsonSchema>::schema_name()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

/// Inline `$ref`s and close every object schema, depth first.
fn make_strict(value: &mut Value, definitions: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(target) = resolve_ref(map, definitions) {
                *value = target;
                make_strict(value, definitions);
                return;
            }
            if map.get("type").and_then(Value::as_str) == Some("object") {
                close_object(map);
            }
            for child in map.values_mut() {
                make_strict(child, definitions);
            }
        }
        Value::Array(items) => {
            for item in items {
                make_strict(item, definitions);
            }
        }
        _ => {}
    }
}

fn resolve_ref(map: &Map<String, Value>, definitions: &Value) -> Option<Value> {
    let path = map.get("$ref")?.as_str()?;
    let name = path.strip_prefix("#/definitions/")?;
    definitions.get(name).cloned()
}

fn close_object(map: &mut Map<String, Value>) {
    map.insert("additionalProperties".to_string(), Value::Bool(false));
    let keys: Vec<Value> = match map.get("properties") {
        Some(Value::Object(props)) => props.keys().cloned().map(Value::String).collect(),
        _ => return,
    };
    map.insert("required".to_string(), Value::Array(keys));
}
