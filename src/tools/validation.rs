//! Validate tool call arguments against their declared JSON Schema before
//! dispatch, so a tool never sees arguments violating its own declaration.

use serde_json::Value;

/// Validate `args` against `schema` (a JSON Schema object).
///
/// Checks the top level: object-ness when the schema declares an object,
/// presence of every `required` field, and the declared `type` of each
/// supplied property. Returns the first violation as a message.
pub fn validate_arguments(args: &Value, schema: &Value) -> Result<(), String> {
    let declares_object = schema.get("type").and_then(Value::as_str) == Some("object");
    if declares_object && !args.is_object() {
        return Err(format!(
            "arguments must be an object, got {}",
            type_name(args)
        ));
    }

    let Some(supplied) = args.as_object() else {
        return Ok(());
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            if !supplied.contains_key(name) {
                return Err(format!("required argument '{name}' is missing"));
            }
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };
    for (name, value) in supplied {
        let declared = properties
            .get(name)
            .and_then(|p| p.get("type"))
            .and_then(Value::as_str);
        if let Some(declared) = declared {
            if !matches_type(value, declared) {
                return Err(format!(
                    "argument '{name}' must be {declared}, got {}",
                    type_name(value)
                ));
            }
        }
    }

    Ok(())
}

fn matches_type(value: &Value, declared: &str) -> bool {
    match declared {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
