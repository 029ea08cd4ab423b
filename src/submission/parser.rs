use serde_json::{Map, Value};

/// Parse a submission body based on its Content-Type header.
///
/// Form-encoded bodies become an object of strings, with repeated keys
/// collected into arrays. Everything else must be JSON with an object or
/// array at the top level.
pub fn parse_body(content_type: Option<&str>, body: &[u8]) -> Result<Value, String> {
    let ct = content_type.unwrap_or("application/json");

    if ct.contains("application/x-www-form-urlencoded") {
        return parse_form_urlencoded(body);
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Err("Empty body".to_string());
    }

    let value: Value = serde_json::from_slice(body).map_err(|e| format!("Invalid JSON: {e}"))?;
    match value {
        Value::Object(_) | Value::Array(_) => Ok(value),
        _ => Err("Expected a JSON object or array".to_string()),
    }
}

fn parse_form_urlencoded(body: &[u8]) -> Result<Value, String> {
    if std::str::from_utf8(body).is_err() {
        return Err("Invalid UTF-8 in form body".to_string());
    }

    // A repeated key collects its values into an array, in submission order.
    let mut map = Map::new();
    for (k, v) in form_urlencoded::parse(body) {
        let value = Value::String(v.into_owned());
        match map.get_mut(k.as_ref()) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(k.into_owned(), value);
            }
        }
    }
    Ok(Value::Object(map))
}
