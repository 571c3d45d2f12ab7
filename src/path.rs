//! Dotted path navigation over JSON values
//!
//! Paths use dot notation: `"status"`, `"user.address.city"`, and array
//! indexes as plain segments, `"user.cities.0"`.

use serde_json::{Map, Value};

/// Result of probing a path
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathInfo<'a> {
    pub exists: bool,
    pub value: Option<&'a Value>,
}

/// Splits a dotted path into its segments
pub fn parse(path: &str) -> Vec<&str> {
    path.split('.').collect()
}

/// Joins segments back into a dotted path
pub fn format<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(".")
}

fn child<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn child_mut<'a>(value: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match value {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(move |i| items.get_mut(i)),
        _ => None,
    }
}

pub fn get_info<'a>(source: &'a Value, path: &str) -> PathInfo<'a> {
    let mut current = source;

    for segment in parse(path) {
        match child(current, segment) {
            Some(next) => current = next,
            None => {
                return PathInfo {
                    exists: false,
                    value: None,
                };
            }
        }
    }

    PathInfo {
        exists: true,
        value: Some(current),
    }
}

pub fn get<'a>(source: &'a Value, path: &str) -> Option<&'a Value> {
    get_info(source, path).value
}

pub fn has(source: &Value, path: &str) -> bool {
    get_info(source, path).exists
}

/// Writes `value` at `path`, creating missing intermediate objects.
///
/// Null intermediates are replaced by objects. When an intermediate exists
/// but is not a container, the source is left untouched. An array index may
/// name an existing element or the position right after the last one;
/// anything further out leaves the source untouched.
pub fn set(source: &mut Value, path: &str, value: Value) {
    let segments = parse(path);
    let Some((last, intermediate)) = segments.split_last() else {
        return;
    };

    if !can_descend(source, intermediate, last) {
        return;
    }

    let mut current = source;
    for segment in intermediate {
        let slot = match current {
            Value::Object(map) => map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
            Value::Array(items) => match array_slot(items, segment) {
                Some(slot) => slot,
                None => return,
            },
            _ => return,
        };
        if slot.is_null() {
            *slot = Value::Object(Map::new());
        }
        current = slot;
    }

    match current {
        Value::Object(map) => {
            map.insert(last.to_string(), value);
        }
        Value::Array(items) => {
            if let Some(slot) = array_slot(items, last) {
                *slot = value;
            }
        }
        _ => {}
    }
}

/// Checks that every existing intermediate is a container (or missing/null)
/// and every array index is in reach, so that `set` never leaves a
/// half-written path behind.
fn can_descend(source: &Value, intermediate: &[&str], last: &str) -> bool {
    let mut current = source;
    for segment in intermediate {
        match current {
            Value::Object(_) => {}
            Value::Array(items) if index_in_reach(items, segment) => {}
            _ => return false,
        }
        match child(current, segment) {
            Some(next) if !next.is_null() => current = next,
            _ => return true,
        }
    }
    match current {
        Value::Object(_) => true,
        Value::Array(items) => index_in_reach(items, last),
        _ => false,
    }
}

fn index_in_reach(items: &[Value], segment: &str) -> bool {
    segment
        .parse::<usize>()
        .is_ok_and(|index| index <= items.len())
}

/// The element at `segment`, appending a null when it names the next position
fn array_slot<'a>(items: &'a mut Vec<Value>, segment: &str) -> Option<&'a mut Value> {
    let index = segment.parse::<usize>().ok()?;
    if index == items.len() {
        items.push(Value::Null);
    }
    items.get_mut(index)
}

/// Removes the value at `path`; missing intermediates leave the source unchanged
pub fn delete(source: &mut Value, path: &str) {
    let segments = parse(path);
    let Some((last, intermediate)) = segments.split_last() else {
        return;
    };

    let mut current = source;
    for segment in intermediate {
        match child_mut(current, segment) {
            Some(next) => current = next,
            None => return,
        }
    }

    match current {
        Value::Object(map) => {
            map.remove(*last);
        }
        Value::Array(items) => {
            if let Ok(index) = last.parse::<usize>() {
                if index < items.len() {
                    items.remove(index);
                }
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "status": 200,
            "user": {
                "address": { "city": "Lisbon" },
                "cities": ["Porto", "Braga"]
            }
        })
    }

    #[test]
    fn test_parse_and_format() {
        assert_eq!(parse("status"), vec!["status"]);
        assert_eq!(parse("user.cities.0"), vec!["user", "cities", "0"]);
        assert_eq!(format(&["user", "address", "city"]), "user.address.city");
        assert_eq!(format(&["status"]), "status");
    }

    #[test]
    fn test_get_info() {
        let source = sample();

        let info = get_info(&source, "user.address.city");
        assert!(info.exists);
        assert_eq!(info.value, Some(&json!("Lisbon")));

        assert_eq!(get(&source, "user.cities.1"), Some(&json!("Braga")));
        assert!(!get_info(&source, "user.phone").exists);
        assert!(!get_info(&source, "status.code").exists);
        assert!(!has(&json!("oops"), "status"));
    }

    #[test]
    fn test_has_distinguishes_null_from_missing() {
        let source = json!({ "status": null });
        assert!(has(&source, "status"));
        assert_eq!(get(&source, "status"), Some(&Value::Null));
        assert!(!has(&source, "code"));
    }

    #[test]
    fn test_set_then_get_round_trip() {
        let mut source = sample();

        set(&mut source, "status", json!(404));
        assert_eq!(get(&source, "status"), Some(&json!(404)));

        set(&mut source, "user.address.zip", json!("1000"));
        assert_eq!(get(&source, "user.address.zip"), Some(&json!("1000")));

        set(&mut source, "meta.trace.id", json!("abc"));
        assert_eq!(get(&source, "meta.trace.id"), Some(&json!("abc")));

        set(&mut source, "user.cities.0", json!("Faro"));
        assert_eq!(get(&source, "user.cities.0"), Some(&json!("Faro")));
        assert_eq!(get(&source, "user.cities.1"), Some(&json!("Braga")));
    }

    #[test]
    fn test_set_through_scalar_leaves_source_untouched() {
        let mut source = sample();
        set(&mut source, "status.code", json!(500));
        assert_eq!(source, sample());
    }

    #[test]
    fn test_set_array_index_out_of_reach_leaves_source_untouched() {
        let mut source = json!({ "items": [] });
        set(&mut source, "items.18446744073709551615", json!(1));
        set(&mut source, "items.4000000000", json!(1));
        set(&mut source, "items.1.name", json!("x"));
        assert_eq!(source, json!({ "items": [] }));

        set(&mut source, "items.0", json!(1));
        set(&mut source, "items.1.name", json!("x"));
        assert_eq!(source, json!({ "items": [1, { "name": "x" }] }));
    }

    #[test]
    fn test_delete_then_has() {
        let mut source = sample();

        delete(&mut source, "status");
        assert!(!has(&source, "status"));

        delete(&mut source, "user.address.city");
        assert!(!has(&source, "user.address.city"));
        assert!(has(&source, "user.address"));

        delete(&mut source, "user.cities.0");
        assert_eq!(get(&source, "user.cities"), Some(&json!(["Braga"])));
    }

    #[test]
    fn test_delete_missing_path_is_noop() {
        let mut source = sample();
        delete(&mut source, "user.phone.number");
        assert_eq!(source, sample());
    }
}
