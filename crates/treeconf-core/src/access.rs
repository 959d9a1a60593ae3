//! Path-based typed access to a config tree
//!
//! The strict accessor ([`get`]) fails when a segment is missing or the node
//! has the wrong kind. The lenient accessor ([`get_optional`]) reports a
//! missing segment as `None`. Both treat descending *through* a scalar as a
//! structural error rather than a missing value, so a typo in the shape of the
//! tree is never silently read as "absent".
//!
//! Segments that parse as unsigned integers index into sequences.

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::path::Path;
use crate::value::{Mapping, Value, ValueKind};

/// Walk `path` from `root`
///
/// Returns `Ok(None)` when a key or index is missing and an error when a
/// segment tries to descend into something that cannot contain it.
pub fn lookup<'a>(root: &'a Value, path: &Path) -> Result<Option<&'a Value>> {
    let mut current = root;

    for (i, segment) in path.segments().iter().enumerate() {
        let next = match current {
            Value::Mapping(map) => map.get(segment),
            Value::Sequence(seq) => match parse_index(segment) {
                Some(idx) => seq.get(idx),
                None => {
                    return Err(Error::type_mismatch(path.prefix(i).to_string(), "mapping", "sequence")
                        .with_cause(format!("Cannot look up key '{}' in a sequence", segment)))
                }
            },
            scalar => {
                return Err(Error::type_mismatch(
                    path.prefix(i).to_string(),
                    "mapping or sequence",
                    scalar.type_name(),
                )
                .with_cause(format!("Cannot descend into a scalar to reach '{}'", path)))
            }
        };

        match next {
            Some(value) => current = value,
            None => return Ok(None),
        }
    }

    Ok(Some(current))
}

/// A sequence index is a non-empty run of ASCII digits
fn parse_index(segment: &str) -> Option<usize> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

/// Get the value at `path`, checked against `expected`
pub fn get<'a>(root: &'a Value, path: impl Into<Path>, expected: ValueKind) -> Result<&'a Value> {
    let path = path.into();
    let value = lookup(root, &path)?.ok_or_else(|| Error::path_not_found(path.to_string()))?;

    if !expected.matches(value) {
        return Err(Error::type_mismatch(
            path.to_string(),
            expected.name(),
            value.type_name(),
        ));
    }

    Ok(value)
}

/// Get the value at `path`, or `None` if any segment is missing
pub fn get_optional<'a>(root: &'a Value, path: impl Into<Path>) -> Result<Option<&'a Value>> {
    lookup(root, &path.into())
}

/// Check the value at `path` with an arbitrary predicate
pub fn validate_with_predicate<F>(root: &Value, path: impl Into<Path>, predicate: F) -> Result<()>
where
    F: Fn(&Value) -> bool,
{
    let path = path.into();
    let value = get(root, &path, ValueKind::Any)?;

    if !predicate(value) {
        return Err(Error::validation(path.to_string(), format!("Data: {}", value)));
    }

    Ok(())
}

pub fn get_str<'a>(root: &'a Value, path: impl Into<Path>) -> Result<&'a str> {
    let value = get(root, path, ValueKind::String)?;
    Ok(value.as_str().unwrap_or_default())
}

pub fn get_i64(root: &Value, path: impl Into<Path>) -> Result<i64> {
    let value = get(root, path, ValueKind::Integer)?;
    Ok(value.as_i64().unwrap_or_default())
}

/// Get a number; integers widen to f64
pub fn get_f64(root: &Value, path: impl Into<Path>) -> Result<f64> {
    let value = get(root, path, ValueKind::Number)?;
    Ok(value.as_f64().unwrap_or_default())
}

pub fn get_bool(root: &Value, path: impl Into<Path>) -> Result<bool> {
    let value = get(root, path, ValueKind::Bool)?;
    Ok(value.as_bool().unwrap_or_default())
}

pub fn get_mapping<'a>(root: &'a Value, path: impl Into<Path>) -> Result<&'a Mapping> {
    let path = path.into();
    get(root, &path, ValueKind::Mapping)?
        .as_mapping()
        .ok_or_else(|| Error::internal(format!("mapping check passed for '{}'", path)))
}

pub fn get_sequence<'a>(root: &'a Value, path: impl Into<Path>) -> Result<&'a [Value]> {
    let path = path.into();
    get(root, &path, ValueKind::Sequence)?
        .as_sequence()
        .ok_or_else(|| Error::internal(format!("sequence check passed for '{}'", path)))
}

/// Deserialize the value at `path` into any serde type
pub fn get_as<T: DeserializeOwned>(root: &Value, path: impl Into<Path>) -> Result<T> {
    let path = path.into();
    let value = get(root, &path, ValueKind::Any)?;
    from_value(value).map_err(|e| e.with_path(path.to_string()))
}

/// Deserialize a value into any serde type
pub(crate) fn from_value<T: DeserializeOwned>(value: &Value) -> Result<T> {
    let json = serde_json::to_value(value).map_err(|e| Error::internal(e.to_string()))?;
    serde_json::from_value(json).map_err(|e| {
        Error::type_mismatch("", std::any::type_name::<T>(), value.type_name()).with_cause(e.to_string())
    })
}
