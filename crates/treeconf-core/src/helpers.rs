//! Small builders for assembling config trees in code

use crate::error::{Error, Result};
use crate::value::Value;

/// Pick `then` when `condition` holds, otherwise `otherwise` (null if absent)
pub fn when(condition: bool, then: impl Into<Value>, otherwise: Option<Value>) -> Value {
    if condition {
        then.into()
    } else {
        otherwise.unwrap_or(Value::Null)
    }
}

/// Build a sequence by applying `f` to each of `values`
pub fn generate<I, F, V>(values: I, f: F) -> Value
where
    I: IntoIterator,
    F: FnMut(I::Item) -> V,
    V: Into<Value>,
{
    let mut f = f;
    Value::Sequence(values.into_iter().map(|item| f(item).into()).collect())
}

/// Map `f` over the elements of a sequence value
pub fn generate_from<F>(values: &Value, f: F) -> Result<Value>
where
    F: FnMut(&Value) -> Value,
{
    let items = values
        .as_sequence()
        .ok_or_else(|| Error::type_mismatch("<root>", "sequence", values.type_name()))?;
    Ok(Value::Sequence(items.iter().map(f).collect()))
}
