//! Remote variable model and its wire representation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Shown in place of any display field the server did not provide.
pub const PLACEHOLDER: &str = "—";

/// Cached copy of the server-owned variable.
///
/// Every display field is populated; absent payload fields are replaced with
/// [`PLACEHOLDER`]. `active` and `last_updated_time` stay optional because
/// they are rendered from typed values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteVariable {
    pub id: String,
    pub name: String,
    pub default_value: String,
    pub active: Option<bool>,
    /// Epoch milliseconds.
    pub last_updated_time: Option<i64>,
}

impl RemoteVariable {
    /// Message text suitable for seeding an edit draft. The placeholder is
    /// never offered as a draft.
    pub fn editable_value(&self) -> &str {
        if self.default_value == PLACEHOLDER { "" } else { &self.default_value }
    }
}

/// JSON body returned by `GET .../cad-variable/{id}`.
///
/// Every field is optional and loosely typed; [`VariablePayload::into_variable`]
/// decides how each shape is displayed instead of failing deserialization.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariablePayload {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub default_value: Option<Value>,
    #[serde(default)]
    pub active: Option<Value>,
    #[serde(default)]
    pub last_updated_time: Option<Value>,
}

impl VariablePayload {
    /// Convert the payload into the cached model. `requested_id` stands in for
    /// a missing `id`, since the widget always knows which variable it asked for.
    pub fn into_variable(self, requested_id: &str) -> RemoteVariable {
        RemoteVariable {
            id: display_text(self.id).unwrap_or_else(|| fallback(requested_id)),
            name: display_text(self.name).unwrap_or_else(|| PLACEHOLDER.to_string()),
            default_value: display_text(self.default_value).unwrap_or_else(|| PLACEHOLDER.to_string()),
            active: self.active.as_ref().and_then(flag),
            last_updated_time: self.last_updated_time.as_ref().and_then(epoch_millis),
        }
    }
}

/// Body sent with `PUT .../cad-variable/{id}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableUpdate {
    pub default_value: String,
}

fn fallback(requested_id: &str) -> String {
    if requested_id.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        requested_id.to_string()
    }
}

fn display_text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) if text.eq_ignore_ascii_case("true") => Some(true),
        Value::String(text) if text.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

/// Accepts integer or numeric-string timestamps. Fractional millis truncate.
fn epoch_millis(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|millis| millis.is_finite()).map(|millis| millis as i64)),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}
