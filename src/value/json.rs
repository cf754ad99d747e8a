//! Conversions between state values and `serde_json` values.

use super::{List, Record, Value};
use serde_json::{Map, Number, Value as Json};

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::from(s),
            Json::Array(items) => Value::List(items.into_iter().map(Value::from).collect::<List>()),
            Json::Object(map) => Value::Record(map.into_iter().collect::<Record>()),
        }
    }
}

impl From<Json> for Record {
    /// Non-object JSON becomes an empty record.
    fn from(json: Json) -> Self {
        match json {
            Json::Object(map) => map.into_iter().collect(),
            _ => Record::new(),
        }
    }
}

impl Value {
    /// Render as JSON. Functions and non-finite floats become `null`.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Null | Value::Func(_) => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(n) => Json::Number((*n).into()),
            Value::Float(n) => Number::from_f64(*n).map_or(Json::Null, Json::Number),
            Value::Str(s) => Json::String(s.to_string()),
            Value::List(list) => Json::Array(list.iter().map(Value::to_json).collect()),
            Value::Record(record) => record.to_json(),
        }
    }
}

impl Record {
    /// Render as a JSON object.
    pub fn to_json(&self) -> Json {
        Json::Object(
            self.iter()
                .map(|(k, v)| (k.to_string(), v.to_json()))
                .collect::<Map<String, Json>>(),
        )
    }
}
