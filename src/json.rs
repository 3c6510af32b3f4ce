//! Conversion of decoded outputs back into JSON values.
use indexmap::IndexMap;
use serde_json::{Map, Number, Value};

use crate::leaf::Literal;

pub trait IntoJson {
    fn into_json(self) -> Value;
}

impl IntoJson for Value {
    fn into_json(self) -> Value {
        self
    }
}

impl IntoJson for String {
    fn into_json(self) -> Value {
        Value::String(self)
    }
}

impl IntoJson for bool {
    fn into_json(self) -> Value {
        Value::Bool(self)
    }
}

/// Whole numbers come back as JSON integers; non-finite values, which JSON
/// cannot carry, become `null`.
impl IntoJson for f64 {
    fn into_json(self) -> Value {
        if self.is_finite() && self.fract() == 0.0 && self.abs() < (i64::MAX as f64) {
            Value::from(self as i64)
        } else {
            Number::from_f64(self).map(Value::Number).unwrap_or(Value::Null)
        }
    }
}

impl IntoJson for Literal {
    fn into_json(self) -> Value {
        self.to_value()
    }
}

impl<A: IntoJson> IntoJson for Option<A> {
    fn into_json(self) -> Value {
        self.map(IntoJson::into_json).unwrap_or(Value::Null)
    }
}

impl<A: IntoJson> IntoJson for Vec<A> {
    fn into_json(self) -> Value {
        Value::Array(self.into_iter().map(IntoJson::into_json).collect())
    }
}

impl<A: IntoJson> IntoJson for IndexMap<String, A> {
    fn into_json(self) -> Value {
        Value::Object(self.into_iter().map(|(k, v)| (k, v.into_json())).collect())
    }
}

impl IntoJson for Map<String, Value> {
    fn into_json(self) -> Value {
        Value::Object(self)
    }
}

// ------------------------------- Tests ------------------------------------ //
