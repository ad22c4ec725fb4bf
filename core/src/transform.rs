//! Wire-to-field transforms and the per-model wire mapping.
//!
//! Transforms are lenient: a value of the wrong shape produces the output
//! type's default instead of an error, so one odd field never blocks the
//! rest of an update.

use std::marker::PhantomData;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};

use crate::model::ApiModel;

/// Converts one wire value into a typed field value.
pub trait Transform: Send + Sync {
    type Output;

    fn perform(&self, value: &Value) -> Self::Output;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StringTransform;

impl Transform for StringTransform {
    type Output = String;

    fn perform(&self, value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => String::new(),
        }
    }
}

/// Accepts string or numeric ids and always yields a string.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdTransform;

impl Transform for IdTransform {
    type Output = String;

    fn perform(&self, value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IntTransform;

impl Transform for IntTransform {
    type Output = i64;

    fn perform(&self, value: &Value) -> i64 {
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or_default(),
            Value::String(s) => s.trim().parse().unwrap_or_default(),
            Value::Bool(b) => i64::from(*b),
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FloatTransform;

impl Transform for FloatTransform {
    type Output = f64;

    fn perform(&self, value: &Value) -> f64 {
        match value {
            Value::Number(n) => n.as_f64().unwrap_or_default(),
            Value::String(s) => s.trim().parse().unwrap_or_default(),
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BoolTransform;

impl Transform for BoolTransform {
    type Output = bool;

    fn perform(&self, value: &Value) -> bool {
        match value {
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
            _ => false,
        }
    }
}

/// RFC 3339 timestamps, bare `YYYY-MM-DD` dates, or unix seconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTransform;

impl Transform for DateTransform {
    type Output = Option<DateTime<Utc>>;

    fn perform(&self, value: &Value) -> Option<DateTime<Utc>> {
        match value {
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDate::parse_from_str(s, "%Y-%m-%d")
                        .ok()
                        .and_then(|d| d.and_hms_opt(0, 0, 0))
                        .map(|dt| dt.and_utc())
                }),
            Value::Number(n) => n.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0)),
            _ => None,
        }
    }
}

/// Wraps another transform so that `null` maps to `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionalTransform<T>(pub T);

impl<T: Transform> Transform for OptionalTransform<T> {
    type Output = Option<T::Output>;

    fn perform(&self, value: &Value) -> Option<T::Output> {
        match value {
            Value::Null => None,
            other => Some(self.0.perform(other)),
        }
    }
}

/// Builds a nested model from a mapping.
pub struct ModelTransform<M>(PhantomData<fn() -> M>);

impl<M> ModelTransform<M> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<M> Default for ModelTransform<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: ApiModel> Transform for ModelTransform<M> {
    type Output = M;

    fn perform(&self, value: &Value) -> M {
        value.as_object().map(M::from_wire).unwrap_or_default()
    }
}

/// Builds a list of nested models, skipping entries that are not mappings.
pub struct ArrayTransform<M>(PhantomData<fn() -> M>);

impl<M> ArrayTransform<M> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<M> Default for ArrayTransform<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: ApiModel> Transform for ArrayTransform<M> {
    type Output = Vec<M>;

    fn perform(&self, value: &Value) -> Vec<M> {
        value
            .as_array()
            .map(|items| items.iter().filter_map(Value::as_object).map(M::from_wire).collect())
            .unwrap_or_default()
    }
}

type Setter<M> = Box<dyn Fn(&mut M, &Value) + Send + Sync>;

/// Ordered table of wire keys and the setters that apply them to a model.
pub struct WireMapping<M> {
    fields: Vec<(String, Setter<M>)>,
}

impl<M> Default for WireMapping<M> {
    fn default() -> Self {
        Self { fields: Vec::new() }
    }
}

impl<M> WireMapping<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map wire `key` through `transform` into the field written by `set`.
    pub fn field<T, F>(mut self, key: &str, transform: T, set: F) -> Self
    where
        T: Transform + 'static,
        F: Fn(&mut M, T::Output) + Send + Sync + 'static,
    {
        let setter: Setter<M> = Box::new(move |model, value| set(model, transform.perform(value)));
        self.fields.push((key.to_string(), setter));
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(key, _)| key.as_str())
    }

    /// Overwrite every mapped field present in `wire`; absent keys are left
    /// untouched.
    pub fn apply(&self, model: &mut M, wire: &Map<String, Value>) {
        for (key, set) in &self.fields {
            if let Some(value) = wire.get(key) {
                set(model, value);
            }
        }
    }
}
