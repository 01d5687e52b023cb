//! Component identifiers and the wildcard pattern codec.
//!
//! A component is identified either by a plain string or by a dict of
//! key/value pairs. Dict ids used in callback definitions may carry
//! [`Wildcard`] markers in place of concrete values.
//!
//! Every lookup in the engine goes through the canonical string form
//! produced by [`ComponentId::stringify`], which sorts keys so that
//! structurally equal dict ids always map to the same key.
//!
//! # Example
//!
//! ```rust,ignore
//! use switchyard_core::{ComponentId, DictId, MATCH};
//!
//! let id = ComponentId::from(DictId::new().with("type", "item").with("index", MATCH));
//! assert_eq!(id.stringify(), r#"{"index":MATCH,"type":"item"}"#);
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};
use std::{cmp::Ordering, collections::BTreeMap, fmt};

use crate::error::IdError;

/// Separator between the outputs of a multi-output signature.
const MULTI_OUTPUT_SEPARATOR: &str = "...";
const INFINITY: &str = "Infinity";

/// Wildcard markers usable in dict ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Wildcard {
    /// Exactly one value, shared across all outputs of a callback.
    Match,
    /// Every value seen for the key.
    All,
    /// Every value ordered strictly before the value bound elsewhere.
    AllSmaller,
}

impl Wildcard {
    /// Bare name used in canonical strings and on the wire.
    pub const fn name(self) -> &'static str {
        match self {
            Wildcard::Match => "MATCH",
            Wildcard::All => "ALL",
            Wildcard::AllSmaller => "ALLSMALLER",
        }
    }

    /// Look up a marker by its bare name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "MATCH" => Some(Wildcard::Match),
            "ALL" => Some(Wildcard::All),
            "ALLSMALLER" => Some(Wildcard::AllSmaller),
            _ => None,
        }
    }

    /// Whether the marker can bind more than one component.
    pub const fn is_multi(self) -> bool {
        matches!(self, Wildcard::All | Wildcard::AllSmaller)
    }
}

impl fmt::Display for Wildcard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A concrete value of a dict id key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdValue {
    /// String value.
    String(String),
    /// Numeric value.
    Number(Number),
    /// Boolean value.
    Bool(bool),
}

impl IdValue {
    /// Numeric interpretation of the value.
    ///
    /// Numbers and strings that parse as numbers (after trimming) are
    /// numeric; booleans never are. The only non-finite strings accepted
    /// are `Infinity` and `-Infinity`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            IdValue::Number(n) => n.as_f64(),
            IdValue::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return None;
                }
                let infinity = trimmed.strip_prefix(['+', '-']).unwrap_or(trimmed) == INFINITY;
                trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite() || infinity)
            }
            IdValue::Bool(_) => None,
        }
    }

    /// A value ordered strictly before `self`.
    pub fn before(&self) -> IdValue {
        match self.as_number() {
            Some(n) => {
                let mut prev = n - 1.0;
                if prev == n {
                    prev = n - n.abs().max(1.0);
                }
                if !prev.is_finite() {
                    return IdValue::String(format!("-{INFINITY}"));
                }
                IdValue::from_f64(prev)
            }
            None => IdValue::from(0),
        }
    }

    /// A value ordered strictly after `self`.
    pub fn after(&self) -> IdValue {
        match self {
            IdValue::String(s) => IdValue::String(format!("{s}z")),
            _ => IdValue::String("z".to_string()),
        }
    }

    /// JSON form of the value.
    pub fn to_json(&self) -> Value {
        match self {
            IdValue::String(s) => Value::String(s.clone()),
            IdValue::Number(n) => Value::Number(n.clone()),
            IdValue::Bool(b) => Value::Bool(*b),
        }
    }

    /// Concrete value from JSON, if the JSON is a scalar.
    pub fn from_json(value: &Value) -> Option<IdValue> {
        match value {
            Value::String(s) => Some(IdValue::String(s.clone())),
            Value::Number(n) => Some(IdValue::Number(n.clone())),
            Value::Bool(b) => Some(IdValue::Bool(*b)),
            _ => None,
        }
    }

    fn from_f64(n: f64) -> IdValue {
        if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
            return IdValue::from(n as i64);
        }
        Number::from_f64(n)
            .map(IdValue::Number)
            .unwrap_or_else(|| IdValue::from(0))
    }
}

impl fmt::Display for IdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl From<&str> for IdValue {
    fn from(s: &str) -> Self {
        IdValue::String(s.to_string())
    }
}

impl From<String> for IdValue {
    fn from(s: String) -> Self {
        IdValue::String(s)
    }
}

impl From<bool> for IdValue {
    fn from(b: bool) -> Self {
        IdValue::Bool(b)
    }
}

impl From<i64> for IdValue {
    fn from(n: i64) -> Self {
        IdValue::Number(Number::from(n))
    }
}

impl From<i32> for IdValue {
    fn from(n: i32) -> Self {
        IdValue::Number(Number::from(n))
    }
}

impl From<u64> for IdValue {
    fn from(n: u64) -> Self {
        IdValue::Number(Number::from(n))
    }
}

impl From<usize> for IdValue {
    fn from(n: usize) -> Self {
        IdValue::Number(Number::from(n as u64))
    }
}

/// Total order over dict id values.
///
/// Numeric values (including numeric strings) come first and compare
/// numerically, then booleans (`false < true`), then the remaining strings
/// lexicographically.
pub fn id_val_sort(a: &IdValue, b: &IdValue) -> Ordering {
    fn rank(v: &IdValue) -> u8 {
        if v.as_number().is_some() {
            0
        } else if matches!(v, IdValue::Bool(_)) {
            1
        } else {
            2
        }
    }

    match (rank(a), rank(b)) {
        (0, 0) => {
            let (x, y) = (a.as_number().unwrap_or(0.0), b.as_number().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (1, 1) => match (a, b) {
            (IdValue::Bool(x), IdValue::Bool(y)) => x.cmp(y),
            _ => Ordering::Equal,
        },
        (2, 2) => match (a, b) {
            (IdValue::String(x), IdValue::String(y)) => x.cmp(y),
            _ => Ordering::Equal,
        },
        (ra, rb) => ra.cmp(&rb),
    }
}

/// The value of one dict id key: concrete or wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternValue {
    /// A concrete value.
    Exact(IdValue),
    /// A wildcard marker.
    Wild(Wildcard),
}

/// `MATCH` as a pattern value.
pub const MATCH: PatternValue = PatternValue::Wild(Wildcard::Match);
/// `ALL` as a pattern value.
pub const ALL: PatternValue = PatternValue::Wild(Wildcard::All);
/// `ALLSMALLER` as a pattern value.
pub const ALLSMALLER: PatternValue = PatternValue::Wild(Wildcard::AllSmaller);

impl PatternValue {
    /// The wildcard marker, if any.
    pub fn wildcard(&self) -> Option<Wildcard> {
        match self {
            PatternValue::Wild(w) => Some(*w),
            PatternValue::Exact(_) => None,
        }
    }

    /// The concrete value, if any.
    pub fn exact(&self) -> Option<&IdValue> {
        match self {
            PatternValue::Exact(v) => Some(v),
            PatternValue::Wild(_) => None,
        }
    }

    /// Whether this is the given wildcard.
    pub fn is(&self, wildcard: Wildcard) -> bool {
        self.wildcard() == Some(wildcard)
    }

    /// Wire form: wildcards become one-element arrays.
    pub fn to_json(&self) -> Value {
        match self {
            PatternValue::Exact(v) => v.to_json(),
            PatternValue::Wild(w) => Value::Array(vec![Value::String(w.name().to_string())]),
        }
    }

    fn from_json(key: &str, value: &Value) -> Result<Self, IdError> {
        if let Some(v) = IdValue::from_json(value) {
            return Ok(PatternValue::Exact(v));
        }
        let marker = match value {
            Value::Array(items) => match items.as_slice() {
                [Value::String(name)] => Wildcard::from_name(name),
                _ => None,
            },
            _ => None,
        };
        if let Some(w) = marker {
            return Ok(PatternValue::Wild(w));
        }
        Err(IdError::InvalidValue {
            key: key.to_string(),
            value: value.clone(),
        })
    }

    fn canonical(&self) -> String {
        match self {
            PatternValue::Exact(v) => v.to_string(),
            PatternValue::Wild(w) => w.name().to_string(),
        }
    }
}

impl From<Wildcard> for PatternValue {
    fn from(w: Wildcard) -> Self {
        PatternValue::Wild(w)
    }
}

macro_rules! exact_pattern_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for PatternValue {
                fn from(v: $ty) -> Self {
                    PatternValue::Exact(IdValue::from(v))
                }
            }
        )*
    };
}

exact_pattern_from!(&str, String, bool, i64, i32, u64, usize);

impl From<IdValue> for PatternValue {
    fn from(v: IdValue) -> Self {
        PatternValue::Exact(v)
    }
}

/// A dict id: sorted keys mapped to pattern values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DictId(BTreeMap<String, PatternValue>);

impl DictId {
    /// Create an empty dict id.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PatternValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PatternValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Build a concrete dict id from parallel key and value lists.
    pub fn from_parts(keys: &[String], values: &[IdValue]) -> Self {
        Self(
            keys.iter()
                .cloned()
                .zip(values.iter().cloned().map(PatternValue::Exact))
                .collect(),
        )
    }

    /// Value of a key.
    pub fn get(&self, key: &str) -> Option<&PatternValue> {
        self.0.get(key)
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PatternValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Sorted keys.
    pub fn keys(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    /// Values in key order.
    pub fn values(&self) -> Vec<PatternValue> {
        self.0.values().cloned().collect()
    }

    /// Sorted keys joined with commas; the bucket key of pattern maps.
    pub fn key_string(&self) -> String {
        self.0.keys().map(String::as_str).collect::<Vec<_>>().join(",")
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the id has no keys.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Values in key order, if none of them is a wildcard.
    pub fn concrete_values(&self) -> Option<Vec<IdValue>> {
        self.0.values().map(|v| v.exact().cloned()).collect()
    }

    /// Sorted keys carrying the given wildcard.
    pub fn wildcard_keys(&self, wildcard: Wildcard) -> Vec<String> {
        self.0
            .iter()
            .filter(|(_, v)| v.is(wildcard))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Whether any key carries `ALL` or `ALLSMALLER`.
    pub fn is_multi_valued(&self) -> bool {
        self.0
            .values()
            .any(|v| v.wildcard().is_some_and(Wildcard::is_multi))
    }

    /// Wire form of the dict.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect::<Map<String, Value>>(),
        )
    }

    fn stringify(&self) -> String {
        let body = self
            .0
            .iter()
            .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), v.canonical()))
            .collect::<Vec<_>>()
            .join(",");
        format!("{{{body}}}")
    }
}

/// A component identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ComponentId {
    /// Opaque string id.
    Plain(String),
    /// Dict id, possibly carrying wildcards.
    Dict(DictId),
}

impl ComponentId {
    /// Canonical lookup string.
    ///
    /// Plain ids are returned unchanged. Dict ids render as
    /// `{"k1":v1,"k2":v2}` with keys sorted, concrete values JSON-encoded
    /// and wildcards written as their bare name.
    pub fn stringify(&self) -> String {
        match self {
            ComponentId::Plain(s) => s.clone(),
            ComponentId::Dict(d) => d.stringify(),
        }
    }

    /// Decode an id string: strings starting with `{` hold a dict id in wire
    /// form, anything else is a plain id.
    pub fn parse(input: &str) -> Result<Self, IdError> {
        if !input.starts_with('{') {
            return Ok(ComponentId::Plain(input.to_string()));
        }
        let value: Value = serde_json::from_str(input).map_err(|e| IdError::Malformed {
            input: input.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&value)
    }

    /// Decode an id from its wire JSON form.
    pub fn from_json(value: &Value) -> Result<Self, IdError> {
        match value {
            Value::String(s) => Ok(ComponentId::Plain(s.clone())),
            Value::Object(map) => {
                let mut dict = DictId::new();
                for (key, v) in map {
                    dict.insert(key.clone(), PatternValue::from_json(key, v)?);
                }
                Ok(ComponentId::Dict(dict))
            }
            other => Err(IdError::InvalidType(other.clone())),
        }
    }

    /// Wire JSON form of the id.
    pub fn to_json(&self) -> Value {
        match self {
            ComponentId::Plain(s) => Value::String(s.clone()),
            ComponentId::Dict(d) => d.to_json(),
        }
    }

    /// String form used inside output signatures: plain ids as-is, dict ids
    /// as compact wire JSON.
    pub fn wire_string(&self) -> String {
        match self {
            ComponentId::Plain(s) => s.clone(),
            ComponentId::Dict(d) => d.to_json().to_string(),
        }
    }

    /// Whether this id can bind more than one component.
    pub fn is_multi_valued(&self) -> bool {
        match self {
            ComponentId::Plain(_) => false,
            ComponentId::Dict(d) => d.is_multi_valued(),
        }
    }

    /// The dict, if this is a dict id.
    pub fn as_dict(&self) -> Option<&DictId> {
        match self {
            ComponentId::Dict(d) => Some(d),
            ComponentId::Plain(_) => None,
        }
    }

    /// The string, if this is a plain id.
    pub fn as_plain(&self) -> Option<&str> {
        match self {
            ComponentId::Plain(s) => Some(s),
            ComponentId::Dict(_) => None,
        }
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stringify())
    }
}

impl From<&str> for ComponentId {
    fn from(s: &str) -> Self {
        ComponentId::Plain(s.to_string())
    }
}

impl From<String> for ComponentId {
    fn from(s: String) -> Self {
        ComponentId::Plain(s)
    }
}

impl From<DictId> for ComponentId {
    fn from(d: DictId) -> Self {
        ComponentId::Dict(d)
    }
}

impl Serialize for ComponentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ComponentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        ComponentId::from_json(&value).map_err(serde::de::Error::custom)
    }
}

/// `stringify(id) + "." + property`, the flattened identity of a prop.
pub fn combine_id_and_prop(id: &ComponentId, property: &str) -> String {
    format!("{}.{property}", id.stringify())
}

/// Split `id.prop` on the last `.` and decode the id part.
pub fn split_id_and_prop(input: &str) -> Result<(ComponentId, String), IdError> {
    match input.rfind('.') {
        Some(dot) => Ok((
            ComponentId::parse(&input[..dot])?,
            input[dot + 1..].to_string(),
        )),
        None => Ok((ComponentId::parse(input)?, String::new())),
    }
}

/// Whether an output signature is the combined multi-output token.
pub fn is_multi_output_prop(output: &str) -> bool {
    output.starts_with("..")
}

/// Split a multi-output token `..a.p...b.q..` into its `id.prop` parts.
pub fn parse_multiple_outputs(output: &str) -> Vec<&str> {
    let inner = output.strip_prefix("..").unwrap_or(output);
    let inner = inner.strip_suffix("..").unwrap_or(inner);
    inner.split(MULTI_OUTPUT_SEPARATOR).collect()
}

/// Build the output signature of an ordered list of `(id, prop)` outputs.
pub fn output_signature<'a>(outputs: impl IntoIterator<Item = (&'a ComponentId, &'a str)>) -> String {
    let parts: Vec<String> = outputs
        .into_iter()
        .map(|(id, prop)| format!("{}.{prop}", id.wire_string()))
        .collect();
    match parts.as_slice() {
        [single] => single.clone(),
        _ => format!("..{}..", parts.join(MULTI_OUTPUT_SEPARATOR)),
    }
}
