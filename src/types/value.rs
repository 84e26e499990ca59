//! Runtime values manipulated by policy expressions.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter, Result as FmtResult};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum_macros::{Display as StrumDisplay, EnumDiscriminants};

use super::{Decimal, EntityUid, IpAddr};

/// The closed set of values. Equality is structural; the derived ordering
/// only keeps containers canonical and is not the language's `<`.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumDiscriminants,
)]
#[strum_discriminants(name(ValueKind), derive(StrumDisplay, Hash))]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Bool(bool),
    Long(i64),
    String(String),
    Set(Set),
    Record(Record),
    EntityUid(EntityUid),
    Decimal(Decimal),
    IpAddr(IpAddr),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        ValueKind::from(self)
    }

    pub fn set(values: impl IntoIterator<Item = Value>) -> Self {
        Value::Set(values.into_iter().collect())
    }

    pub fn record<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Record(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Long(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "\"{}\"", s.escape_debug()),
            Value::Set(set) => write!(f, "{set}"),
            Value::Record(record) => write!(f, "{record}"),
            Value::EntityUid(uid) => write!(f, "{uid}"),
            Value::Decimal(d) => write!(f, "decimal(\"{d}\")"),
            Value::IpAddr(ip) => write!(f, "ip(\"{ip}\")"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Long(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<EntityUid> for Value {
    fn from(value: EntityUid) -> Self {
        Value::EntityUid(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Decimal(value)
    }
}

impl From<IpAddr> for Value {
    fn from(value: IpAddr) -> Self {
        Value::IpAddr(value)
    }
}

impl From<Set> for Value {
    fn from(value: Set) -> Self {
        Value::Set(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Value::Record(value)
    }
}

/// An unordered collection with set-equality semantics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Set(BTreeSet<Value>);

impl Set {
    pub fn contains(&self, value: &Value) -> bool {
        self.0.contains(value)
    }

    /// Every element of `other` is in `self`.
    pub fn contains_all(&self, other: &Set) -> bool {
        other.0.is_subset(&self.0)
    }

    /// At least one element of `other` is in `self`.
    pub fn contains_any(&self, other: &Set) -> bool {
        !self.0.is_disjoint(&other.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.0.iter()
    }
}

impl FromIterator<Value> for Set {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        Set(iter.into_iter().collect())
    }
}

impl Display for Set {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "[{}]", self.0.iter().join(", "))
    }
}

/// String-keyed attributes; keys are unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one attribute and return the updated record.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Record(iter.into_iter().collect())
    }
}

impl From<BTreeMap<String, Value>> for Record {
    fn from(value: BTreeMap<String, Value>) -> Self {
        Record(value)
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "{{{}}}",
            self.0
                .iter()
                .map(|(k, v)| format!("\"{}\": {v}", k.escape_debug()))
                .join(", ")
        )
    }
}
