//! Authorization request and request context.

use serde::{Deserialize, Serialize};

use super::{EntityUid, Record, Value};

/// Context attributes supplied with a request, exposed to policies as
/// the `context` record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Context(Record);

impl Context {
    /// Create an empty request context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one context attribute and return the updated context.
    pub fn with_attr(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        Context(self.0.with_attr(key, value))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_record(&self) -> &Record {
        &self.0
    }
}

impl From<Record> for Context {
    fn from(value: Record) -> Self {
        Context(value)
    }
}

impl From<Context> for Record {
    fn from(value: Context) -> Self {
        value.0
    }
}

/// One authorization question: may `principal` perform `action` on `resource`?
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Request {
    pub principal: EntityUid,
    pub action: EntityUid,
    pub resource: EntityUid,
    #[serde(default)]
    pub context: Context,
}

impl Request {
    pub fn new(
        principal: EntityUid,
        action: EntityUid,
        resource: EntityUid,
        context: Context,
    ) -> Self {
        Request {
            principal,
            action,
            resource,
            context,
        }
    }
}
