use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use thiserror::Error;
use utoipa::ToSchema;

use crate::ast::Loc;

/// Host-level failures: building stores, policy sets and literals from Rust,
/// or touching a poisoned engine lock. Evaluation outcomes are [`EvalError`].
#[derive(Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum PolicyError {
    #[error("duplicate policy id: {0}")]
    DuplicatePolicyId(String),

    #[error("failed to parse entity uid: {0}")]
    ParseError(String),

    #[error("invalid decimal literal: {0}")]
    InvalidDecimal(String),

    #[error("invalid ip address literal: {0}")]
    InvalidIpAddr(String),

    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Poisoned lock error: {0}")]
    PoisonedLockError(String),
}

impl<T> From<std::sync::PoisonError<T>> for PolicyError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        PolicyError::PoisonedLockError(err.to_string())
    }
}

/// The kind of failure an expression can evaluate to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize, ToSchema,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EvalErrorKind {
    /// An operand had the wrong type, or a node had the wrong shape.
    TypeMismatch,
    /// Checked 64-bit arithmetic left the representable range.
    Overflow,
    /// A record or entity has no such attribute.
    MissingAttribute,
    /// An attribute was read from an entity that is not in the store.
    /// Reported instead of `MissingAttribute` for `principal.x` and the
    /// like when the entity itself is unknown; `has` still yields false.
    MissingEntity,
    /// An extension call names a function the evaluator does not provide.
    UnknownExtension,
    /// `decimal("...")` or `ip("...")` was handed text it cannot parse.
    MalformedExtensionLiteral,
    /// The source text of a `like` pattern has a bad escape.
    MalformedPattern,
}

/// A failed evaluation, tagged with the position of the node that failed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error, Serialize, Deserialize, ToSchema)]
#[error("{kind}: {detail}")]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<Loc>,
}

impl EvalError {
    pub fn new(kind: EvalErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            loc: None,
        }
    }

    /// Attach a source position unless one is already set by a deeper node.
    pub fn at(mut self, loc: Option<Loc>) -> Self {
        if self.loc.is_none() {
            self.loc = loc;
        }
        self
    }

    pub fn type_mismatch(expected: &str, actual: impl std::fmt::Display) -> Self {
        Self::new(
            EvalErrorKind::TypeMismatch,
            format!("expected {expected}, got {actual}"),
        )
    }

    pub fn overflow(op: &str, lhs: i64, rhs: i64) -> Self {
        Self::new(
            EvalErrorKind::Overflow,
            format!("integer overflow while attempting to {op} the values {lhs} and {rhs}"),
        )
    }

    pub fn missing_attribute(owner: impl std::fmt::Display, attr: &str) -> Self {
        Self::new(
            EvalErrorKind::MissingAttribute,
            format!("{owner} does not have the attribute `{attr}`"),
        )
    }

    pub fn missing_entity(uid: impl std::fmt::Display) -> Self {
        Self::new(
            EvalErrorKind::MissingEntity,
            format!("entity `{uid}` does not exist"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_eval_error_display() {
        let err = EvalError::type_mismatch("bool", "long");
        assert_eq!(err.to_string(), "type_mismatch: expected bool, got long");
    }

    #[test]
    fn test_eval_error_keeps_innermost_loc() {
        let inner = Loc::new(3, 7);
        let outer = Loc::new(1, 1);
        let err = EvalError::missing_entity(r#"User::"ghost""#)
            .at(Some(inner))
            .at(Some(outer));
        assert_eq!(err.loc, Some(inner));
    }

    #[test]
    fn test_eval_error_kind_round_trips_through_str() {
        assert_eq!(
            EvalErrorKind::from_str("malformed_extension_literal").unwrap(),
            EvalErrorKind::MalformedExtensionLiteral
        );
        assert_eq!(EvalErrorKind::Overflow.to_string(), "overflow");
    }

    #[test]
    fn test_poison_error_conversion() {
        let lock = std::sync::Arc::new(std::sync::Mutex::new(0));
        let poisoner = std::sync::Arc::clone(&lock);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        let err: PolicyError = lock.lock().unwrap_err().into();
        assert!(matches!(err, PolicyError::PoisonedLockError(_)));
    }
}
