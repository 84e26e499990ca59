//! Expression trees for policy conditions.
//!
//! Trees are produced by a parser or builder elsewhere and consumed here
//! read-only. The node set is closed: the evaluator matches it
//! exhaustively, so adding a variant forces every consumer to handle it.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use strum_macros::{Display as StrumDisplay, EnumString};
use utoipa::ToSchema;

use crate::types::{EntityType, Value};

/// Source position of a node, when the producer tracked one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct Loc {
    pub line: u32,
    pub column: u32,
}

impl Loc {
    pub fn new(line: u32, column: u32) -> Self {
        Loc { line, column }
    }
}

impl Display for Loc {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The four request variables.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, StrumDisplay, EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Var {
    Principal,
    Action,
    Resource,
    Context,
}

/// Strict binary operators. `&&` and `||` are separate nodes because they
/// do not evaluate both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, StrumDisplay)]
pub enum BinaryOp {
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    NotEq,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = "<=")]
    LessEq,
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = ">=")]
    GreaterEq,
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "*")]
    Mul,
    #[strum(serialize = "in")]
    In,
    #[strum(serialize = "contains")]
    Contains,
    #[strum(serialize = "containsAll")]
    ContainsAll,
    #[strum(serialize = "containsAny")]
    ContainsAny,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExprKind {
    Lit(Value),
    Var(Var),
    And {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Or {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Not(Box<Expr>),
    Neg(Box<Expr>),
    BinaryApp {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    If {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    GetAttr {
        expr: Box<Expr>,
        attr: String,
    },
    HasAttr {
        expr: Box<Expr>,
        attr: String,
    },
    /// `pattern` is source text; see [`crate::types::Pattern`].
    Like {
        expr: Box<Expr>,
        pattern: String,
    },
    Is {
        expr: Box<Expr>,
        entity_type: EntityType,
    },
    IsIn {
        expr: Box<Expr>,
        entity_type: EntityType,
        in_expr: Box<Expr>,
    },
    Set(Vec<Expr>),
    Record(Vec<(String, Expr)>),
    ExtensionCall {
        name: String,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<Loc>,
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Expr { kind, loc: None }
    }

    pub fn with_loc(mut self, loc: Loc) -> Self {
        self.loc = Some(loc);
        self
    }

    pub fn val(value: impl Into<Value>) -> Self {
        Expr::new(ExprKind::Lit(value.into()))
    }

    pub fn var(var: Var) -> Self {
        Expr::new(ExprKind::Var(var))
    }

    pub fn principal() -> Self {
        Expr::var(Var::Principal)
    }

    pub fn action() -> Self {
        Expr::var(Var::Action)
    }

    pub fn resource() -> Self {
        Expr::var(Var::Resource)
    }

    pub fn context() -> Self {
        Expr::var(Var::Context)
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Expr::new(ExprKind::And {
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Expr::new(ExprKind::Or {
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(expr: Expr) -> Self {
        Expr::new(ExprKind::Not(Box::new(expr)))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn neg(expr: Expr) -> Self {
        Expr::new(ExprKind::Neg(Box::new(expr)))
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::new(ExprKind::BinaryApp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn is_eq(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOp::Eq, left, right)
    }

    pub fn not_eq(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOp::NotEq, left, right)
    }

    pub fn less(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOp::Less, left, right)
    }

    pub fn less_eq(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOp::LessEq, left, right)
    }

    pub fn greater(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOp::Greater, left, right)
    }

    pub fn greater_eq(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOp::GreaterEq, left, right)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn add(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOp::Add, left, right)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn sub(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOp::Sub, left, right)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn mul(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOp::Mul, left, right)
    }

    /// Hierarchy membership, `left in right`.
    pub fn is_in(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOp::In, left, right)
    }

    pub fn contains(set: Expr, element: Expr) -> Self {
        Expr::binary(BinaryOp::Contains, set, element)
    }

    pub fn contains_all(set: Expr, other: Expr) -> Self {
        Expr::binary(BinaryOp::ContainsAll, set, other)
    }

    pub fn contains_any(set: Expr, other: Expr) -> Self {
        Expr::binary(BinaryOp::ContainsAny, set, other)
    }

    pub fn ite(cond: Expr, then_expr: Expr, else_expr: Expr) -> Self {
        Expr::new(ExprKind::If {
            cond: Box::new(cond),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        })
    }

    pub fn get_attr(expr: Expr, attr: impl Into<String>) -> Self {
        Expr::new(ExprKind::GetAttr {
            expr: Box::new(expr),
            attr: attr.into(),
        })
    }

    pub fn has_attr(expr: Expr, attr: impl Into<String>) -> Self {
        Expr::new(ExprKind::HasAttr {
            expr: Box::new(expr),
            attr: attr.into(),
        })
    }

    pub fn like(expr: Expr, pattern: impl Into<String>) -> Self {
        Expr::new(ExprKind::Like {
            expr: Box::new(expr),
            pattern: pattern.into(),
        })
    }

    pub fn is_type(expr: Expr, entity_type: impl Into<EntityType>) -> Self {
        Expr::new(ExprKind::Is {
            expr: Box::new(expr),
            entity_type: entity_type.into(),
        })
    }

    pub fn is_type_in(expr: Expr, entity_type: impl Into<EntityType>, in_expr: Expr) -> Self {
        Expr::new(ExprKind::IsIn {
            expr: Box::new(expr),
            entity_type: entity_type.into(),
            in_expr: Box::new(in_expr),
        })
    }

    pub fn set(elements: impl IntoIterator<Item = Expr>) -> Self {
        Expr::new(ExprKind::Set(elements.into_iter().collect()))
    }

    pub fn record<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Expr)>) -> Self {
        Expr::new(ExprKind::Record(
            pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    pub fn call_extension_fn(name: impl Into<String>, args: impl IntoIterator<Item = Expr>) -> Self {
        Expr::new(ExprKind::ExtensionCall {
            name: name.into(),
            args: args.into_iter().collect(),
        })
    }

    /// `decimal("<text>")`
    pub fn decimal(text: impl Into<String>) -> Self {
        Expr::call_extension_fn("decimal", [Expr::val(Value::String(text.into()))])
    }

    /// `ip("<text>")`
    pub fn ip(text: impl Into<String>) -> Self {
        Expr::call_extension_fn("ip", [Expr::val(Value::String(text.into()))])
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Expr::val(value)
    }
}
