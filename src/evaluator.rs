//! Expression evaluation against a request and an entity store.
//!
//! Evaluation is a pure recursive walk over an [`Expr`] tree. Every failure
//! is returned as an [`EvalError`] carrying the position of the innermost
//! node that failed; nothing here panics or mutates shared state.
//!
//! `&&`, `||`, `if`-`then`-`else` and `is ... in` evaluate their operands
//! lazily: an operand that is never reached cannot produce an error.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;

use strum_macros::{Display as StrumDisplay, EnumString};

use crate::ast::{BinaryOp, Expr, ExprKind, Var};
use crate::error::{EvalError, EvalErrorKind};
use crate::traits::EntityStore;
use crate::types::{Decimal, EntityType, EntityUid, IpAddr, Pattern, Record, Request, Set, Value};

/// Extension functions callable through [`ExprKind::ExtensionCall`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay, EnumString)]
#[strum(serialize_all = "camelCase")]
pub enum ExtensionFn {
    Decimal,
    Ip,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    IsIpv4,
    IsIpv6,
    IsLoopback,
    IsMulticast,
    IsInRange,
}

/// Evaluates expressions for one request.
pub struct Evaluator<'e> {
    request: &'e Request,
    entities: &'e dyn EntityStore,
}

impl<'e> Evaluator<'e> {
    pub fn new(request: &'e Request, entities: &'e dyn EntityStore) -> Self {
        Evaluator { request, entities }
    }

    /// Evaluate `expr` to a value.
    pub fn interpret(&self, expr: &Expr) -> Result<Value, EvalError> {
        self.eval(expr).map_err(|err| err.at(expr.loc))
    }

    /// Evaluate `expr` and require a boolean result.
    pub fn interpret_bool(&self, expr: &Expr) -> Result<bool, EvalError> {
        self.interpret(expr)
            .and_then(expect_bool)
            .map_err(|err| err.at(expr.loc))
    }

    fn eval(&self, expr: &Expr) -> Result<Value, EvalError> {
        match &expr.kind {
            ExprKind::Lit(value) => Ok(value.clone()),
            ExprKind::Var(var) => Ok(self.var(*var)),
            ExprKind::And { left, right } => {
                if !self.interpret_bool(left)? {
                    return Ok(Value::Bool(false));
                }
                self.interpret_bool(right).map(Value::Bool)
            }
            ExprKind::Or { left, right } => {
                if self.interpret_bool(left)? {
                    return Ok(Value::Bool(true));
                }
                self.interpret_bool(right).map(Value::Bool)
            }
            ExprKind::Not(inner) => self.interpret_bool(inner).map(|b| Value::Bool(!b)),
            ExprKind::Neg(inner) => {
                let n = expect_long(self.interpret(inner)?)?;
                n.checked_neg().map(Value::Long).ok_or_else(|| {
                    EvalError::new(
                        EvalErrorKind::Overflow,
                        format!("integer overflow while attempting to negate the value {n}"),
                    )
                })
            }
            ExprKind::BinaryApp { op, left, right } => {
                let lhs = self.interpret(left)?;
                let rhs = self.interpret(right)?;
                self.binary(*op, lhs, rhs)
            }
            ExprKind::If {
                cond,
                then_expr,
                else_expr,
            } => {
                if self.interpret_bool(cond)? {
                    self.interpret(then_expr)
                } else {
                    self.interpret(else_expr)
                }
            }
            ExprKind::GetAttr { expr, attr } => self.get_attr(self.interpret(expr)?, attr),
            ExprKind::HasAttr { expr, attr } => self.has_attr(self.interpret(expr)?, attr),
            ExprKind::Like { expr, pattern } => {
                let text = expect_string(self.interpret(expr)?)?;
                let pattern = Pattern::from_str(pattern)
                    .map_err(|err| EvalError::new(EvalErrorKind::MalformedPattern, err.to_string()))?;
                Ok(Value::Bool(pattern.wildcard_match(&text)))
            }
            ExprKind::Is { expr, entity_type } => {
                let uid = expect_entity(self.interpret(expr)?)?;
                Ok(Value::Bool(is_type(&uid, entity_type)))
            }
            ExprKind::IsIn {
                expr,
                entity_type,
                in_expr,
            } => {
                let uid = expect_entity(self.interpret(expr)?)?;
                if !is_type(&uid, entity_type) {
                    return Ok(Value::Bool(false));
                }
                let target = self.interpret(in_expr)?;
                self.is_in(Value::EntityUid(uid), target)
            }
            ExprKind::Set(elements) => {
                let values = elements
                    .iter()
                    .map(|e| self.interpret(e))
                    .collect::<Result<Set, _>>()?;
                Ok(Value::Set(values))
            }
            ExprKind::Record(pairs) => {
                let mut record = BTreeMap::new();
                for (key, value) in pairs {
                    record.insert(key.clone(), self.interpret(value)?);
                }
                Ok(Value::Record(Record::from(record)))
            }
            ExprKind::ExtensionCall { name, args } => {
                let func = ExtensionFn::from_str(name).map_err(|_| {
                    EvalError::new(
                        EvalErrorKind::UnknownExtension,
                        format!("no extension function named `{name}`"),
                    )
                })?;
                let args = args
                    .iter()
                    .map(|arg| self.interpret(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                call_extension(func, args)
            }
        }
    }

    fn var(&self, var: Var) -> Value {
        match var {
            Var::Principal => Value::EntityUid(self.request.principal.clone()),
            Var::Action => Value::EntityUid(self.request.action.clone()),
            Var::Resource => Value::EntityUid(self.request.resource.clone()),
            Var::Context => Value::Record(self.request.context.as_record().clone()),
        }
    }

    fn binary(&self, op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
        match op {
            BinaryOp::Eq => Ok(Value::Bool(lhs == rhs)),
            BinaryOp::NotEq => Ok(Value::Bool(lhs != rhs)),
            BinaryOp::Less | BinaryOp::LessEq | BinaryOp::Greater | BinaryOp::GreaterEq => {
                let ordering = expect_long(lhs)?.cmp(&expect_long(rhs)?);
                Ok(Value::Bool(holds(op, ordering)))
            }
            BinaryOp::Add => arith("add", lhs, rhs, i64::checked_add),
            BinaryOp::Sub => arith("subtract", lhs, rhs, i64::checked_sub),
            BinaryOp::Mul => arith("multiply", lhs, rhs, i64::checked_mul),
            BinaryOp::In => self.is_in(lhs, rhs),
            BinaryOp::Contains => Ok(Value::Bool(expect_set(lhs)?.contains(&rhs))),
            BinaryOp::ContainsAll => {
                let (set, other) = (expect_set(lhs)?, expect_set(rhs)?);
                Ok(Value::Bool(set.contains_all(&other)))
            }
            BinaryOp::ContainsAny => {
                let (set, other) = (expect_set(lhs)?, expect_set(rhs)?);
                Ok(Value::Bool(set.contains_any(&other)))
            }
        }
    }

    /// `lhs in rhs`, where `rhs` is an entity or a set of entities.
    fn is_in(&self, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
        let uid = expect_entity(lhs)?;
        match rhs {
            Value::EntityUid(target) => Ok(Value::Bool(self.entities.is_in(&uid, &target))),
            Value::Set(targets) => {
                let targets = targets
                    .iter()
                    .map(|v| match v {
                        Value::EntityUid(target) => Ok(target),
                        other => Err(EvalError::type_mismatch("set of entities", other.kind())),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Bool(
                    targets.into_iter().any(|t| self.entities.is_in(&uid, t)),
                ))
            }
            other => Err(EvalError::type_mismatch(
                "entity or set of entities",
                other.kind(),
            )),
        }
    }

    fn get_attr(&self, receiver: Value, attr: &str) -> Result<Value, EvalError> {
        match receiver {
            Value::Record(record) => record
                .get(attr)
                .cloned()
                .ok_or_else(|| EvalError::missing_attribute("record", attr)),
            Value::EntityUid(uid) => {
                if !self.entities.exists(&uid) {
                    return Err(EvalError::missing_entity(&uid));
                }
                self.entities
                    .attribute(&uid, attr)
                    .cloned()
                    .ok_or_else(|| EvalError::missing_attribute(&uid, attr))
            }
            other => Err(EvalError::type_mismatch("record or entity", other.kind())),
        }
    }

    fn has_attr(&self, receiver: Value, attr: &str) -> Result<Value, EvalError> {
        match receiver {
            Value::Record(record) => Ok(Value::Bool(record.contains_key(attr))),
            Value::EntityUid(uid) => Ok(Value::Bool(self.entities.has_attribute(&uid, attr))),
            other => Err(EvalError::type_mismatch("record or entity", other.kind())),
        }
    }
}

fn is_type(uid: &EntityUid, entity_type: &EntityType) -> bool {
    uid.entity_type() == entity_type
}

fn holds(op: BinaryOp, ordering: Ordering) -> bool {
    match op {
        BinaryOp::Less => ordering.is_lt(),
        BinaryOp::LessEq => ordering.is_le(),
        BinaryOp::Greater => ordering.is_gt(),
        BinaryOp::GreaterEq => ordering.is_ge(),
        _ => false,
    }
}

fn arith(
    name: &str,
    lhs: Value,
    rhs: Value,
    checked: fn(i64, i64) -> Option<i64>,
) -> Result<Value, EvalError> {
    let (a, b) = (expect_long(lhs)?, expect_long(rhs)?);
    checked(a, b)
        .map(Value::Long)
        .ok_or_else(|| EvalError::overflow(name, a, b))
}

fn call_extension(func: ExtensionFn, args: Vec<Value>) -> Result<Value, EvalError> {
    match func {
        ExtensionFn::Decimal => {
            let [text] = arity::<1>(func, args)?;
            let text = expect_string(text)?;
            Decimal::from_str(&text)
                .map(Value::Decimal)
                .map_err(|err| malformed_literal(func, err))
        }
        ExtensionFn::Ip => {
            let [text] = arity::<1>(func, args)?;
            let text = expect_string(text)?;
            IpAddr::from_str(&text)
                .map(Value::IpAddr)
                .map_err(|err| malformed_literal(func, err))
        }
        ExtensionFn::LessThan
        | ExtensionFn::LessThanOrEqual
        | ExtensionFn::GreaterThan
        | ExtensionFn::GreaterThanOrEqual => {
            let [lhs, rhs] = arity::<2>(func, args)?;
            let ordering = expect_decimal(lhs)?.cmp(&expect_decimal(rhs)?);
            Ok(Value::Bool(match func {
                ExtensionFn::LessThan => ordering.is_lt(),
                ExtensionFn::LessThanOrEqual => ordering.is_le(),
                ExtensionFn::GreaterThan => ordering.is_gt(),
                _ => ordering.is_ge(),
            }))
        }
        ExtensionFn::IsIpv4 | ExtensionFn::IsIpv6 | ExtensionFn::IsLoopback | ExtensionFn::IsMulticast => {
            let [ip] = arity::<1>(func, args)?;
            let ip = expect_ip(ip)?;
            Ok(Value::Bool(match func {
                ExtensionFn::IsIpv4 => ip.is_ipv4(),
                ExtensionFn::IsIpv6 => ip.is_ipv6(),
                ExtensionFn::IsLoopback => ip.is_loopback(),
                _ => ip.is_multicast(),
            }))
        }
        ExtensionFn::IsInRange => {
            let [ip, range] = arity::<2>(func, args)?;
            let (ip, range) = (expect_ip(ip)?, expect_ip(range)?);
            Ok(Value::Bool(ip.is_in_range(&range)))
        }
    }
}

fn arity<const N: usize>(func: ExtensionFn, args: Vec<Value>) -> Result<[Value; N], EvalError> {
    let got = args.len();
    <[Value; N]>::try_from(args).map_err(|_| {
        EvalError::new(
            EvalErrorKind::TypeMismatch,
            format!("`{func}` takes {N} argument(s), got {got}"),
        )
    })
}

fn malformed_literal(func: ExtensionFn, err: impl std::fmt::Display) -> EvalError {
    EvalError::new(
        EvalErrorKind::MalformedExtensionLiteral,
        format!("`{func}`: {err}"),
    )
}

fn expect_bool(value: Value) -> Result<bool, EvalError> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(EvalError::type_mismatch("bool", other.kind())),
    }
}

fn expect_long(value: Value) -> Result<i64, EvalError> {
    match value {
        Value::Long(n) => Ok(n),
        other => Err(EvalError::type_mismatch("long", other.kind())),
    }
}

fn expect_string(value: Value) -> Result<String, EvalError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(EvalError::type_mismatch("string", other.kind())),
    }
}

fn expect_entity(value: Value) -> Result<EntityUid, EvalError> {
    match value {
        Value::EntityUid(uid) => Ok(uid),
        other => Err(EvalError::type_mismatch("entity", other.kind())),
    }
}

fn expect_set(value: Value) -> Result<Set, EvalError> {
    match value {
        Value::Set(set) => Ok(set),
        other => Err(EvalError::type_mismatch("set", other.kind())),
    }
}

fn expect_decimal(value: Value) -> Result<Decimal, EvalError> {
    match value {
        Value::Decimal(d) => Ok(d),
        other => Err(EvalError::type_mismatch("decimal", other.kind())),
    }
}

fn expect_ip(value: Value) -> Result<IpAddr, EvalError> {
    match value {
        Value::IpAddr(ip) => Ok(ip),
        other => Err(EvalError::type_mismatch("ipaddr", other.kind())),
    }
}
