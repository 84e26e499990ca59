//! Data model: values, entities, requests, policies and decisions.
//!
//! Canonical string forms:
//! - EntityUid: `User::"alice"` or `NS::User::"alice"`
//! - Decimal: `12.3456` (one to four fractional digits)
//! - IpAddr: `192.0.2.1`, `10.0.0.0/8`, `2001:db8::/32`
//! - Pattern: `*.jpg`, with `\*` for a literal star

mod decimal;
mod decision;
mod entity;
mod entity_uid;
mod ipaddr;
mod pattern;
mod policy;
mod request;
mod value;

pub use decimal::Decimal;
pub use decision::{Decision, Diagnostics, PolicyEvalError, PolicyVersion, Response};
pub use entity::{Entities, EntitiesBuilder, Entity};
pub use entity_uid::{EntityType, EntityUid};
pub use ipaddr::IpAddr;
pub use pattern::{Pattern, PatternElem};
pub use policy::{
    Condition, ConditionKind, Effect, Policy, PolicyId, PolicySet, ScopeConstraint,
};
pub use request::{Context, Request};
pub use value::{Record, Set, Value, ValueKind};
