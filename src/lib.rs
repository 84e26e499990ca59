// src/lib.rs
pub use engine::{PolicyEngine, PolicyMatch, PolicySnapshot, is_authorized};
pub use error::{EvalError, EvalErrorKind, PolicyError};
pub use evaluator::{Evaluator, ExtensionFn};
pub use policy_match::{PolicyMatchReason, ScopeSlot};
pub use traits::EntityStore;
pub use types::{
    Context, Decision, Diagnostics, Entities, EntitiesBuilder, Entity, EntityType, EntityUid,
    Policy, PolicyEvalError, PolicyId, PolicySet, PolicyVersion, Request, Response, Value,
};

pub mod ast;
mod engine;
pub mod error;
pub mod evaluator;
#[cfg(feature = "observability")]
pub mod metrics;
pub mod policy_match;
pub mod traits;
pub mod types;

#[cfg(test)]
mod tests;
