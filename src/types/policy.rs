//! Policies, their scope constraints and ordered policy sets.

use std::collections::{BTreeMap, HashMap};
use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use strum_macros::{Display as StrumDisplay, EnumString};
use utoipa::ToSchema;

use super::{EntityType, EntityUid};
use crate::ast::Expr;
use crate::error::PolicyError;

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct PolicyId(String);

impl PolicyId {
    pub fn new(id: impl Into<String>) -> Self {
        PolicyId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PolicyId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PolicyId {
    fn from(value: &str) -> Self {
        PolicyId::new(value)
    }
}

impl From<String> for PolicyId {
    fn from(value: String) -> Self {
        PolicyId(value)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, StrumDisplay, EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Permit,
    Forbid,
}

/// Constraint on one of the principal / action / resource scope slots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScopeConstraint {
    /// Unconstrained, `principal`.
    #[default]
    Any,
    /// `principal == User::"alice"`
    Eq { entity: EntityUid },
    /// `principal in Group::"admins"`
    In { entity: EntityUid },
    /// `action in [Action::"view", Action::"edit"]`
    InSet { entities: Vec<EntityUid> },
    /// `resource is Photo`
    Is { entity_type: EntityType },
    /// `resource is Photo in Album::"vacation"`
    IsIn {
        entity_type: EntityType,
        entity: EntityUid,
    },
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, StrumDisplay, EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConditionKind {
    When,
    Unless,
}

/// A `when { ... }` or `unless { ... }` clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub kind: ConditionKind,
    pub body: Expr,
}

/// A single permit or forbid policy.
///
/// Conditions keep their declaration order; when and unless clauses may
/// be interleaved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub id: PolicyId,
    pub effect: Effect,
    #[serde(default)]
    pub principal: ScopeConstraint,
    #[serde(default)]
    pub action: ScopeConstraint,
    #[serde(default)]
    pub resource: ScopeConstraint,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl Policy {
    /// An unconstrained policy with no conditions.
    pub fn new(id: impl Into<PolicyId>, effect: Effect) -> Self {
        Policy {
            id: id.into(),
            effect,
            principal: ScopeConstraint::Any,
            action: ScopeConstraint::Any,
            resource: ScopeConstraint::Any,
            conditions: Vec::new(),
            annotations: BTreeMap::new(),
        }
    }

    pub fn permit(id: impl Into<PolicyId>) -> Self {
        Policy::new(id, Effect::Permit)
    }

    pub fn forbid(id: impl Into<PolicyId>) -> Self {
        Policy::new(id, Effect::Forbid)
    }

    pub fn with_principal(mut self, constraint: ScopeConstraint) -> Self {
        self.principal = constraint;
        self
    }

    pub fn with_action(mut self, constraint: ScopeConstraint) -> Self {
        self.action = constraint;
        self
    }

    pub fn with_resource(mut self, constraint: ScopeConstraint) -> Self {
        self.resource = constraint;
        self
    }

    pub fn when(mut self, body: Expr) -> Self {
        self.conditions.push(Condition {
            kind: ConditionKind::When,
            body,
        });
        self
    }

    pub fn unless(mut self, body: Expr) -> Self {
        self.conditions.push(Condition {
            kind: ConditionKind::Unless,
            body,
        });
        self
    }

    pub fn annotate(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }

    /// The `when` bodies, in declaration order.
    pub fn when_conditions(&self) -> impl Iterator<Item = &Expr> {
        self.conditions_of(ConditionKind::When)
    }

    /// The `unless` bodies, in declaration order.
    pub fn unless_conditions(&self) -> impl Iterator<Item = &Expr> {
        self.conditions_of(ConditionKind::Unless)
    }

    fn conditions_of(&self, kind: ConditionKind) -> impl Iterator<Item = &Expr> {
        self.conditions
            .iter()
            .filter(move |c| c.kind == kind)
            .map(|c| &c.body)
    }
}

/// An ordered collection of policies with unique ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PolicySet {
    policies: Vec<Policy>,
    #[serde(skip)]
    index: HashMap<PolicyId, usize>,
}

impl PolicySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_policies(policies: impl IntoIterator<Item = Policy>) -> Result<Self, PolicyError> {
        let mut set = PolicySet::new();
        for policy in policies {
            set.add(policy)?;
        }
        Ok(set)
    }

    /// Append a policy; evaluation order follows insertion order.
    pub fn add(&mut self, policy: Policy) -> Result<(), PolicyError> {
        if self.index.contains_key(&policy.id) {
            return Err(PolicyError::DuplicatePolicyId(policy.id.to_string()));
        }
        self.index.insert(policy.id.clone(), self.policies.len());
        self.policies.push(policy);
        Ok(())
    }

    pub fn policy(&self, id: &PolicyId) -> Option<&Policy> {
        self.index.get(id).and_then(|&i| self.policies.get(i))
    }

    pub fn policies(&self) -> impl Iterator<Item = &Policy> {
        self.policies.iter()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Hex SHA-256 of the set's canonical JSON form.
    pub fn content_hash(&self) -> String {
        let canonical = serde_json::to_vec(&self.policies).unwrap_or_default();
        format!("{:x}", Sha256::digest(&canonical))
    }
}
