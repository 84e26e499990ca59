//! Structural scope matching.
//!
//! Scope checks look only at the request's entity uids and the store's
//! hierarchy; they never run the evaluator and never fail.

use serde::{Deserialize, Serialize};
use strum_macros::Display as StrumDisplay;
use utoipa::ToSchema;

use crate::traits::EntityStore;
use crate::types::{EntityUid, Policy, Request, ScopeConstraint};

/// Which scope slot a constraint sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, StrumDisplay)]
#[strum(serialize_all = "lowercase")]
pub enum ScopeSlot {
    Principal,
    Action,
    Resource,
}

/// Why a scope slot admitted an entity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
    StrumDisplay,
)]
pub enum PolicyMatchReason {
    PrincipalAny,
    PrincipalEq,
    PrincipalIn,
    PrincipalInSet,
    PrincipalIs,
    PrincipalIsIn,
    ActionAny,
    ActionEq,
    ActionIn,
    ActionInSet,
    ActionIs,
    ActionIsIn,
    ResourceAny,
    ResourceEq,
    ResourceIn,
    ResourceInSet,
    ResourceIs,
    ResourceIsIn,
}

impl PolicyMatchReason {
    fn of(slot: ScopeSlot, constraint: &ScopeConstraint) -> Self {
        use PolicyMatchReason::*;
        match (slot, constraint) {
            (ScopeSlot::Principal, ScopeConstraint::Any) => PrincipalAny,
            (ScopeSlot::Principal, ScopeConstraint::Eq { .. }) => PrincipalEq,
            (ScopeSlot::Principal, ScopeConstraint::In { .. }) => PrincipalIn,
            (ScopeSlot::Principal, ScopeConstraint::InSet { .. }) => PrincipalInSet,
            (ScopeSlot::Principal, ScopeConstraint::Is { .. }) => PrincipalIs,
            (ScopeSlot::Principal, ScopeConstraint::IsIn { .. }) => PrincipalIsIn,
            (ScopeSlot::Action, ScopeConstraint::Any) => ActionAny,
            (ScopeSlot::Action, ScopeConstraint::Eq { .. }) => ActionEq,
            (ScopeSlot::Action, ScopeConstraint::In { .. }) => ActionIn,
            (ScopeSlot::Action, ScopeConstraint::InSet { .. }) => ActionInSet,
            (ScopeSlot::Action, ScopeConstraint::Is { .. }) => ActionIs,
            (ScopeSlot::Action, ScopeConstraint::IsIn { .. }) => ActionIsIn,
            (ScopeSlot::Resource, ScopeConstraint::Any) => ResourceAny,
            (ScopeSlot::Resource, ScopeConstraint::Eq { .. }) => ResourceEq,
            (ScopeSlot::Resource, ScopeConstraint::In { .. }) => ResourceIn,
            (ScopeSlot::Resource, ScopeConstraint::InSet { .. }) => ResourceInSet,
            (ScopeSlot::Resource, ScopeConstraint::Is { .. }) => ResourceIs,
            (ScopeSlot::Resource, ScopeConstraint::IsIn { .. }) => ResourceIsIn,
        }
    }
}

/// Whether `constraint` admits `uid`.
pub fn constraint_matches(
    constraint: &ScopeConstraint,
    uid: &EntityUid,
    store: &dyn EntityStore,
) -> bool {
    match constraint {
        ScopeConstraint::Any => true,
        ScopeConstraint::Eq { entity } => uid == entity,
        ScopeConstraint::In { entity } => store.is_in(uid, entity),
        ScopeConstraint::InSet { entities } => entities.iter().any(|e| store.is_in(uid, e)),
        ScopeConstraint::Is { entity_type } => uid.entity_type() == entity_type,
        ScopeConstraint::IsIn {
            entity_type,
            entity,
        } => uid.entity_type() == entity_type && store.is_in(uid, entity),
    }
}

pub(crate) fn match_reason(
    slot: ScopeSlot,
    constraint: &ScopeConstraint,
    uid: &EntityUid,
    store: &dyn EntityStore,
) -> Option<PolicyMatchReason> {
    constraint_matches(constraint, uid, store).then(|| PolicyMatchReason::of(slot, constraint))
}

pub(crate) fn principal_match_reason(
    policy: &Policy,
    principal: &EntityUid,
    store: &dyn EntityStore,
) -> Option<PolicyMatchReason> {
    match_reason(ScopeSlot::Principal, &policy.principal, principal, store)
}

/// Whether all three scope slots of `policy` admit `request`.
pub fn scope_matches(policy: &Policy, request: &Request, store: &dyn EntityStore) -> bool {
    constraint_matches(&policy.principal, &request.principal, store)
        && constraint_matches(&policy.action, &request.action, store)
        && constraint_matches(&policy.resource, &request.resource, store)
}

/// The slot that rejected `request`, if any; principal is checked first.
pub(crate) fn first_mismatch(
    policy: &Policy,
    request: &Request,
    store: &dyn EntityStore,
) -> Option<ScopeSlot> {
    [
        (ScopeSlot::Principal, &policy.principal, &request.principal),
        (ScopeSlot::Action, &policy.action, &request.action),
        (ScopeSlot::Resource, &policy.resource, &request.resource),
    ]
    .into_iter()
    .find(|(_, constraint, uid)| !constraint_matches(constraint, uid, store))
    .map(|(slot, _, _)| slot)
}
