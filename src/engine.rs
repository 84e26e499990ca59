use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};
#[cfg(feature = "observability")]
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

#[cfg(feature = "observability")]
use crate::metrics::{self, EvaluationPhases, EvaluationStats, PhaseTimer};
use crate::error::{EvalError, PolicyError};
use crate::evaluator::Evaluator;
use crate::policy_match::{PolicyMatchReason, first_mismatch, principal_match_reason};
use crate::traits::EntityStore;
use crate::types::{
    ConditionKind, Decision, Diagnostics, Effect, EntityUid, Policy, PolicyEvalError, PolicyId,
    PolicySet, PolicyVersion, Request, Response,
};

/// Decide `request` against `policies`.
///
/// Policies whose scope does not admit the request are skipped. A policy
/// is satisfied when its conditions, taken in declaration order, all pass.
/// Any satisfied forbid denies; otherwise any satisfied permit allows;
/// otherwise the request is denied by default. Condition errors never
/// abort the call, they are reported in the diagnostics.
pub fn is_authorized(
    request: &Request,
    policies: &PolicySet,
    entities: &dyn EntityStore,
) -> Response {
    authorize(request, policies, entities, &mut PhaseDurations::default())
}

#[derive(Default)]
struct PhaseDurations {
    #[cfg(feature = "observability")]
    scope: Duration,
    #[cfg(feature = "observability")]
    conditions: Duration,
}

#[cfg_attr(not(feature = "observability"), allow(unused_variables))]
fn authorize(
    request: &Request,
    policies: &PolicySet,
    entities: &dyn EntityStore,
    durations: &mut PhaseDurations,
) -> Response {
    debug!(
        event = "Request",
        phase = "Evaluation",
        principal = %request.principal,
        action = %request.action,
        resource = %request.resource,
        policies = policies.len()
    );

    let evaluator = Evaluator::new(request, entities);
    let mut permits: BTreeSet<PolicyId> = BTreeSet::new();
    let mut forbids: BTreeSet<PolicyId> = BTreeSet::new();
    let mut errors: Vec<PolicyEvalError> = Vec::new();

    for policy in policies.policies() {
        let mismatch = {
            #[cfg(feature = "observability")]
            let _timer = PhaseTimer::new(&mut durations.scope);
            first_mismatch(policy, request, entities)
        };
        if let Some(slot) = mismatch {
            debug!(
                event = "Request",
                phase = "Scope",
                policy = %policy.id,
                slot = %slot,
                "policy skipped"
            );
            continue;
        }

        let outcome = {
            #[cfg(feature = "observability")]
            let _timer = PhaseTimer::new(&mut durations.conditions);
            conditions_hold(policy, &evaluator)
        };
        match outcome {
            Ok(true) => {
                debug!(
                    event = "Request",
                    phase = "Conditions",
                    policy = %policy.id,
                    effect = %policy.effect,
                    "policy satisfied"
                );
                match policy.effect {
                    Effect::Permit => permits.insert(policy.id.clone()),
                    Effect::Forbid => forbids.insert(policy.id.clone()),
                };
            }
            Ok(false) => {}
            Err(error) => {
                warn!(
                    event = "Request",
                    phase = "Conditions",
                    policy = %policy.id,
                    kind = %error.kind,
                    detail = %error.detail,
                    "policy condition failed to evaluate"
                );
                errors.push(PolicyEvalError {
                    policy_id: policy.id.clone(),
                    error,
                });
            }
        }
    }

    let (decision, reasons) = if !forbids.is_empty() {
        (Decision::Deny, forbids)
    } else if !permits.is_empty() {
        (Decision::Allow, permits)
    } else {
        (Decision::Deny, BTreeSet::new())
    };

    for reason in &reasons {
        info!(
            event = "Request",
            phase = "Policy",
            decision = %decision,
            reason = %reason
        );
    }
    debug!(
        event = "Request",
        phase = "Result",
        decision = %decision,
        reasons = reasons.len(),
        errors = errors.len()
    );

    Response::new(decision, Diagnostics { reasons, errors })
}

/// Conditions as one short-circuiting conjunction in declaration order.
fn conditions_hold(policy: &Policy, evaluator: &Evaluator<'_>) -> Result<bool, EvalError> {
    for condition in &policy.conditions {
        let value = evaluator.interpret_bool(&condition.body)?;
        let passes = match condition.kind {
            ConditionKind::When => value,
            ConditionKind::Unless => !value,
        };
        if !passes {
            return Ok(false);
        }
    }
    Ok(true)
}

/// An immutable policy set together with the version it was loaded as.
#[derive(Debug)]
pub struct PolicySnapshot {
    policies: PolicySet,
    version: PolicyVersion,
}

impl PolicySnapshot {
    pub fn new(policies: PolicySet) -> Self {
        let version = PolicyVersion {
            hash: policies.content_hash(),
            loaded_at: chrono::Utc::now().to_rfc3339(),
        };
        PolicySnapshot { policies, version }
    }

    pub fn policies(&self) -> &PolicySet {
        &self.policies
    }

    pub fn version(&self) -> &PolicyVersion {
        &self.version
    }
}

/// A policy whose principal scope admits a given principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyMatch {
    pub policy: Policy,
    pub reason: PolicyMatchReason,
}

/// The main engine handle. Cloneable and thread-safe.
///
/// Evaluations run against the snapshot current when they start; a
/// concurrent [`PolicyEngine::reload`] swaps in a new snapshot without
/// disturbing them.
#[derive(Clone)]
pub struct PolicyEngine {
    inner: Arc<RwLock<Arc<PolicySnapshot>>>,
}

impl PolicyEngine {
    pub fn new(policies: PolicySet) -> Self {
        let snapshot = PolicySnapshot::new(policies);
        info!(
            event = "Engine",
            phase = "Load",
            policies = snapshot.policies.len(),
            version = %snapshot.version
        );
        PolicyEngine {
            inner: Arc::new(RwLock::new(Arc::new(snapshot))),
        }
    }

    /// Replace the current policy set.
    pub fn reload(&self, policies: PolicySet) -> Result<(), PolicyError> {
        let snapshot = Arc::new(PolicySnapshot::new(policies));
        info!(
            event = "Engine",
            phase = "Reload",
            policies = snapshot.policies.len(),
            version = %snapshot.version
        );

        #[cfg(feature = "observability")]
        let (count, hash) = (snapshot.policies.len(), snapshot.version.hash.clone());

        *self.inner.write()? = snapshot;

        #[cfg(feature = "observability")]
        metrics::record_reload(count, hash);

        Ok(())
    }

    pub fn current_snapshot(&self) -> Result<Arc<PolicySnapshot>, PolicyError> {
        Ok(Arc::clone(&*self.inner.read()?))
    }

    pub fn current_version(&self) -> Result<PolicyVersion, PolicyError> {
        Ok(self.current_snapshot()?.version.clone())
    }

    /// Decide `request` against the current snapshot. Fails only if the
    /// snapshot lock is poisoned.
    pub fn evaluate(
        &self,
        request: &Request,
        entities: &dyn EntityStore,
    ) -> Result<Response, PolicyError> {
        #[cfg(feature = "observability")]
        let started = Instant::now();

        let snapshot = self.current_snapshot()?;
        let mut durations = PhaseDurations::default();
        let response = authorize(request, &snapshot.policies, entities, &mut durations);

        #[cfg(feature = "observability")]
        {
            let total = started.elapsed();
            let stats = EvaluationStats {
                duration: total,
                allowed: response.is_allowed(),
                principal_id: request.principal.to_string(),
                action_id: request.action.to_string(),
                reasons: response
                    .diagnostics
                    .reasons
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
                errors: response.diagnostics.errors.len(),
            };
            let phases = EvaluationPhases {
                scope_ms: metrics::as_ms(durations.scope),
                conditions_ms: metrics::as_ms(durations.conditions),
                total_ms: metrics::as_ms(total),
            };
            metrics::record_evaluation(stats, Some(phases));
        }

        Ok(response)
    }

    /// Policies whose principal scope admits `principal`, in policy-set
    /// order. Action, resource and conditions are not considered.
    pub fn policies_for_principal(
        &self,
        principal: &EntityUid,
        entities: &dyn EntityStore,
    ) -> Result<Vec<PolicyMatch>, PolicyError> {
        let snapshot = self.current_snapshot()?;
        let matches: Vec<PolicyMatch> = snapshot
            .policies
            .policies()
            .filter_map(|policy| {
                principal_match_reason(policy, principal, entities).map(|reason| PolicyMatch {
                    policy: policy.clone(),
                    reason,
                })
            })
            .collect();

        debug!(
            event = "Listing",
            phase = "Principal",
            principal = %principal,
            matches = matches.len()
        );
        Ok(matches)
    }

    pub fn policies(&self) -> Result<Vec<Policy>, PolicyError> {
        Ok(self.current_snapshot()?.policies.policies().cloned().collect())
    }
}

#[cfg(test)]
mod tests;
