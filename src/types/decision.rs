//! Authorization decisions and their diagnostics.

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter, Result as FmtResult};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum_macros::Display as StrumDisplay;
use utoipa::ToSchema;

use super::PolicyId;
use crate::error::EvalError;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, StrumDisplay,
)]
pub enum Decision {
    Allow,
    Deny,
}

/// An evaluation error raised by one policy's conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct PolicyEvalError {
    pub policy_id: PolicyId,
    pub error: EvalError,
}

impl Display for PolicyEvalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}: {}", self.policy_id, self.error)
    }
}

/// Why a decision came out the way it did.
///
/// `reasons` holds the policies that determined the decision: the
/// satisfied forbids on a deny, the satisfied permits on an allow, and
/// nothing on a default deny. `errors` lists every policy whose
/// conditions failed to evaluate, whatever the decision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Diagnostics {
    pub reasons: BTreeSet<PolicyId>,
    pub errors: Vec<PolicyEvalError>,
}

impl Diagnostics {
    pub fn reasons(&self) -> impl Iterator<Item = &PolicyId> {
        self.reasons.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &PolicyEvalError> {
        self.errors.iter()
    }
}

/// The result of one authorization call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Response {
    pub decision: Decision,
    pub diagnostics: Diagnostics,
}

impl Response {
    pub fn new(decision: Decision, diagnostics: Diagnostics) -> Self {
        Response {
            decision,
            diagnostics,
        }
    }

    pub fn decision(&self) -> Decision {
        self.decision
    }

    pub fn is_allowed(&self) -> bool {
        self.decision == Decision::Allow
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

impl Display for Response {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "{}(reasons=[{}]; errors={})",
            self.decision,
            self.diagnostics.reasons.iter().join(", "),
            self.diagnostics.errors.len()
        )
    }
}

/// Version metadata for the policy set used during an evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
pub struct PolicyVersion {
    /// SHA-256 of the policy set's canonical JSON.
    pub hash: String,
    /// When this policy set was loaded into the engine (RFC 3339).
    pub loaded_at: String,
}

impl Display for PolicyVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} @ {}", self.hash, self.loaded_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalErrorKind;

    fn diagnostics() -> Diagnostics {
        Diagnostics {
            reasons: [PolicyId::new("forbid-b"), PolicyId::new("forbid-a")]
                .into_iter()
                .collect(),
            errors: vec![PolicyEvalError {
                policy_id: PolicyId::new("permit-a"),
                error: EvalError::new(EvalErrorKind::Overflow, "boom"),
            }],
        }
    }

    #[test]
    fn test_response_display() {
        let response = Response::new(Decision::Deny, diagnostics());
        assert_eq!(
            response.to_string(),
            "Deny(reasons=[forbid-a, forbid-b]; errors=1)"
        );
        assert!(!response.is_allowed());
    }

    #[test]
    fn test_policy_eval_error_display() {
        let err = &diagnostics().errors[0];
        assert_eq!(err.to_string(), "permit-a: overflow: boom");
    }

    #[test]
    fn test_policy_version_display() {
        let version = PolicyVersion {
            hash: "abc123".to_string(),
            loaded_at: "2023-01-01T00:00:00Z".to_string(),
        };
        assert_eq!(version.to_string(), "abc123 @ 2023-01-01T00:00:00Z");
    }

    #[test]
    fn test_response_serialization() {
        let response = Response::new(Decision::Deny, diagnostics());
        insta::assert_json_snapshot!(response, @r#"
        {
          "decision": "Deny",
          "diagnostics": {
            "reasons": [
              "forbid-a",
              "forbid-b"
            ],
            "errors": [
              {
                "policy_id": "permit-a",
                "error": {
                  "kind": "overflow",
                  "detail": "boom"
                }
              }
            ]
          }
        }
        "#);

        let json = serde_json::to_value(&response).unwrap();
        let back: Response = serde_json::from_value(json).unwrap();
        assert_eq!(back, response);
    }
}
