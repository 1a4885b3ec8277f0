// result.rs — Decisions, per-resource results and the response context.
//
// A `DecisionResult` is what a rule, policy or combining algorithm hands
// back up the tree. The PDP collects one per evaluated resource into a
// `ResponseCtx`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::obligation::Obligation;
use crate::status::Status;

/// The four outcomes of an authorization decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Permit,
    Deny,
    Indeterminate,
    NotApplicable,
}

impl Decision {
    /// XACML lexical form, as used in response documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Permit => "Permit",
            Decision::Deny => "Deny",
            Decision::Indeterminate => "Indeterminate",
            Decision::NotApplicable => "NotApplicable",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The effect of a rule, and the decision an obligation is fulfilled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    Permit,
    Deny,
}

impl Effect {
    pub fn decision(&self) -> Decision {
        match self {
            Effect::Permit => Decision::Permit,
            Effect::Deny => Decision::Deny,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Effect::Permit => "Permit",
            Effect::Deny => "Deny",
        }
    }

    /// Parse the XACML lexical form (`Permit` / `Deny`).
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "Permit" => Some(Effect::Permit),
            "Deny" => Some(Effect::Deny),
            _ => None,
        }
    }
}

/// One decision, with the status explaining it, the resource it applies
/// to, and the obligations the caller must discharge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionResult {
    pub decision: Decision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub obligations: Vec<Obligation>,
}

impl DecisionResult {
    pub fn new(decision: Decision) -> Self {
        Self {
            decision,
            status: None,
            resource: None,
            obligations: Vec::new(),
        }
    }

    pub fn permit() -> Self {
        Self::new(Decision::Permit)
    }

    pub fn deny() -> Self {
        Self::new(Decision::Deny)
    }

    pub fn not_applicable() -> Self {
        Self::new(Decision::NotApplicable)
    }

    /// An INDETERMINATE result always explains itself with a status.
    pub fn indeterminate(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Self::new(Decision::Indeterminate)
        }
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Attach an obligation; obligations form a set, so duplicates are dropped.
    pub fn add_obligation(&mut self, obligation: Obligation) {
        if !self.obligations.contains(&obligation) {
            self.obligations.push(obligation);
        }
    }

    pub fn is_indeterminate(&self) -> bool {
        self.decision == Decision::Indeterminate
    }
}

/// The response to one request: one result, or one per resource when the
/// request's scope expanded to several resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseCtx {
    pub results: Vec<DecisionResult>,
}

impl ResponseCtx {
    pub fn new(results: Vec<DecisionResult>) -> Self {
        Self { results }
    }

    pub fn single(result: DecisionResult) -> Self {
        Self {
            results: vec![result],
        }
    }
}
