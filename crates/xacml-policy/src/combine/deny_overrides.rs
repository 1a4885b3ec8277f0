// combine/deny_overrides.rs — deny-overrides and ordered-deny-overrides.
//
// Any Deny wins immediately. For rules, an INDETERMINATE rule whose effect
// is Deny might have denied, so it outranks a Permit. For policies, an
// INDETERMINATE child (in its target or its evaluation) is treated as a
// Deny. The ordered variants evaluate in list order, which every variant
// here does anyway.

use crate::ctx::EvaluationCtx;
use crate::result::{Decision, DecisionResult, Effect};
use crate::status::Status;
use crate::target::MatchResult;

use super::{CombinerElement, CombinerParameter, CombiningAlgorithm, CombiningKind};

#[derive(Debug)]
pub struct DenyOverridesRuleAlg {
    id: String,
}

impl DenyOverridesRuleAlg {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl CombiningAlgorithm for DenyOverridesRuleAlg {
    fn identifier(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> CombiningKind {
        CombiningKind::Rule
    }

    fn combine(
        &self,
        ctx: &dyn EvaluationCtx,
        _parameters: &[CombinerParameter],
        children: &[CombinerElement],
    ) -> DecisionResult {
        let mut at_least_one_permit = false;
        let mut potential_deny = false;
        let mut first_error: Option<Status> = None;

        for child in children {
            let result = child.element.evaluate(ctx);
            match result.decision {
                Decision::Deny => return result,
                Decision::Permit => at_least_one_permit = true,
                Decision::Indeterminate => {
                    if child.element.rule_effect() == Some(Effect::Deny) {
                        potential_deny = true;
                    }
                    if first_error.is_none() {
                        first_error = result.status;
                    }
                }
                Decision::NotApplicable => {}
            }
        }

        if potential_deny {
            return indeterminate(first_error);
        }
        if at_least_one_permit {
            return DecisionResult::permit();
        }
        if first_error.is_some() {
            return indeterminate(first_error);
        }
        DecisionResult::not_applicable()
    }
}

#[derive(Debug)]
pub struct DenyOverridesPolicyAlg {
    id: String,
}

impl DenyOverridesPolicyAlg {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl CombiningAlgorithm for DenyOverridesPolicyAlg {
    fn identifier(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> CombiningKind {
        CombiningKind::Policy
    }

    fn combine(
        &self,
        ctx: &dyn EvaluationCtx,
        _parameters: &[CombinerParameter],
        children: &[CombinerElement],
    ) -> DecisionResult {
        let mut permit: Option<DecisionResult> = None;

        for child in children {
            match child.element.matches(ctx) {
                MatchResult::NoMatch => continue,
                MatchResult::Indeterminate(_) => return DecisionResult::deny(),
                MatchResult::Match => {}
            }
            let result = child.element.evaluate(ctx);
            match result.decision {
                Decision::Deny => return result,
                Decision::Indeterminate => return DecisionResult::deny(),
                Decision::Permit => {
                    let combined = permit.get_or_insert_with(DecisionResult::permit);
                    for obligation in result.obligations {
                        combined.add_obligation(obligation);
                    }
                }
                Decision::NotApplicable => {}
            }
        }

        permit.unwrap_or_else(DecisionResult::not_applicable)
    }
}

/// INDETERMINATE carrying `status`, or a generic processing error.
pub(super) fn indeterminate(status: Option<Status>) -> DecisionResult {
    DecisionResult::indeterminate(
        status.unwrap_or_else(|| Status::processing_error("child evaluation failed")),
    )
}
