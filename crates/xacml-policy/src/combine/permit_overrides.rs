// combine/permit_overrides.rs — permit-overrides and ordered-permit-overrides.
//
// The mirror image of deny-overrides, except for policies: an
// INDETERMINATE child is remembered rather than turned into a decision,
// and only surfaces when no child permits or denies.

use crate::ctx::EvaluationCtx;
use crate::result::{Decision, DecisionResult, Effect};
use crate::status::Status;
use crate::target::MatchResult;

use super::deny_overrides::indeterminate;
use super::{CombinerElement, CombinerParameter, CombiningAlgorithm, CombiningKind};

#[derive(Debug)]
pub struct PermitOverridesRuleAlg {
    id: String,
}

impl PermitOverridesRuleAlg {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl CombiningAlgorithm for PermitOverridesRuleAlg {
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
        let mut at_least_one_deny = false;
        let mut potential_permit = false;
        let mut first_error: Option<Status> = None;

        for child in children {
            let result = child.element.evaluate(ctx);
            match result.decision {
                Decision::Permit => return result,
                Decision::Deny => at_least_one_deny = true,
                Decision::Indeterminate => {
                    if child.element.rule_effect() == Some(Effect::Permit) {
                        potential_permit = true;
                    }
                    if first_error.is_none() {
                        first_error = result.status;
                    }
                }
                Decision::NotApplicable => {}
            }
        }

        if potential_permit {
            return indeterminate(first_error);
        }
        if at_least_one_deny {
            return DecisionResult::deny();
        }
        if first_error.is_some() {
            return indeterminate(first_error);
        }
        DecisionResult::not_applicable()
    }
}

#[derive(Debug)]
pub struct PermitOverridesPolicyAlg {
    id: String,
}

impl PermitOverridesPolicyAlg {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl CombiningAlgorithm for PermitOverridesPolicyAlg {
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
        let mut deny: Option<DecisionResult> = None;
        let mut first_error: Option<Status> = None;

        for child in children {
            match child.element.matches(ctx) {
                MatchResult::NoMatch => continue,
                MatchResult::Indeterminate(status) => {
                    first_error.get_or_insert(status);
                    continue;
                }
                MatchResult::Match => {}
            }
            let result = child.element.evaluate(ctx);
            match result.decision {
                Decision::Permit => return result,
                Decision::Deny => {
                    let combined = deny.get_or_insert_with(DecisionResult::deny);
                    for obligation in result.obligations {
                        combined.add_obligation(obligation);
                    }
                }
                Decision::Indeterminate => {
                    if first_error.is_none() {
                        first_error = result.status;
                    }
                }
                Decision::NotApplicable => {}
            }
        }

        if let Some(deny) = deny {
            return deny;
        }
        if first_error.is_some() {
            return indeterminate(first_error);
        }
        DecisionResult::not_applicable()
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{broken_rule, ctx, rule, silent_rule};
    use super::*;

    fn alg() -> PermitOverridesRuleAlg {
        PermitOverridesRuleAlg::new(super::super::ids::RULE_PERMIT_OVERRIDES)
    }

    #[test]
    fn permit_wins() {
        let children = vec![
            rule("d", Effect::Deny),
            broken_rule("i", Effect::Deny),
            rule("p", Effect::Permit),
        ];
        assert_eq!(alg().combine(&ctx(), &[], &children).decision, Decision::Permit);
    }

    #[test]
    fn failed_permit_rule_outranks_deny() {
        let children = vec![rule("d", Effect::Deny), broken_rule("i", Effect::Permit)];
        assert_eq!(
            alg().combine(&ctx(), &[], &children).decision,
            Decision::Indeterminate
        );
    }

    #[test]
    fn deny_when_no_permit_possible() {
        let children = vec![
            broken_rule("i", Effect::Deny),
            rule("d", Effect::Deny),
            silent_rule("n"),
        ];
        assert_eq!(alg().combine(&ctx(), &[], &children).decision, Decision::Deny);
    }
}
