// combine/first_applicable.rs — first-applicable for rules and policies.

use crate::ctx::EvaluationCtx;
use crate::result::{Decision, DecisionResult};
use crate::target::MatchResult;

use super::{ids, CombinerElement, CombinerParameter, CombiningAlgorithm, CombiningKind};

/// The first rule that does not return NotApplicable decides.
#[derive(Debug)]
pub struct FirstApplicableRuleAlg;

impl CombiningAlgorithm for FirstApplicableRuleAlg {
    fn identifier(&self) -> &str {
        ids::RULE_FIRST_APPLICABLE
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
        for child in children {
            let result = child.element.evaluate(ctx);
            if result.decision != Decision::NotApplicable {
                return result;
            }
        }
        DecisionResult::not_applicable()
    }
}

/// The first matching policy that does not return NotApplicable decides;
/// a target error stops the search.
#[derive(Debug)]
pub struct FirstApplicablePolicyAlg;

impl CombiningAlgorithm for FirstApplicablePolicyAlg {
    fn identifier(&self) -> &str {
        ids::POLICY_FIRST_APPLICABLE
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
        for child in children {
            match child.element.matches(ctx) {
                MatchResult::NoMatch => continue,
                MatchResult::Indeterminate(status) => return DecisionResult::indeterminate(status),
                MatchResult::Match => {
                    let result = child.element.evaluate(ctx);
                    if result.decision != Decision::NotApplicable {
                        return result;
                    }
                }
            }
        }
        DecisionResult::not_applicable()
    }
}
