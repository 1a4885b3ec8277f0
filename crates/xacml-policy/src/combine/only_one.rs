// combine/only_one.rs — only-one-applicable (policies only).
//
// Exactly one child may match. A target error or a second match is
// INDETERMINATE; the lone match, if any, is evaluated.

use crate::ctx::EvaluationCtx;
use crate::result::DecisionResult;
use crate::status::Status;
use crate::target::MatchResult;

use super::{ids, CombinerElement, CombinerParameter, CombiningAlgorithm, CombiningKind};

#[derive(Debug)]
pub struct OnlyOneApplicablePolicyAlg;

impl CombiningAlgorithm for OnlyOneApplicablePolicyAlg {
    fn identifier(&self) -> &str {
        ids::POLICY_ONLY_ONE_APPLICABLE
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
        let mut selected: Option<&CombinerElement> = None;
        for child in children {
            match child.element.matches(ctx) {
                MatchResult::NoMatch => {}
                MatchResult::Indeterminate(status) => return DecisionResult::indeterminate(status),
                MatchResult::Match => {
                    if selected.is_some() {
                        return DecisionResult::indeterminate(Status::processing_error(
                            "more than one policy is applicable",
                        ));
                    }
                    selected = Some(child);
                }
            }
        }
        match selected {
            Some(child) => child.element.evaluate(ctx),
            None => DecisionResult::not_applicable(),
        }
    }
}
