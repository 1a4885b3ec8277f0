// rule.rs — Leaf of the policy tree: target, condition and effect.
//
// A rule without a target inherits its parent's: `evaluate` treats it as
// already matched. `matches` has no parent to fall back on and reports
// INDETERMINATE instead.

use crate::ctx::EvaluationCtx;
use crate::encode::Indenter;
use crate::expr::{Condition, EvaluationResult};
use crate::result::{DecisionResult, Effect};
use crate::status::Status;
use crate::target::{MatchResult, Target, XacmlVersion};

#[derive(Debug, Clone)]
pub struct Rule {
    id: String,
    effect: Effect,
    description: Option<String>,
    target: Option<Target>,
    condition: Option<Condition>,
}

impl Rule {
    pub fn new(id: impl Into<String>, effect: Effect) -> Self {
        Self {
            id: id.into(),
            effect,
            description: None,
            target: None,
            condition: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn effect(&self) -> Effect {
        self.effect
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    pub fn matches(&self, ctx: &dyn EvaluationCtx) -> MatchResult {
        match &self.target {
            Some(target) => target.matches(ctx),
            None => MatchResult::Indeterminate(Status::processing_error(format!(
                "rule {} has no target to match",
                self.id
            ))),
        }
    }

    pub fn evaluate(&self, ctx: &dyn EvaluationCtx) -> DecisionResult {
        if let Some(target) = &self.target {
            match target.matches(ctx) {
                MatchResult::Match => {}
                MatchResult::NoMatch => return DecisionResult::not_applicable(),
                MatchResult::Indeterminate(status) => return DecisionResult::indeterminate(status),
            }
        }

        let Some(condition) = &self.condition else {
            return DecisionResult::new(self.effect.decision());
        };
        match condition.evaluate(ctx) {
            EvaluationResult::Indeterminate(status) => DecisionResult::indeterminate(status),
            result => match result.as_bool() {
                Some(true) => DecisionResult::new(self.effect.decision()),
                Some(false) => DecisionResult::not_applicable(),
                None => DecisionResult::indeterminate(Status::processing_error(format!(
                    "condition of rule {} did not produce a boolean",
                    self.id
                ))),
            },
        }
    }

    pub fn encode(&self, version: XacmlVersion, w: &mut Indenter) {
        let attrs = [("RuleId", self.id.as_str()), ("Effect", self.effect.as_str())];
        if self.description.is_none() && self.target.is_none() && self.condition.is_none() {
            w.empty("Rule", &attrs);
            return;
        }
        w.open("Rule", &attrs);
        if let Some(description) = &self.description {
            w.text_element("Description", &[], description);
        }
        if let Some(target) = &self.target {
            target.encode(version, w);
        }
        if let Some(condition) = &self.condition {
            condition.encode(w);
        }
        w.close("Rule");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::{types, AttributeValue};
    use crate::ctx::{BasicEvaluationCtx, Category, RequestCtx};
    use crate::expr::{Apply, AttributeDesignator, Expression};
    use crate::func::{FunctionRegistry, FUNCTION_NS_1};
    use crate::result::Decision;
    use crate::target::{TargetMatch, TargetMatchGroup, TargetSection};

    fn ctx(resource: &str) -> BasicEvaluationCtx {
        BasicEvaluationCtx::new(RequestCtx::new().with_resource_id(resource), None).unwrap()
    }

    fn resource_target(resource: &str) -> Target {
        let f = FunctionRegistry::standard()
            .target_function(&format!("{}string-equal", FUNCTION_NS_1))
            .unwrap();
        let m = TargetMatch::new(
            Category::Resource,
            f,
            AttributeValue::string(resource),
            Expression::Designator(AttributeDesignator::new(
                Category::Resource,
                types::STRING,
                crate::ctx::RESOURCE_ID,
            )),
        )
        .unwrap();
        Target::any().with_section(TargetSection::new(
            Category::Resource,
            vec![TargetMatchGroup::new(vec![m])],
        ))
    }

    fn condition(value: bool) -> Condition {
        Condition::new(Expression::Value(AttributeValue::Boolean(value))).unwrap()
    }

    fn missing_condition() -> Condition {
        let f = FunctionRegistry::standard()
            .condition_function(&format!("{}boolean-one-and-only", FUNCTION_NS_1))
            .unwrap();
        let apply = Apply::new(
            f,
            vec![Expression::Designator(AttributeDesignator::new(
                Category::Environment,
                types::BOOLEAN,
                "flag",
            ))],
        )
        .unwrap();
        Condition::new(Expression::Apply(apply)).unwrap()
    }

    #[test]
    fn matching_requires_a_target() {
        let rule = Rule::new("r", Effect::Permit);
        assert!(matches!(rule.matches(&ctx("A")), MatchResult::Indeterminate(_)));
        assert_eq!(rule.evaluate(&ctx("A")).decision, Decision::Permit);
    }

    #[test]
    fn target_gates_the_effect() {
        let rule = Rule::new("r", Effect::Deny).with_target(resource_target("A"));
        assert_eq!(rule.evaluate(&ctx("A")).decision, Decision::Deny);
        assert_eq!(rule.evaluate(&ctx("B")).decision, Decision::NotApplicable);
    }

    #[test]
    fn condition_outcomes() {
        let yes = Rule::new("r", Effect::Permit).with_condition(condition(true));
        assert_eq!(yes.evaluate(&ctx("A")).decision, Decision::Permit);
        let no = Rule::new("r", Effect::Permit).with_condition(condition(false));
        assert_eq!(no.evaluate(&ctx("A")).decision, Decision::NotApplicable);
        let broken = Rule::new("r", Effect::Permit).with_condition(missing_condition());
        let result = broken.evaluate(&ctx("A"));
        assert!(result.is_indeterminate());
        assert!(result.status.is_some());
    }
}
