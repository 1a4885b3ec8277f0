// expr/mod.rs — The expression tree.
//
// Conditions, variable definitions and function arguments are all
// `Expression`s. Evaluating one yields an `EvaluationResult`: a single
// value, a bag, or INDETERMINATE with the status that explains it.
// Expression evaluation is fail-fast: the first INDETERMINATE argument
// ends the evaluation of the enclosing apply. (Target matching, in
// target.rs, deliberately differs.)

mod apply;
mod designator;
mod selector;
mod variable;

pub use apply::{Apply, Condition};
pub use designator::AttributeDesignator;
pub use selector::AttributeSelector;
pub use variable::{VariableDefinition, VariableReference};

use std::sync::Arc;

use crate::attr::{types, AttributeValue, Bag};
use crate::ctx::EvaluationCtx;
use crate::encode::Indenter;
use crate::func::Function;
use crate::status::Status;

/// Outcome of evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationResult {
    Value(AttributeValue),
    Bag(Bag),
    Indeterminate(Status),
}

impl EvaluationResult {
    pub fn boolean(value: bool) -> Self {
        EvaluationResult::Value(AttributeValue::Boolean(value))
    }

    /// True when this result carries a status instead of a value.
    pub fn indeterminate(&self) -> bool {
        matches!(self, EvaluationResult::Indeterminate(_))
    }

    pub fn status(&self) -> Option<&Status> {
        match self {
            EvaluationResult::Indeterminate(status) => Some(status),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&AttributeValue> {
        match self {
            EvaluationResult::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bag(&self) -> Option<&Bag> {
        match self {
            EvaluationResult::Bag(bag) => Some(bag),
            _ => None,
        }
    }

    /// The boolean carried by this result, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        self.as_value().and_then(AttributeValue::as_bool)
    }
}

impl From<Result<EvaluationResult, Status>> for EvaluationResult {
    fn from(result: Result<EvaluationResult, Status>) -> Self {
        result.unwrap_or_else(EvaluationResult::Indeterminate)
    }
}

/// A node of the expression tree.
#[derive(Debug, Clone)]
pub enum Expression {
    /// A literal `AttributeValue`.
    Value(AttributeValue),
    Designator(AttributeDesignator),
    Selector(AttributeSelector),
    Apply(Apply),
    /// A function passed as an argument to a higher-order function.
    Function(Arc<dyn Function>),
    Variable(VariableReference),
}

impl Expression {
    pub fn evaluate(&self, ctx: &dyn EvaluationCtx) -> EvaluationResult {
        match self {
            Expression::Value(value) => EvaluationResult::Value(value.clone()),
            Expression::Designator(designator) => designator.evaluate(ctx),
            Expression::Selector(selector) => selector.evaluate(ctx),
            Expression::Apply(apply) => apply.evaluate(ctx),
            Expression::Function(function) => EvaluationResult::Indeterminate(
                Status::processing_error(format!(
                    "function {} cannot be evaluated without arguments",
                    function.identifier()
                )),
            ),
            Expression::Variable(reference) => reference.evaluate(ctx),
        }
    }

    /// Datatype URI of the value (or bag members) this expression yields.
    pub fn return_type(&self) -> &str {
        match self {
            Expression::Value(value) => value.data_type(),
            Expression::Designator(designator) => designator.data_type(),
            Expression::Selector(selector) => selector.data_type(),
            Expression::Apply(apply) => apply.function().return_type(),
            Expression::Function(function) => function.return_type(),
            Expression::Variable(reference) => reference.definition().expression().return_type(),
        }
    }

    pub fn returns_bag(&self) -> bool {
        match self {
            Expression::Value(_) => false,
            Expression::Designator(_) | Expression::Selector(_) => true,
            Expression::Apply(apply) => apply.function().returns_bag(),
            Expression::Function(function) => function.returns_bag(),
            Expression::Variable(reference) => reference.definition().expression().returns_bag(),
        }
    }

    /// True for a single (non-bag) boolean expression.
    pub fn is_boolean(&self) -> bool {
        !matches!(self, Expression::Function(_))
            && self.return_type() == types::BOOLEAN
            && !self.returns_bag()
    }

    pub fn encode(&self, w: &mut Indenter) {
        match self {
            Expression::Value(value) => encode_value(value, w),
            Expression::Designator(designator) => designator.encode(w),
            Expression::Selector(selector) => selector.encode(w),
            Expression::Apply(apply) => apply.encode(w),
            Expression::Function(function) => {
                w.empty("Function", &[("FunctionId", function.identifier())])
            }
            Expression::Variable(reference) => {
                w.empty("VariableReference", &[("VariableId", reference.id())])
            }
        }
    }
}

/// Write a literal as `<AttributeValue DataType=..>text</AttributeValue>`.
pub(crate) fn encode_value(value: &AttributeValue, w: &mut Indenter) {
    w.text_element(
        "AttributeValue",
        &[("DataType", value.data_type())],
        &value.encode(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ctx::{BasicEvaluationCtx, RequestCtx};

    #[test]
    fn literal_evaluates_to_itself() {
        let ctx = BasicEvaluationCtx::new(RequestCtx::new().with_resource_id("r"), None).unwrap();
        let expr = Expression::Value(AttributeValue::Integer(4));
        assert_eq!(expr.evaluate(&ctx), EvaluationResult::Value(AttributeValue::Integer(4)));
        assert_eq!(expr.return_type(), types::INTEGER);
        assert!(!expr.returns_bag());
    }

    #[test]
    fn status_accessors() {
        let result = EvaluationResult::Indeterminate(Status::processing_error("x"));
        assert!(result.indeterminate());
        assert!(result.as_value().is_none());
        assert!(EvaluationResult::boolean(true).as_bool().unwrap());
    }
}
