// expr/apply.rs — Function application and rule conditions.

use std::sync::Arc;

use crate::attr::types;
use crate::ctx::EvaluationCtx;
use crate::encode::Indenter;
use crate::error::ParsingError;
use crate::func::Function;

use super::{EvaluationResult, Expression};

/// A function applied to argument expressions. Arguments are type-checked
/// against the function when the node is built.
#[derive(Debug, Clone)]
pub struct Apply {
    function: Arc<dyn Function>,
    args: Vec<Expression>,
}

impl Apply {
    pub fn new(function: Arc<dyn Function>, args: Vec<Expression>) -> Result<Self, ParsingError> {
        function.check_inputs(&args)?;
        Ok(Self { function, args })
    }

    pub fn function(&self) -> &Arc<dyn Function> {
        &self.function
    }

    pub fn args(&self) -> &[Expression] {
        &self.args
    }

    pub fn evaluate(&self, ctx: &dyn EvaluationCtx) -> EvaluationResult {
        self.function.evaluate(&self.args, ctx)
    }

    pub fn encode(&self, w: &mut Indenter) {
        w.open("Apply", &[("FunctionId", self.function.identifier())]);
        for arg in &self.args {
            arg.encode(w);
        }
        w.close("Apply");
    }
}

/// A rule condition: a single boolean expression.
///
/// XACML 1.x writes the condition as an apply whose element is named
/// `Condition`; `legacy` remembers that form so the rule encodes back the
/// way it was read.
#[derive(Debug, Clone)]
pub struct Condition {
    expression: Expression,
    legacy: bool,
}

impl Condition {
    pub fn new(expression: Expression) -> Result<Self, ParsingError> {
        if !expression.is_boolean() {
            return Err(ParsingError::TypeMismatch {
                function: "Condition".to_string(),
                reason: format!(
                    "condition must return a single {}, found {}{}",
                    types::BOOLEAN,
                    if expression.returns_bag() { "bag of " } else { "" },
                    expression.return_type()
                ),
            });
        }
        Ok(Self {
            expression,
            legacy: false,
        })
    }

    /// A 1.x condition built from its function and arguments.
    pub fn legacy(apply: Apply) -> Result<Self, ParsingError> {
        let mut condition = Self::new(Expression::Apply(apply))?;
        condition.legacy = true;
        Ok(condition)
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn evaluate(&self, ctx: &dyn EvaluationCtx) -> EvaluationResult {
        self.expression.evaluate(ctx)
    }

    pub fn encode(&self, w: &mut Indenter) {
        match (&self.expression, self.legacy) {
            (Expression::Apply(apply), true) => {
                w.open("Condition", &[("FunctionId", apply.function.identifier())]);
                for arg in &apply.args {
                    arg.encode(w);
                }
                w.close("Condition");
            }
            (expression, _) => {
                w.open("Condition", &[]);
                expression.encode(w);
                w.close("Condition");
            }
        }
    }
}
