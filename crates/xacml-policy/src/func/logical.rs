// func/logical.rs — and, or, not, n-of.
//
// `and` and `or` evaluate their arguments lazily and stop at the first
// argument that decides the result. An INDETERMINATE argument reached
// before that point makes the whole call INDETERMINATE.

use std::sync::Arc;

use crate::attr::types;
use crate::ctx::EvaluationCtx;
use crate::error::ParsingError;
use crate::expr::{EvaluationResult, Expression};
use crate::status::Status;

use super::{Function, FunctionRegistry, Param, Signature, FUNCTION_NS_1};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Not,
    NOf,
}

#[derive(Debug)]
pub struct LogicalFunction {
    signature: Signature,
    op: LogicalOp,
}

impl LogicalFunction {
    pub fn new(op: LogicalOp) -> Self {
        let boolean = || Param::value(types::BOOLEAN);
        let signature = match op {
            LogicalOp::And => {
                Signature::new(format!("{}and", FUNCTION_NS_1), types::BOOLEAN, vec![boolean()])
                    .variadic(0)
            }
            LogicalOp::Or => {
                Signature::new(format!("{}or", FUNCTION_NS_1), types::BOOLEAN, vec![boolean()])
                    .variadic(0)
            }
            LogicalOp::Not => {
                Signature::new(format!("{}not", FUNCTION_NS_1), types::BOOLEAN, vec![boolean()])
            }
            LogicalOp::NOf => Signature::new(
                format!("{}n-of", FUNCTION_NS_1),
                types::BOOLEAN,
                vec![Param::value(types::INTEGER), boolean()],
            )
            .variadic(1),
        };
        Self { signature, op }
    }

    fn boolean_arg(&self, input: &Expression, ctx: &dyn EvaluationCtx) -> Result<bool, Status> {
        match input.evaluate(ctx) {
            EvaluationResult::Indeterminate(status) => Err(status),
            other => other.as_bool().ok_or_else(|| {
                Status::processing_error(format!(
                    "{} expects boolean arguments",
                    self.signature.id()
                ))
            }),
        }
    }

    fn run(&self, inputs: &[Expression], ctx: &dyn EvaluationCtx) -> Result<bool, Status> {
        match self.op {
            LogicalOp::And => {
                for input in inputs {
                    if !self.boolean_arg(input, ctx)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            LogicalOp::Or => {
                for input in inputs {
                    if self.boolean_arg(input, ctx)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            LogicalOp::Not => {
                let input = inputs
                    .first()
                    .ok_or_else(|| Status::processing_error("not requires one argument"))?;
                Ok(!self.boolean_arg(input, ctx)?)
            }
            LogicalOp::NOf => {
                let (first, rest) = inputs
                    .split_first()
                    .ok_or_else(|| Status::processing_error("n-of requires a count"))?;
                let needed = match first.evaluate(ctx) {
                    EvaluationResult::Indeterminate(status) => return Err(status),
                    other => other
                        .as_value()
                        .and_then(|v| v.as_integer())
                        .ok_or_else(|| Status::processing_error("n-of count must be an integer"))?,
                };
                if needed <= 0 {
                    return Ok(true);
                }
                let needed = needed as usize;
                if needed > rest.len() {
                    return Err(Status::processing_error(format!(
                        "n-of needs {} true arguments but only {} were given",
                        needed,
                        rest.len()
                    )));
                }
                let mut found = 0;
                for (i, input) in rest.iter().enumerate() {
                    if self.boolean_arg(input, ctx)? {
                        found += 1;
                        if found == needed {
                            return Ok(true);
                        }
                    }
                    // Not enough arguments left to reach the count.
                    if needed - found > rest.len() - i - 1 {
                        return Ok(false);
                    }
                }
                Ok(false)
            }
        }
    }
}

impl Function for LogicalFunction {
    fn identifier(&self) -> &str {
        self.signature.id()
    }

    fn return_type(&self) -> &str {
        self.signature.return_type()
    }

    fn returns_bag(&self) -> bool {
        false
    }

    fn check_inputs(&self, inputs: &[Expression]) -> Result<(), ParsingError> {
        self.signature.check(inputs, false)
    }

    fn check_inputs_no_bag(&self, inputs: &[Expression]) -> Result<(), ParsingError> {
        self.signature.check(inputs, true)
    }

    fn evaluate(&self, inputs: &[Expression], ctx: &dyn EvaluationCtx) -> EvaluationResult {
        self.run(inputs, ctx).map(EvaluationResult::boolean).into()
    }
}

pub(crate) fn register(registry: &mut FunctionRegistry) {
    for op in [LogicalOp::And, LogicalOp::Or, LogicalOp::Not, LogicalOp::NOf] {
        registry.register_condition(Arc::new(LogicalFunction::new(op)));
    }
}
