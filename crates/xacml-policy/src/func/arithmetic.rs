// func/arithmetic.rs — Integer and double arithmetic.
//
// Integer arithmetic is checked: overflow and division by zero produce a
// processing-error status instead of a value. Double division by zero is
// also a processing error.

use std::sync::Arc;

use crate::attr::{types, AttributeValue};
use crate::ctx::EvaluationCtx;
use crate::error::ParsingError;
use crate::expr::{EvaluationResult, Expression};
use crate::status::Status;

use super::{
    eval_args, value_arg, wrong_type, Function, FunctionRegistry, Param, Signature, FUNCTION_NS_1,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Mod,
    Abs,
    Round,
    Floor,
}

#[derive(Debug)]
pub struct ArithmeticFunction {
    signature: Signature,
    op: ArithmeticOp,
}

impl ArithmeticFunction {
    /// `data_type` is integer or double. `mod` exists only for integers
    /// and `round`/`floor` only for doubles.
    pub fn new(data_type: &str, op: ArithmeticOp) -> Self {
        let short = if data_type == types::INTEGER { "integer" } else { "double" };
        let id = match op {
            ArithmeticOp::Add => format!("{}{}-add", FUNCTION_NS_1, short),
            ArithmeticOp::Subtract => format!("{}{}-subtract", FUNCTION_NS_1, short),
            ArithmeticOp::Multiply => format!("{}{}-multiply", FUNCTION_NS_1, short),
            ArithmeticOp::Divide => format!("{}{}-divide", FUNCTION_NS_1, short),
            ArithmeticOp::Mod => format!("{}{}-mod", FUNCTION_NS_1, short),
            ArithmeticOp::Abs => format!("{}{}-abs", FUNCTION_NS_1, short),
            ArithmeticOp::Round => format!("{}round", FUNCTION_NS_1),
            ArithmeticOp::Floor => format!("{}floor", FUNCTION_NS_1),
        };
        let signature = match op {
            ArithmeticOp::Add => {
                Signature::new(id, data_type, vec![Param::value(data_type)]).variadic(2)
            }
            ArithmeticOp::Abs | ArithmeticOp::Round | ArithmeticOp::Floor => {
                Signature::new(id, data_type, vec![Param::value(data_type)])
            }
            _ => Signature::new(
                id,
                data_type,
                vec![Param::value(data_type), Param::value(data_type)],
            ),
        };
        Self { signature, op }
    }

    fn overflow(&self) -> Status {
        Status::processing_error(format!("{}: integer overflow", self.signature.id()))
    }

    fn division_by_zero(&self) -> Status {
        Status::processing_error(format!("{}: division by zero", self.signature.id()))
    }

    fn integers(&self, values: &[i64]) -> Result<i64, Status> {
        let first = values[0];
        let result = match self.op {
            ArithmeticOp::Add => values[1..]
                .iter()
                .try_fold(first, |acc, v| acc.checked_add(*v)),
            ArithmeticOp::Subtract => first.checked_sub(values[1]),
            ArithmeticOp::Multiply => first.checked_mul(values[1]),
            ArithmeticOp::Divide | ArithmeticOp::Mod if values[1] == 0 => {
                return Err(self.division_by_zero())
            }
            ArithmeticOp::Divide => first.checked_div(values[1]),
            ArithmeticOp::Mod => first.checked_rem(values[1]),
            ArithmeticOp::Abs => first.checked_abs(),
            ArithmeticOp::Round | ArithmeticOp::Floor => Some(first),
        };
        result.ok_or_else(|| self.overflow())
    }

    fn doubles(&self, values: &[f64]) -> Result<f64, Status> {
        let first = values[0];
        Ok(match self.op {
            ArithmeticOp::Add => values[1..].iter().fold(first, |acc, v| acc + v),
            ArithmeticOp::Subtract => first - values[1],
            ArithmeticOp::Multiply => first * values[1],
            ArithmeticOp::Divide if values[1] == 0.0 => return Err(self.division_by_zero()),
            ArithmeticOp::Divide => first / values[1],
            ArithmeticOp::Mod => first % values[1],
            ArithmeticOp::Abs => first.abs(),
            // XACML rounds halves to the even neighbour.
            ArithmeticOp::Round => first.round_ties_even(),
            ArithmeticOp::Floor => first.floor(),
        })
    }

    fn run(&self, args: &[EvaluationResult]) -> Result<EvaluationResult, Status> {
        let values = (0..args.len())
            .map(|i| value_arg(args, i))
            .collect::<Result<Vec<_>, _>>()?;
        if self.signature.return_type() == types::INTEGER {
            let ints = values
                .iter()
                .map(|v| v.as_integer().ok_or_else(|| wrong_type(self.signature.id(), v)))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(EvaluationResult::Value(AttributeValue::Integer(self.integers(&ints)?)))
        } else {
            let doubles = values
                .iter()
                .map(|v| v.as_double().ok_or_else(|| wrong_type(self.signature.id(), v)))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(EvaluationResult::Value(AttributeValue::Double(self.doubles(&doubles)?)))
        }
    }
}

impl Function for ArithmeticFunction {
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
        eval_args(inputs, ctx).and_then(|args| self.run(&args)).into()
    }
}

pub(crate) fn register(registry: &mut FunctionRegistry) {
    use ArithmeticOp::*;
    for op in [Add, Subtract, Multiply, Divide, Mod, Abs] {
        registry.register_condition(Arc::new(ArithmeticFunction::new(types::INTEGER, op)));
    }
    for op in [Add, Subtract, Multiply, Divide, Abs, Round, Floor] {
        registry.register_condition(Arc::new(ArithmeticFunction::new(types::DOUBLE, op)));
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{call, int, v};
    use super::*;
    use crate::status::STATUS_PROCESSING_ERROR;

    fn d(x: f64) -> Expression {
        v(AttributeValue::Double(x))
    }

    #[test]
    fn integer_operations() {
        assert_eq!(
            call("integer-add", vec![int(1), int(2), int(3)]).as_value(),
            Some(&AttributeValue::Integer(6))
        );
        assert_eq!(
            call("integer-mod", vec![int(7), int(3)]).as_value(),
            Some(&AttributeValue::Integer(1))
        );
        assert_eq!(
            call("integer-abs", vec![int(-4)]).as_value(),
            Some(&AttributeValue::Integer(4))
        );
    }

    #[test]
    fn division_by_zero_is_processing_error() {
        match call("integer-divide", vec![int(1), int(0)]) {
            EvaluationResult::Indeterminate(status) => {
                assert_eq!(status.code(), STATUS_PROCESSING_ERROR)
            }
            other => panic!("expected indeterminate, got {:?}", other),
        }
        assert!(call("double-divide", vec![d(1.0), d(0.0)]).indeterminate());
    }

    #[test]
    fn overflow_is_processing_error() {
        assert!(call("integer-add", vec![int(i64::MAX), int(1)]).indeterminate());
    }

    #[test]
    fn rounding() {
        assert_eq!(call("round", vec![d(2.5)]).as_value(), Some(&AttributeValue::Double(2.0)));
        assert_eq!(call("floor", vec![d(-1.5)]).as_value(), Some(&AttributeValue::Double(-2.0)));
    }
}
