// func/bag.rs — one-and-only, bag-size, is-in and bag constructors.

use std::sync::Arc;

use crate::attr::{types, AttributeValue, Bag, STANDARD_TYPES};
use crate::ctx::EvaluationCtx;
use crate::error::ParsingError;
use crate::expr::{EvaluationResult, Expression};
use crate::status::Status;

use super::{
    bag_arg, eval_args, value_arg, Function, FunctionRegistry, Param, Signature, FUNCTION_NS_1,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BagOp {
    /// The single member of a one-element bag.
    OneAndOnly,
    Size,
    IsIn,
    /// Build a bag from its arguments.
    Bag,
}

#[derive(Debug)]
pub struct BagFunction {
    signature: Signature,
    op: BagOp,
    data_type: String,
}

impl BagFunction {
    pub fn new(short: &str, data_type: &str, op: BagOp) -> Self {
        let signature = match op {
            BagOp::OneAndOnly => Signature::new(
                format!("{}{}-one-and-only", FUNCTION_NS_1, short),
                data_type,
                vec![Param::bag(data_type)],
            ),
            BagOp::Size => Signature::new(
                format!("{}{}-bag-size", FUNCTION_NS_1, short),
                types::INTEGER,
                vec![Param::bag(data_type)],
            ),
            BagOp::IsIn => Signature::new(
                format!("{}{}-is-in", FUNCTION_NS_1, short),
                types::BOOLEAN,
                vec![Param::value(data_type), Param::bag(data_type)],
            ),
            BagOp::Bag => Signature::new(
                format!("{}{}-bag", FUNCTION_NS_1, short),
                data_type,
                vec![Param::value(data_type)],
            )
            .variadic(0)
            .returning_bag(),
        };
        Self {
            signature,
            op,
            data_type: data_type.to_string(),
        }
    }

    fn run(&self, args: &[EvaluationResult]) -> Result<EvaluationResult, Status> {
        match self.op {
            BagOp::OneAndOnly => {
                let bag = bag_arg(args, 0)?;
                match bag.values() {
                    [only] => Ok(EvaluationResult::Value(only.clone())),
                    values => Err(Status::processing_error(format!(
                        "{} expects a bag of one value, got {}",
                        self.signature.id(),
                        values.len()
                    ))),
                }
            }
            BagOp::Size => {
                let size = bag_arg(args, 0)?.len();
                Ok(EvaluationResult::Value(AttributeValue::Integer(size as i64)))
            }
            BagOp::IsIn => {
                let value = value_arg(args, 0)?;
                Ok(EvaluationResult::boolean(bag_arg(args, 1)?.contains(value)))
            }
            BagOp::Bag => {
                let values = (0..args.len())
                    .map(|i| value_arg(args, i).cloned())
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(EvaluationResult::Bag(Bag::new(self.data_type.clone(), values)))
            }
        }
    }
}

impl Function for BagFunction {
    fn identifier(&self) -> &str {
        self.signature.id()
    }

    fn return_type(&self) -> &str {
        self.signature.return_type()
    }

    fn returns_bag(&self) -> bool {
        self.signature.returns_bag()
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
    for &(short, uri) in STANDARD_TYPES {
        for op in [BagOp::OneAndOnly, BagOp::Size, BagOp::IsIn, BagOp::Bag] {
            registry.register_condition(Arc::new(BagFunction::new(short, uri, op)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{call, int, s};
    use super::*;

    fn string_bag(values: &[&str]) -> Expression {
        let registry = FunctionRegistry::standard();
        let f = registry
            .condition_function(&format!("{}string-bag", FUNCTION_NS_1))
            .unwrap();
        let args = values.iter().map(|v| s(v)).collect();
        Expression::Apply(crate::expr::Apply::new(f, args).unwrap())
    }

    #[test]
    fn one_and_only() {
        assert_eq!(
            call("string-one-and-only", vec![string_bag(&["a"])]).as_value(),
            Some(&AttributeValue::string("a"))
        );
        assert!(call("string-one-and-only", vec![string_bag(&["a", "b"])]).indeterminate());
        assert!(call("string-one-and-only", vec![string_bag(&[])]).indeterminate());
    }

    #[test]
    fn size_and_membership() {
        assert_eq!(
            call("string-bag-size", vec![string_bag(&["a", "b"])]).as_value(),
            Some(&AttributeValue::Integer(2))
        );
        assert_eq!(
            call("string-is-in", vec![s("b"), string_bag(&["a", "b"])]).as_bool(),
            Some(true)
        );
        assert_eq!(
            call("string-is-in", vec![s("c"), string_bag(&["a", "b"])]).as_bool(),
            Some(false)
        );
    }

    #[test]
    fn integer_bag_constructor() {
        match call("integer-bag", vec![int(1), int(1)]) {
            EvaluationResult::Bag(bag) => {
                assert_eq!(bag.len(), 2);
                assert_eq!(bag.data_type(), types::INTEGER);
            }
            other => panic!("expected bag, got {:?}", other),
        }
    }
}
