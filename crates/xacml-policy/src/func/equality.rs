// func/equality.rs — `<type>-equal` for every standard datatype.

use std::sync::Arc;

use crate::attr::{types, STANDARD_TYPES};
use crate::ctx::EvaluationCtx;
use crate::error::ParsingError;
use crate::expr::{EvaluationResult, Expression};

use super::{eval_args, value_arg, Function, FunctionRegistry, Param, Signature, FUNCTION_NS_1};

#[derive(Debug)]
pub struct EqualityFunction {
    signature: Signature,
}

impl EqualityFunction {
    /// `short` is the datatype's short name, as in `string-equal`.
    pub fn new(short: &str, data_type: &str) -> Self {
        Self {
            signature: Signature::new(
                format!("{}{}-equal", FUNCTION_NS_1, short),
                types::BOOLEAN,
                vec![Param::value(data_type), Param::value(data_type)],
            ),
        }
    }
}

impl Function for EqualityFunction {
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
        let outcome = eval_args(inputs, ctx).and_then(|args| {
            let a = value_arg(&args, 0)?;
            let b = value_arg(&args, 1)?;
            Ok(EvaluationResult::boolean(a == b))
        });
        outcome.into()
    }
}

pub(crate) fn register(registry: &mut FunctionRegistry) {
    for &(short, uri) in STANDARD_TYPES {
        registry.register_target(Arc::new(EqualityFunction::new(short, uri)));
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{call, int, s};
    use super::*;
    use crate::attr::AttributeValue;

    #[test]
    fn equal_values() {
        assert_eq!(call("string-equal", vec![s("a"), s("a")]).as_bool(), Some(true));
        assert_eq!(call("integer-equal", vec![int(1), int(2)]).as_bool(), Some(false));
    }

    #[test]
    fn date_time_equality_is_instant_based() {
        let parse = |text: &str| {
            crate::attr::parse_standard(types::DATE_TIME, text)
                .unwrap()
                .unwrap()
        };
        let a = parse("2024-01-01T12:00:00+01:00");
        let b = parse("2024-01-01T11:00:00Z");
        let result = call("dateTime-equal", vec![Expression::Value(a), Expression::Value(b)]);
        assert_eq!(result.as_bool(), Some(true));
        assert_eq!(
            call("boolean-equal", vec![
                Expression::Value(AttributeValue::Boolean(true)),
                Expression::Value(AttributeValue::Boolean(true)),
            ])
            .as_bool(),
            Some(true)
        );
    }
}
