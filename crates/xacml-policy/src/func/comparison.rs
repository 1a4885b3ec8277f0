// func/comparison.rs — Ordering functions.
//
// `<type>-greater-than`, `-greater-than-or-equal`, `-less-than` and
// `-less-than-or-equal` for integer, double, string, time, dateTime and
// date. Doubles order NaN above every other value and two NaNs as equal,
// so the comparison is total.

use std::cmp::Ordering;
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
pub enum ComparisonOp {
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

impl ComparisonOp {
    const ALL: [ComparisonOp; 4] = [
        ComparisonOp::GreaterThan,
        ComparisonOp::GreaterThanOrEqual,
        ComparisonOp::LessThan,
        ComparisonOp::LessThanOrEqual,
    ];

    fn suffix(&self) -> &'static str {
        match self {
            ComparisonOp::GreaterThan => "greater-than",
            ComparisonOp::GreaterThanOrEqual => "greater-than-or-equal",
            ComparisonOp::LessThan => "less-than",
            ComparisonOp::LessThanOrEqual => "less-than-or-equal",
        }
    }

    fn holds(&self, ordering: Ordering) -> bool {
        match self {
            ComparisonOp::GreaterThan => ordering == Ordering::Greater,
            ComparisonOp::GreaterThanOrEqual => ordering != Ordering::Less,
            ComparisonOp::LessThan => ordering == Ordering::Less,
            ComparisonOp::LessThanOrEqual => ordering != Ordering::Greater,
        }
    }
}

const COMPARABLE_TYPES: &[(&str, &str)] = &[
    ("integer", types::INTEGER),
    ("double", types::DOUBLE),
    ("string", types::STRING),
    ("time", types::TIME),
    ("dateTime", types::DATE_TIME),
    ("date", types::DATE),
];

#[derive(Debug)]
pub struct ComparisonFunction {
    signature: Signature,
    op: ComparisonOp,
}

impl ComparisonFunction {
    pub fn new(short: &str, data_type: &str, op: ComparisonOp) -> Self {
        Self {
            signature: Signature::new(
                format!("{}{}-{}", FUNCTION_NS_1, short, op.suffix()),
                types::BOOLEAN,
                vec![Param::value(data_type), Param::value(data_type)],
            ),
            op,
        }
    }

    fn compare(&self, a: &AttributeValue, b: &AttributeValue) -> Result<Ordering, Status> {
        match (a, b) {
            (AttributeValue::Integer(x), AttributeValue::Integer(y)) => Ok(x.cmp(y)),
            (AttributeValue::Double(x), AttributeValue::Double(y)) => Ok(compare_doubles(*x, *y)),
            (AttributeValue::String(x), AttributeValue::String(y)) => Ok(x.cmp(y)),
            (AttributeValue::Time(x), AttributeValue::Time(y)) => Ok(x.cmp(y)),
            (AttributeValue::DateTime(x), AttributeValue::DateTime(y)) => Ok(x.cmp(y)),
            (AttributeValue::Date(x), AttributeValue::Date(y)) => Ok(x.cmp(y)),
            _ => Err(wrong_type(self.signature.id(), a)),
        }
    }
}

/// Total order on doubles: NaN sorts last and equals itself; -0.0 < 0.0.
pub(crate) fn compare_doubles(x: f64, y: f64) -> Ordering {
    match (x.is_nan(), y.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => x.total_cmp(&y),
    }
}

impl Function for ComparisonFunction {
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
            let ordering = self.compare(value_arg(&args, 0)?, value_arg(&args, 1)?)?;
            Ok(EvaluationResult::boolean(self.op.holds(ordering)))
        });
        outcome.into()
    }
}

pub(crate) fn register(registry: &mut FunctionRegistry) {
    for &(short, uri) in COMPARABLE_TYPES {
        for op in ComparisonOp::ALL {
            registry.register_target(Arc::new(ComparisonFunction::new(short, uri, op)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{call, int, s, v};
    use super::*;

    #[test]
    fn integer_ordering() {
        assert_eq!(call("integer-greater-than", vec![int(3), int(2)]).as_bool(), Some(true));
        assert_eq!(call("integer-greater-than", vec![int(2), int(2)]).as_bool(), Some(false));
        assert_eq!(
            call("integer-greater-than-or-equal", vec![int(2), int(2)]).as_bool(),
            Some(true)
        );
        assert_eq!(call("integer-less-than", vec![int(1), int(2)]).as_bool(), Some(true));
    }

    #[test]
    fn string_ordering_is_lexicographic() {
        assert_eq!(call("string-less-than", vec![s("abc"), s("abd")]).as_bool(), Some(true));
        assert_eq!(
            call("string-less-than-or-equal", vec![s("b"), s("a")]).as_bool(),
            Some(false)
        );
    }

    #[test]
    fn nan_sorts_above_everything() {
        assert_eq!(compare_doubles(f64::NAN, f64::INFINITY), Ordering::Greater);
        assert_eq!(compare_doubles(f64::NAN, f64::NAN), Ordering::Equal);
        assert_eq!(compare_doubles(-0.0, 0.0), Ordering::Less);
        let result = call(
            "double-greater-than",
            vec![v(AttributeValue::Double(f64::NAN)), v(AttributeValue::Double(1.0))],
        );
        assert_eq!(result.as_bool(), Some(true));
    }

    #[test]
    fn time_ordering_uses_utc() {
        let parse = |text: &str| crate::attr::parse_standard(types::TIME, text).unwrap().unwrap();
        // 09:00+02:00 is 07:00Z.
        let result = call(
            "time-less-than",
            vec![v(parse("09:00:00+02:00")), v(parse("08:00:00Z"))],
        );
        assert_eq!(result.as_bool(), Some(true));
    }
}
