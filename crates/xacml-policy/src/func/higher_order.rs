// func/higher_order.rs — Quantifiers that apply a boolean function over bags.
//
// The first argument is always a `<Function>` reference returning a single
// boolean. `any-of`/`all-of` take a single value and a bag; the other four
// take two bags. The applied function is called with (first, second)
// argument order, and an INDETERMINATE call ends the quantifier.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::attr::{types, AttributeValue, Bag};
use crate::ctx::EvaluationCtx;
use crate::error::ParsingError;
use crate::expr::{EvaluationResult, Expression};
use crate::status::Status;

use super::{bag_arg, eval_args, value_arg, Function, FunctionRegistry, FUNCTION_NS_1};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    AnyOf,
    AllOf,
    AnyOfAny,
    AllOfAny,
    AnyOfAll,
    AllOfAll,
}

impl Quantifier {
    const ALL: [Quantifier; 6] = [
        Quantifier::AnyOf,
        Quantifier::AllOf,
        Quantifier::AnyOfAny,
        Quantifier::AllOfAny,
        Quantifier::AnyOfAll,
        Quantifier::AllOfAll,
    ];

    fn name(&self) -> &'static str {
        match self {
            Quantifier::AnyOf => "any-of",
            Quantifier::AllOf => "all-of",
            Quantifier::AnyOfAny => "any-of-any",
            Quantifier::AllOfAny => "all-of-any",
            Quantifier::AnyOfAll => "any-of-all",
            Quantifier::AllOfAll => "all-of-all",
        }
    }

    /// Whether the middle argument is a single value rather than a bag.
    fn takes_single_value(&self) -> bool {
        matches!(self, Quantifier::AnyOf | Quantifier::AllOf)
    }
}

#[derive(Debug)]
pub struct HigherOrderFunction {
    id: String,
    quantifier: Quantifier,
}

impl HigherOrderFunction {
    pub fn new(quantifier: Quantifier) -> Self {
        Self {
            id: format!("{}{}", FUNCTION_NS_1, quantifier.name()),
            quantifier,
        }
    }

    fn mismatch(&self, reason: impl Into<String>) -> ParsingError {
        ParsingError::TypeMismatch {
            function: self.id.clone(),
            reason: reason.into(),
        }
    }

    fn check(&self, inputs: &[Expression], ignore_bags: bool) -> Result<(), ParsingError> {
        let [function, first, second] = inputs else {
            return Err(self.mismatch(format!("expected 3 arguments, got {}", inputs.len())));
        };
        let Expression::Function(function) = function else {
            return Err(self.mismatch("first argument must be a <Function>"));
        };
        if function.return_type() != types::BOOLEAN || function.returns_bag() {
            return Err(self.mismatch(format!(
                "{} does not return a single boolean",
                function.identifier()
            )));
        }
        if matches!(first, Expression::Function(_)) || matches!(second, Expression::Function(_)) {
            return Err(self.mismatch("only the first argument may be a function"));
        }
        if !ignore_bags {
            if first.returns_bag() == self.quantifier.takes_single_value() {
                return Err(self.mismatch("second argument has the wrong bag-ness"));
            }
            if !second.returns_bag() {
                return Err(self.mismatch("third argument must be a bag"));
            }
        }
        // The applied function sees single members of each side.
        let probe = [
            Expression::Value(placeholder(first.return_type())),
            Expression::Value(placeholder(second.return_type())),
        ];
        function.check_inputs(&probe)
    }

    fn apply(
        &self,
        function: &Arc<dyn Function>,
        a: &AttributeValue,
        b: &AttributeValue,
        ctx: &dyn EvaluationCtx,
    ) -> Result<bool, Status> {
        let args = [Expression::Value(a.clone()), Expression::Value(b.clone())];
        match function.evaluate(&args, ctx) {
            EvaluationResult::Indeterminate(status) => Err(status),
            other => other.as_bool().ok_or_else(|| {
                Status::processing_error(format!(
                    "{} did not return a boolean",
                    function.identifier()
                ))
            }),
        }
    }

    fn any_in(
        &self,
        function: &Arc<dyn Function>,
        a: &AttributeValue,
        bag: &Bag,
        ctx: &dyn EvaluationCtx,
    ) -> Result<bool, Status> {
        for b in bag {
            if self.apply(function, a, b, ctx)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn all_in(
        &self,
        function: &Arc<dyn Function>,
        a: &AttributeValue,
        bag: &Bag,
        ctx: &dyn EvaluationCtx,
    ) -> Result<bool, Status> {
        for b in bag {
            if !self.apply(function, a, b, ctx)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn run(&self, inputs: &[Expression], ctx: &dyn EvaluationCtx) -> Result<bool, Status> {
        let Some(Expression::Function(function)) = inputs.first() else {
            return Err(Status::processing_error(format!(
                "{} requires a function argument",
                self.id
            )));
        };
        let args = eval_args(&inputs[1..], ctx)?;
        let second = bag_arg(&args, 1)?;

        if self.quantifier.takes_single_value() {
            let first = value_arg(&args, 0)?;
            return match self.quantifier {
                Quantifier::AnyOf => self.any_in(function, first, second, ctx),
                _ => self.all_in(function, first, second, ctx),
            };
        }

        let first = bag_arg(&args, 0)?;
        match self.quantifier {
            Quantifier::AnyOfAny => {
                for a in first {
                    if self.any_in(function, a, second, ctx)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Quantifier::AllOfAny => {
                for a in first {
                    if !self.any_in(function, a, second, ctx)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Quantifier::AnyOfAll => {
                for a in first {
                    if self.all_in(function, a, second, ctx)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            _ => {
                for a in first {
                    if !self.all_in(function, a, second, ctx)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }
}

/// A value of the given type, used only to type-check the applied function.
fn placeholder(data_type: &str) -> AttributeValue {
    match data_type {
        types::STRING => AttributeValue::string(""),
        types::BOOLEAN => AttributeValue::Boolean(false),
        types::INTEGER => AttributeValue::Integer(0),
        types::DOUBLE => AttributeValue::Double(0.0),
        types::ANY_URI => AttributeValue::any_uri(""),
        types::HEX_BINARY => AttributeValue::HexBinary(Vec::new()),
        types::BASE64_BINARY => AttributeValue::Base64Binary(Vec::new()),
        types::DATE => AttributeValue::Date(DateTime::<Utc>::MIN_UTC.date_naive()),
        types::TIME => AttributeValue::Time(DateTime::<Utc>::MIN_UTC.time()),
        types::DATE_TIME => AttributeValue::DateTime(DateTime::<Utc>::MIN_UTC),
        other => AttributeValue::Other {
            data_type: other.to_string(),
            text: String::new(),
        },
    }
}

impl Function for HigherOrderFunction {
    fn identifier(&self) -> &str {
        &self.id
    }

    fn return_type(&self) -> &str {
        types::BOOLEAN
    }

    fn returns_bag(&self) -> bool {
        false
    }

    fn check_inputs(&self, inputs: &[Expression]) -> Result<(), ParsingError> {
        self.check(inputs, false)
    }

    fn check_inputs_no_bag(&self, inputs: &[Expression]) -> Result<(), ParsingError> {
        self.check(inputs, true)
    }

    fn evaluate(&self, inputs: &[Expression], ctx: &dyn EvaluationCtx) -> EvaluationResult {
        self.run(inputs, ctx).map(EvaluationResult::boolean).into()
    }
}

pub(crate) fn register(registry: &mut FunctionRegistry) {
    for quantifier in Quantifier::ALL {
        registry.register_condition(Arc::new(HigherOrderFunction::new(quantifier)));
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{call, int};
    use super::*;

    fn function(short: &str) -> Expression {
        let registry = FunctionRegistry::standard();
        Expression::Function(
            registry
                .condition_function(&format!("{}{}", FUNCTION_NS_1, short))
                .unwrap(),
        )
    }

    fn int_bag(values: &[i64]) -> Expression {
        let registry = FunctionRegistry::standard();
        let f = registry
            .condition_function(&format!("{}integer-bag", FUNCTION_NS_1))
            .unwrap();
        let args = values.iter().map(|i| int(*i)).collect();
        Expression::Apply(crate::expr::Apply::new(f, args).unwrap())
    }

    #[test]
    fn any_of_and_all_of() {
        let eq = || function("integer-equal");
        assert_eq!(call("any-of", vec![eq(), int(2), int_bag(&[1, 2])]).as_bool(), Some(true));
        assert_eq!(call("all-of", vec![eq(), int(2), int_bag(&[1, 2])]).as_bool(), Some(false));
        let gt = || function("integer-greater-than");
        assert_eq!(call("all-of", vec![gt(), int(5), int_bag(&[1, 2])]).as_bool(), Some(true));
    }

    #[test]
    fn bag_against_bag() {
        let gt = || function("integer-greater-than");
        let a = || int_bag(&[3, 10]);
        let b = || int_bag(&[5, 7]);
        assert_eq!(call("any-of-any", vec![gt(), a(), b()]).as_bool(), Some(true));
        assert_eq!(call("all-of-any", vec![gt(), a(), b()]).as_bool(), Some(false));
        assert_eq!(call("any-of-all", vec![gt(), a(), b()]).as_bool(), Some(true));
        assert_eq!(call("all-of-all", vec![gt(), a(), b()]).as_bool(), Some(false));
    }

    #[test]
    fn function_argument_must_be_boolean() {
        let registry = FunctionRegistry::standard();
        let any_of = registry
            .condition_function(&format!("{}any-of", FUNCTION_NS_1))
            .unwrap();
        let inputs = vec![function("integer-add"), int(1), int_bag(&[1])];
        assert!(any_of.check_inputs(&inputs).is_err());
    }
}
