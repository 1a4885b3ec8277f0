// func/mod.rs — The function library and its registry.
//
// Every function is strongly typed: it declares its argument types and
// bag-ness, and `check_inputs` rejects ill-typed argument lists when a
// policy is read. At evaluation time arguments are evaluated in order and
// the first INDETERMINATE one ends the call.
//
// `FunctionRegistry` replaces a process-wide function factory. It has two
// tiers: functions usable in target matches (equality, comparison and
// regexp matching) and the full set usable in conditions.

mod arithmetic;
mod bag;
mod comparison;
mod equality;
mod higher_order;
mod logical;
mod set;
mod string;

pub use arithmetic::{ArithmeticFunction, ArithmeticOp};
pub use bag::{BagFunction, BagOp};
pub use comparison::{ComparisonFunction, ComparisonOp};
pub use equality::EqualityFunction;
pub use higher_order::{HigherOrderFunction, Quantifier};
pub use logical::{LogicalFunction, LogicalOp};
pub use set::{SetFunction, SetOp};
pub use string::{StringFunction, StringOp};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::attr::{AttributeValue, Bag};
use crate::ctx::EvaluationCtx;
use crate::error::ParsingError;
use crate::expr::{EvaluationResult, Expression};
use crate::status::Status;

/// Prefix of XACML 1.0 function identifiers.
pub const FUNCTION_NS_1: &str = "urn:oasis:names:tc:xacml:1.0:function:";
/// Prefix of functions added in XACML 2.0.
pub const FUNCTION_NS_2: &str = "urn:oasis:names:tc:xacml:2.0:function:";

/// A function callable from `Apply`, target matches and higher-order
/// functions.
pub trait Function: Send + Sync + fmt::Debug {
    fn identifier(&self) -> &str;

    /// Datatype URI of the result (or of the result bag's members).
    fn return_type(&self) -> &str;

    fn returns_bag(&self) -> bool;

    /// Reject an argument list that does not fit this function.
    fn check_inputs(&self, inputs: &[Expression]) -> Result<(), ParsingError>;

    /// Like `check_inputs`, but treat bag arguments as single values of
    /// their member type. Target matches call their function once per bag
    /// member, so they check with this.
    fn check_inputs_no_bag(&self, inputs: &[Expression]) -> Result<(), ParsingError>;

    fn evaluate(&self, inputs: &[Expression], ctx: &dyn EvaluationCtx) -> EvaluationResult;
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Param {
    data_type: String,
    bag: bool,
}

impl Param {
    pub(crate) fn value(data_type: &str) -> Self {
        Self {
            data_type: data_type.to_string(),
            bag: false,
        }
    }

    pub(crate) fn bag(data_type: &str) -> Self {
        Self {
            data_type: data_type.to_string(),
            bag: true,
        }
    }
}

/// Identifier, result type and parameter list of a function, with the
/// shared argument checking.
#[derive(Debug, Clone)]
pub(crate) struct Signature {
    id: String,
    return_type: String,
    returns_bag: bool,
    params: Vec<Param>,
    /// When set, the last parameter repeats and at least this many
    /// arguments are required.
    variadic_min: Option<usize>,
}

impl Signature {
    pub(crate) fn new(id: impl Into<String>, return_type: &str, params: Vec<Param>) -> Self {
        Self {
            id: id.into(),
            return_type: return_type.to_string(),
            returns_bag: false,
            params,
            variadic_min: None,
        }
    }

    pub(crate) fn returning_bag(mut self) -> Self {
        self.returns_bag = true;
        self
    }

    pub(crate) fn variadic(mut self, min: usize) -> Self {
        self.variadic_min = Some(min);
        self
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn return_type(&self) -> &str {
        &self.return_type
    }

    pub(crate) fn returns_bag(&self) -> bool {
        self.returns_bag
    }

    pub(crate) fn mismatch(&self, reason: impl Into<String>) -> ParsingError {
        ParsingError::TypeMismatch {
            function: self.id.clone(),
            reason: reason.into(),
        }
    }

    pub(crate) fn check(
        &self,
        inputs: &[Expression],
        ignore_bags: bool,
    ) -> Result<(), ParsingError> {
        match self.variadic_min {
            Some(min) => {
                if inputs.len() < min.max(self.params.len().saturating_sub(1)) {
                    return Err(self.mismatch(format!(
                        "expected at least {} arguments, got {}",
                        min,
                        inputs.len()
                    )));
                }
            }
            None => {
                if inputs.len() != self.params.len() {
                    return Err(self.mismatch(format!(
                        "expected {} arguments, got {}",
                        self.params.len(),
                        inputs.len()
                    )));
                }
            }
        }

        for (i, input) in inputs.iter().enumerate() {
            let param = &self.params[i.min(self.params.len().saturating_sub(1))];
            if let Expression::Function(f) = input {
                return Err(self.mismatch(format!(
                    "argument {} is the function {}, not a value",
                    i + 1,
                    f.identifier()
                )));
            }
            if input.return_type() != param.data_type {
                return Err(self.mismatch(format!(
                    "argument {} must be {}, found {}",
                    i + 1,
                    param.data_type,
                    input.return_type()
                )));
            }
            if !ignore_bags && input.returns_bag() != param.bag {
                return Err(self.mismatch(format!(
                    "argument {} must be a {}",
                    i + 1,
                    if param.bag { "bag" } else { "single value" }
                )));
            }
        }
        Ok(())
    }
}

/// Evaluate every argument in order, stopping at the first INDETERMINATE.
pub(crate) fn eval_args(
    inputs: &[Expression],
    ctx: &dyn EvaluationCtx,
) -> Result<Vec<EvaluationResult>, Status> {
    let mut results = Vec::with_capacity(inputs.len());
    for input in inputs {
        match input.evaluate(ctx) {
            EvaluationResult::Indeterminate(status) => return Err(status),
            other => results.push(other),
        }
    }
    Ok(results)
}

pub(crate) fn value_arg<'a>(
    args: &'a [EvaluationResult],
    i: usize,
) -> Result<&'a AttributeValue, Status> {
    args.get(i)
        .and_then(EvaluationResult::as_value)
        .ok_or_else(|| {
            Status::processing_error(format!("argument {} is not a single value", i + 1))
        })
}

pub(crate) fn bag_arg(args: &[EvaluationResult], i: usize) -> Result<&Bag, Status> {
    args.get(i)
        .and_then(EvaluationResult::as_bag)
        .ok_or_else(|| Status::processing_error(format!("argument {} is not a bag", i + 1)))
}

/// Argument that failed an unexpected runtime type check.
pub(crate) fn wrong_type(id: &str, value: &AttributeValue) -> Status {
    Status::processing_error(format!(
        "{} cannot operate on a value of type {}",
        id,
        value.data_type()
    ))
}

/// Two-tier function table.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    target: HashMap<String, Arc<dyn Function>>,
    condition: HashMap<String, Arc<dyn Function>>,
}

impl FunctionRegistry {
    /// A registry with no functions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in function, target-capable ones in both tiers.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        equality::register(&mut registry);
        comparison::register(&mut registry);
        string::register(&mut registry);
        logical::register(&mut registry);
        arithmetic::register(&mut registry);
        bag::register(&mut registry);
        set::register(&mut registry);
        higher_order::register(&mut registry);
        registry
    }

    /// Register a function usable in target matches (and conditions).
    pub fn register_target(&mut self, function: Arc<dyn Function>) {
        let id = function.identifier().to_string();
        self.condition.insert(id.clone(), function.clone());
        self.target.insert(id, function);
    }

    /// Register a function usable only in conditions.
    pub fn register_condition(&mut self, function: Arc<dyn Function>) {
        self.condition
            .insert(function.identifier().to_string(), function);
    }

    pub fn target_function(&self, id: &str) -> Result<Arc<dyn Function>, ParsingError> {
        self.target
            .get(id)
            .cloned()
            .ok_or_else(|| ParsingError::UnknownFunction(id.to_string()))
    }

    pub fn condition_function(&self, id: &str) -> Result<Arc<dyn Function>, ParsingError> {
        self.condition
            .get(id)
            .cloned()
            .ok_or_else(|| ParsingError::UnknownFunction(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.condition.len()
    }

    pub fn is_empty(&self) -> bool {
        self.condition.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::ctx::{BasicEvaluationCtx, RequestCtx};

    pub(crate) fn ctx() -> BasicEvaluationCtx {
        BasicEvaluationCtx::new(RequestCtx::new().with_resource_id("r"), None).unwrap()
    }

    /// Look up `short` (1.0 or 2.0 namespace) and apply it to `args`.
    pub(crate) fn call(short: &str, args: Vec<Expression>) -> EvaluationResult {
        let registry = FunctionRegistry::standard();
        let function = registry
            .condition_function(&format!("{}{}", FUNCTION_NS_1, short))
            .or_else(|_| registry.condition_function(&format!("{}{}", FUNCTION_NS_2, short)))
            .unwrap();
        function.check_inputs(&args).unwrap();
        function.evaluate(&args, &ctx())
    }

    pub(crate) fn v(value: AttributeValue) -> Expression {
        Expression::Value(value)
    }

    pub(crate) fn int(i: i64) -> Expression {
        v(AttributeValue::Integer(i))
    }

    pub(crate) fn s(text: &str) -> Expression {
        v(AttributeValue::string(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::types;

    #[test]
    fn target_tier_is_a_subset() {
        let registry = FunctionRegistry::standard();
        let id = format!("{}string-equal", FUNCTION_NS_1);
        assert!(registry.target_function(&id).is_ok());
        assert!(registry.condition_function(&id).is_ok());

        let add = format!("{}integer-add", FUNCTION_NS_1);
        assert!(registry.condition_function(&add).is_ok());
        assert!(matches!(
            registry.target_function(&add),
            Err(ParsingError::UnknownFunction(_))
        ));
    }

    #[test]
    fn variadic_signature_checks_minimum() {
        let sig =
            Signature::new("f", types::INTEGER, vec![Param::value(types::INTEGER)]).variadic(2);
        let one = vec![Expression::Value(AttributeValue::Integer(1))];
        assert!(sig.check(&one, false).is_err());
        let three = vec![Expression::Value(AttributeValue::Integer(1)); 3];
        assert!(sig.check(&three, false).is_ok());
    }

    #[test]
    fn no_bag_check_accepts_bag_arguments() {
        use crate::ctx::Category;
        use crate::expr::AttributeDesignator;

        let sig = Signature::new(
            "f",
            types::BOOLEAN,
            vec![Param::value(types::STRING), Param::value(types::STRING)],
        );
        let inputs = vec![
            Expression::Value(AttributeValue::string("a")),
            Expression::Designator(AttributeDesignator::new(
                Category::Subject,
                types::STRING,
                "id",
            )),
        ];
        assert!(sig.check(&inputs, false).is_err());
        assert!(sig.check(&inputs, true).is_ok());
    }
}
