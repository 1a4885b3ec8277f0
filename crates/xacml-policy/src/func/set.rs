// func/set.rs — Set operations over bags.
//
// Bags are treated as sets here: intersection and union drop duplicate
// members.

use std::sync::Arc;

use crate::attr::{types, AttributeValue, Bag, STANDARD_TYPES};
use crate::ctx::EvaluationCtx;
use crate::error::ParsingError;
use crate::expr::{EvaluationResult, Expression};
use crate::status::Status;

use super::{bag_arg, eval_args, Function, FunctionRegistry, Param, Signature, FUNCTION_NS_1};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOp {
    Intersection,
    Union,
    AtLeastOneMemberOf,
    Subset,
    SetEquals,
}

impl SetOp {
    const ALL: [SetOp; 5] = [
        SetOp::Intersection,
        SetOp::Union,
        SetOp::AtLeastOneMemberOf,
        SetOp::Subset,
        SetOp::SetEquals,
    ];

    fn suffix(&self) -> &'static str {
        match self {
            SetOp::Intersection => "intersection",
            SetOp::Union => "union",
            SetOp::AtLeastOneMemberOf => "at-least-one-member-of",
            SetOp::Subset => "subset",
            SetOp::SetEquals => "set-equals",
        }
    }
}

#[derive(Debug)]
pub struct SetFunction {
    signature: Signature,
    op: SetOp,
    data_type: String,
}

impl SetFunction {
    pub fn new(short: &str, data_type: &str, op: SetOp) -> Self {
        let id = format!("{}{}-{}", FUNCTION_NS_1, short, op.suffix());
        let params = vec![Param::bag(data_type), Param::bag(data_type)];
        let signature = match op {
            SetOp::Intersection | SetOp::Union => {
                Signature::new(id, data_type, params).returning_bag()
            }
            _ => Signature::new(id, types::BOOLEAN, params),
        };
        Self {
            signature,
            op,
            data_type: data_type.to_string(),
        }
    }

    fn run(&self, args: &[EvaluationResult]) -> Result<EvaluationResult, Status> {
        let a = bag_arg(args, 0)?;
        let b = bag_arg(args, 1)?;
        Ok(match self.op {
            SetOp::Intersection => {
                let members = distinct(a.iter().filter(|v| b.contains(v)));
                EvaluationResult::Bag(Bag::new(self.data_type.clone(), members))
            }
            SetOp::Union => {
                let members = distinct(a.iter().chain(b.iter()));
                EvaluationResult::Bag(Bag::new(self.data_type.clone(), members))
            }
            SetOp::AtLeastOneMemberOf => EvaluationResult::boolean(a.iter().any(|v| b.contains(v))),
            SetOp::Subset => EvaluationResult::boolean(a.iter().all(|v| b.contains(v))),
            SetOp::SetEquals => EvaluationResult::boolean(a.same_members(b)),
        })
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a AttributeValue>) -> Vec<AttributeValue> {
    let mut out: Vec<AttributeValue> = Vec::new();
    for value in values {
        if !out.contains(value) {
            out.push(value.clone());
        }
    }
    out
}

impl Function for SetFunction {
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
        for op in SetOp::ALL {
            registry.register_condition(Arc::new(SetFunction::new(short, uri, op)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{call, int};
    use super::*;

    fn int_bag(values: &[i64]) -> Expression {
        let registry = FunctionRegistry::standard();
        let f = registry
            .condition_function(&format!("{}integer-bag", FUNCTION_NS_1))
            .unwrap();
        let args = values.iter().map(|i| int(*i)).collect();
        Expression::Apply(crate::expr::Apply::new(f, args).unwrap())
    }

    #[test]
    fn intersection_and_union_are_distinct() {
        match call("integer-intersection", vec![int_bag(&[1, 2, 2, 3]), int_bag(&[2, 3, 4])]) {
            EvaluationResult::Bag(bag) => assert_eq!(bag.len(), 2),
            other => panic!("expected bag, got {:?}", other),
        }
        match call("integer-union", vec![int_bag(&[1, 1]), int_bag(&[2])]) {
            EvaluationResult::Bag(bag) => assert_eq!(bag.len(), 2),
            other => panic!("expected bag, got {:?}", other),
        }
    }

    #[test]
    fn membership_predicates() {
        assert_eq!(
            call("integer-at-least-one-member-of", vec![int_bag(&[1, 9]), int_bag(&[9])]).as_bool(),
            Some(true)
        );
        assert_eq!(
            call("integer-subset", vec![int_bag(&[1, 2]), int_bag(&[2, 1, 3])]).as_bool(),
            Some(true)
        );
        assert_eq!(
            call("integer-set-equals", vec![int_bag(&[1, 2]), int_bag(&[2, 1, 1])]).as_bool(),
            Some(true)
        );
        assert_eq!(
            call("integer-set-equals", vec![int_bag(&[1]), int_bag(&[1, 2])]).as_bool(),
            Some(false)
        );
    }
}
