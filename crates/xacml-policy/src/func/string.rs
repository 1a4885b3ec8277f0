// func/string.rs — String normalisation, concatenation and regexp matching.
//
// `*-regexp-match` takes the pattern first and searches the second
// argument; a pattern is not implicitly anchored. A pattern that does not
// compile is a processing error at evaluation time, because the pattern
// may itself come from the request.

use std::sync::Arc;

use regex::Regex;

use crate::attr::{types, AttributeValue};
use crate::ctx::EvaluationCtx;
use crate::error::ParsingError;
use crate::expr::{EvaluationResult, Expression};
use crate::status::Status;

use super::{
    eval_args, value_arg, wrong_type, Function, FunctionRegistry, Param, Signature, FUNCTION_NS_1,
    FUNCTION_NS_2,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringOp {
    NormalizeSpace,
    NormalizeToLowerCase,
    Concatenate,
    /// Regexp match against a string.
    RegexpMatch,
    /// Regexp match against an anyURI.
    UriRegexpMatch,
}

#[derive(Debug)]
pub struct StringFunction {
    signature: Signature,
    op: StringOp,
}

impl StringFunction {
    pub fn new(op: StringOp) -> Self {
        let string = || Param::value(types::STRING);
        let signature = match op {
            StringOp::NormalizeSpace => Signature::new(
                format!("{}string-normalize-space", FUNCTION_NS_1),
                types::STRING,
                vec![string()],
            ),
            StringOp::NormalizeToLowerCase => Signature::new(
                format!("{}string-normalize-to-lower-case", FUNCTION_NS_1),
                types::STRING,
                vec![string()],
            ),
            StringOp::Concatenate => Signature::new(
                format!("{}string-concatenate", FUNCTION_NS_2),
                types::STRING,
                vec![string()],
            )
            .variadic(2),
            StringOp::RegexpMatch => Signature::new(
                format!("{}string-regexp-match", FUNCTION_NS_1),
                types::BOOLEAN,
                vec![string(), string()],
            ),
            StringOp::UriRegexpMatch => Signature::new(
                format!("{}anyURI-regexp-match", FUNCTION_NS_2),
                types::BOOLEAN,
                vec![string(), Param::value(types::ANY_URI)],
            ),
        };
        Self { signature, op }
    }

    fn text<'a>(&self, value: &'a AttributeValue) -> Result<&'a str, Status> {
        value.as_str().ok_or_else(|| wrong_type(self.signature.id(), value))
    }

    fn run(&self, args: &[EvaluationResult]) -> Result<EvaluationResult, Status> {
        match self.op {
            StringOp::NormalizeSpace => {
                let text = self.text(value_arg(args, 0)?)?;
                Ok(EvaluationResult::Value(AttributeValue::string(text.trim())))
            }
            StringOp::NormalizeToLowerCase => {
                let text = self.text(value_arg(args, 0)?)?;
                Ok(EvaluationResult::Value(AttributeValue::string(text.to_lowercase())))
            }
            StringOp::Concatenate => {
                let mut out = String::new();
                for i in 0..args.len() {
                    out.push_str(self.text(value_arg(args, i)?)?);
                }
                Ok(EvaluationResult::Value(AttributeValue::String(out)))
            }
            StringOp::RegexpMatch | StringOp::UriRegexpMatch => {
                let pattern = self.text(value_arg(args, 0)?)?;
                let subject = self.text(value_arg(args, 1)?)?;
                let regex = Regex::new(pattern).map_err(|e| {
                    Status::processing_error(format!(
                        "invalid regular expression '{}': {}",
                        pattern, e
                    ))
                })?;
                Ok(EvaluationResult::boolean(regex.is_match(subject)))
            }
        }
    }
}

impl Function for StringFunction {
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
    registry.register_target(Arc::new(StringFunction::new(StringOp::RegexpMatch)));
    registry.register_target(Arc::new(StringFunction::new(StringOp::UriRegexpMatch)));
    for op in [
        StringOp::NormalizeSpace,
        StringOp::NormalizeToLowerCase,
        StringOp::Concatenate,
    ] {
        registry.register_condition(Arc::new(StringFunction::new(op)));
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{call, s, v};
    use super::*;

    #[test]
    fn normalisation() {
        assert_eq!(
            call("string-normalize-space", vec![s("  a b  ")]).as_value(),
            Some(&AttributeValue::string("a b"))
        );
        assert_eq!(
            call("string-normalize-to-lower-case", vec![s("ABC")]).as_value(),
            Some(&AttributeValue::string("abc"))
        );
    }

    #[test]
    fn concatenate_is_a_2_0_function() {
        assert_eq!(
            call("string-concatenate", vec![s("a"), s("b"), s("c")]).as_value(),
            Some(&AttributeValue::string("abc"))
        );
    }

    #[test]
    fn regexp_match_searches() {
        assert_eq!(
            call("string-regexp-match", vec![s("ad.*n"), s("sysadmin")]).as_bool(),
            Some(true)
        );
        assert_eq!(
            call("string-regexp-match", vec![s("^ad"), s("sysadmin")]).as_bool(),
            Some(false)
        );
        assert_eq!(
            call(
                "anyURI-regexp-match",
                vec![s("^https://"), v(AttributeValue::any_uri("https://example.org"))]
            )
            .as_bool(),
            Some(true)
        );
    }

    #[test]
    fn bad_pattern_is_indeterminate() {
        assert!(call("string-regexp-match", vec![s("("), s("x")]).indeterminate());
    }
}
