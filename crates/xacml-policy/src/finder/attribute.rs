// finder/attribute.rs — Attributes the request itself does not carry.

use std::sync::Arc;

use crate::attr::Bag;
use crate::ctx::{Category, EvaluationCtx};
use crate::expr::EvaluationResult;

/// Resolves an attribute designator the request could not satisfy.
///
/// Implementations return an empty bag when they know nothing, and
/// INDETERMINATE only for genuine lookup failures.
pub trait AttributeFinder: Send + Sync {
    fn find_attribute(
        &self,
        category: Category,
        data_type: &str,
        id: &str,
        issuer: Option<&str>,
        subject_category: Option<&str>,
        ctx: &dyn EvaluationCtx,
    ) -> EvaluationResult;
}

/// Asks each finder in order. The first non-empty bag wins; the first
/// failure aborts the search.
#[derive(Default)]
pub struct ChainedAttributeFinder {
    finders: Vec<Arc<dyn AttributeFinder>>,
}

impl ChainedAttributeFinder {
    pub fn new(finders: Vec<Arc<dyn AttributeFinder>>) -> Self {
        Self { finders }
    }

    pub fn push(&mut self, finder: Arc<dyn AttributeFinder>) {
        self.finders.push(finder);
    }

    pub fn len(&self) -> usize {
        self.finders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.finders.is_empty()
    }
}

impl AttributeFinder for ChainedAttributeFinder {
    fn find_attribute(
        &self,
        category: Category,
        data_type: &str,
        id: &str,
        issuer: Option<&str>,
        subject_category: Option<&str>,
        ctx: &dyn EvaluationCtx,
    ) -> EvaluationResult {
        for finder in &self.finders {
            let result =
                finder.find_attribute(category, data_type, id, issuer, subject_category, ctx);
            match &result {
                EvaluationResult::Indeterminate(status) => {
                    tracing::warn!(attribute = id, %status, "attribute finder failed");
                    return result;
                }
                EvaluationResult::Bag(bag) if bag.is_empty() => {}
                _ => return result,
            }
        }
        EvaluationResult::Bag(Bag::empty(data_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::{types, AttributeValue};
    use crate::ctx::{BasicEvaluationCtx, RequestCtx};
    use crate::status::Status;

    struct Fixed(EvaluationResult);

    impl AttributeFinder for Fixed {
        fn find_attribute(
            &self,
            _category: Category,
            _data_type: &str,
            _id: &str,
            _issuer: Option<&str>,
            _subject_category: Option<&str>,
            _ctx: &dyn EvaluationCtx,
        ) -> EvaluationResult {
            self.0.clone()
        }
    }

    fn ctx() -> BasicEvaluationCtx {
        BasicEvaluationCtx::new(RequestCtx::new().with_resource_id("doc"), None).unwrap()
    }

    fn ask(chain: &ChainedAttributeFinder) -> EvaluationResult {
        chain.find_attribute(Category::Subject, types::STRING, "role", None, None, &ctx())
    }

    #[test]
    fn first_non_empty_bag_wins() {
        let chain = ChainedAttributeFinder::new(vec![
            Arc::new(Fixed(EvaluationResult::Bag(Bag::empty(types::STRING)))),
            Arc::new(Fixed(EvaluationResult::Bag(Bag::single(AttributeValue::string("admin"))))),
            Arc::new(Fixed(EvaluationResult::Indeterminate(Status::processing_error("late")))),
        ]);
        let bag = ask(&chain);
        assert_eq!(bag.as_bag().map(|b| b.len()), Some(1));
    }

    #[test]
    fn failure_aborts_the_chain() {
        let chain = ChainedAttributeFinder::new(vec![
            Arc::new(Fixed(EvaluationResult::Indeterminate(Status::processing_error("down")))),
            Arc::new(Fixed(EvaluationResult::Bag(Bag::single(AttributeValue::string("admin"))))),
        ]);
        assert!(ask(&chain).indeterminate());
    }

    #[test]
    fn empty_chain_yields_empty_bag() {
        let result = ask(&ChainedAttributeFinder::default());
        assert!(result.as_bag().map_or(false, |b| b.is_empty()));
    }
}
