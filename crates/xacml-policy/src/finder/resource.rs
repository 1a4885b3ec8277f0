// finder/resource.rs — Expansion of Children / Descendants scopes.

use std::sync::Arc;

use crate::attr::AttributeValue;
use crate::ctx::EvaluationCtx;
use crate::status::Status;

/// Resources found under a parent, plus the ones that could not be
/// examined and why.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceFinderResult {
    pub resources: Vec<AttributeValue>,
    pub failures: Vec<(AttributeValue, Status)>,
}

impl ResourceFinderResult {
    pub fn new(resources: Vec<AttributeValue>) -> Self {
        Self {
            resources,
            failures: Vec::new(),
        }
    }

    pub fn with_failure(mut self, resource: AttributeValue, status: Status) -> Self {
        self.failures.push((resource, status));
        self
    }

    /// Nothing found and nothing failed.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.failures.is_empty()
    }
}

pub trait ResourceFinder: Send + Sync {
    fn find_child_resources(&self, parent: &AttributeValue, ctx: &dyn EvaluationCtx)
        -> ResourceFinderResult;

    fn find_descendant_resources(
        &self,
        parent: &AttributeValue,
        ctx: &dyn EvaluationCtx,
    ) -> ResourceFinderResult;
}

/// Asks each finder in order and returns the first non-empty answer.
#[derive(Default)]
pub struct ChainedResourceFinder {
    finders: Vec<Arc<dyn ResourceFinder>>,
}

impl ChainedResourceFinder {
    pub fn new(finders: Vec<Arc<dyn ResourceFinder>>) -> Self {
        Self { finders }
    }

    pub fn push(&mut self, finder: Arc<dyn ResourceFinder>) {
        self.finders.push(finder);
    }

    fn first<F>(&self, ask: F) -> ResourceFinderResult
    where
        F: Fn(&dyn ResourceFinder) -> ResourceFinderResult,
    {
        self.finders
            .iter()
            .map(|f| ask(f.as_ref()))
            .find(|r| !r.is_empty())
            .unwrap_or_default()
    }
}

impl ResourceFinder for ChainedResourceFinder {
    fn find_child_resources(
        &self,
        parent: &AttributeValue,
        ctx: &dyn EvaluationCtx,
    ) -> ResourceFinderResult {
        self.first(|f| f.find_child_resources(parent, ctx))
    }

    fn find_descendant_resources(
        &self,
        parent: &AttributeValue,
        ctx: &dyn EvaluationCtx,
    ) -> ResourceFinderResult {
        self.first(|f| f.find_descendant_resources(parent, ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ctx::{BasicEvaluationCtx, RequestCtx};

    struct Children(Vec<&'static str>);

    impl ResourceFinder for Children {
        fn find_child_resources(
            &self,
            _: &AttributeValue,
            _: &dyn EvaluationCtx,
        ) -> ResourceFinderResult {
            ResourceFinderResult::new(self.0.iter().map(|s| AttributeValue::string(*s)).collect())
        }

        fn find_descendant_resources(
            &self,
            _: &AttributeValue,
            _: &dyn EvaluationCtx,
        ) -> ResourceFinderResult {
            ResourceFinderResult::default()
        }
    }

    #[test]
    fn chain_skips_empty_answers() {
        let ctx =
            BasicEvaluationCtx::new(RequestCtx::new().with_resource_id("root"), None).unwrap();
        let chain = ChainedResourceFinder::new(vec![
            Arc::new(Children(vec![])),
            Arc::new(Children(vec!["a", "b"])),
        ]);
        let parent = AttributeValue::string("root");
        assert_eq!(chain.find_child_resources(&parent, &ctx).resources.len(), 2);
        assert!(chain.find_descendant_resources(&parent, &ctx).is_empty());
    }
}
