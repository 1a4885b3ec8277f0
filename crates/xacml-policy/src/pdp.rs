// pdp.rs — The policy decision point.
//
// A `Pdp` holds only its collaborators, so one instance serves any number
// of threads. All per-request state lives in the `BasicEvaluationCtx`
// built for that request, which is never shared: scope expansion rewrites
// its resource id between evaluations.
//
// The PDP always answers. A request that cannot be turned into a context
// yields one INDETERMINATE result with a syntax-error status.

use std::fmt;
use std::sync::Arc;

use crate::ctx::{BasicEvaluationCtx, EvaluationCtx, RequestCtx, Scope};
use crate::finder::{AttributeFinder, PolicyFinder, PolicyFinderResult, ResourceFinder};
use crate::result::{DecisionResult, ResponseCtx};
use crate::status::Status;

/// Collaborators wired into a `Pdp`.
#[derive(Clone, Default)]
pub struct PdpConfig {
    pub policy_finder: Option<Arc<dyn PolicyFinder>>,
    pub attribute_finder: Option<Arc<dyn AttributeFinder>>,
    pub resource_finder: Option<Arc<dyn ResourceFinder>>,
}

impl PdpConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy_finder(mut self, finder: Arc<dyn PolicyFinder>) -> Self {
        self.policy_finder = Some(finder);
        self
    }

    pub fn with_attribute_finder(mut self, finder: Arc<dyn AttributeFinder>) -> Self {
        self.attribute_finder = Some(finder);
        self
    }

    pub fn with_resource_finder(mut self, finder: Arc<dyn ResourceFinder>) -> Self {
        self.resource_finder = Some(finder);
        self
    }
}

impl fmt::Debug for PdpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdpConfig")
            .field("policy_finder", &self.policy_finder.is_some())
            .field("attribute_finder", &self.attribute_finder.is_some())
            .field("resource_finder", &self.resource_finder.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Pdp {
    config: PdpConfig,
}

impl Pdp {
    pub fn new(config: PdpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PdpConfig {
        &self.config
    }

    /// Evaluate a decoded request, expanding its scope if needed.
    pub fn evaluate(&self, request: RequestCtx) -> ResponseCtx {
        let mut ctx = match BasicEvaluationCtx::new(request, self.config.attribute_finder.clone()) {
            Ok(ctx) => ctx,
            Err(err) => {
                tracing::warn!(error = %err, "rejecting request");
                return ResponseCtx::single(DecisionResult::indeterminate(Status::syntax_error(
                    err.to_string(),
                )));
            }
        };

        let span = tracing::debug_span!("evaluate", request = %ctx.request_id());
        let _guard = span.enter();

        match ctx.scope() {
            Scope::Immediate => {
                let resource = ctx.resource_id().encode();
                ResponseCtx::single(self.evaluate_context(&ctx).with_resource(resource))
            }
            scope => self.evaluate_scope(&mut ctx, scope),
        }
    }

    fn evaluate_scope(&self, ctx: &mut BasicEvaluationCtx, scope: Scope) -> ResponseCtx {
        let Some(finder) = &self.config.resource_finder else {
            return ResponseCtx::single(DecisionResult::indeterminate(Status::processing_error(
                "no resource finder configured for a multi-resource request",
            )));
        };

        let parent = ctx.resource_id().clone();
        let found = match scope {
            Scope::Children => finder.find_child_resources(&parent, &*ctx),
            _ => finder.find_descendant_resources(&parent, &*ctx),
        };
        if found.is_empty() {
            tracing::debug!(resource = %parent.encode(), "scope expanded to nothing");
            return ResponseCtx::single(DecisionResult::indeterminate(Status::processing_error(
                "couldn't find any resources",
            )));
        }

        let mut results = Vec::with_capacity(found.resources.len() + found.failures.len());
        for resource in found.resources {
            let encoded = resource.encode();
            ctx.set_resource_id(resource);
            results.push(self.evaluate_context(&*ctx).with_resource(encoded));
        }
        for (resource, status) in found.failures {
            results.push(DecisionResult::indeterminate(status).with_resource(resource.encode()));
        }
        ResponseCtx::new(results)
    }

    /// Find the applicable policy and evaluate it against one resource.
    pub fn evaluate_context(&self, ctx: &dyn EvaluationCtx) -> DecisionResult {
        let Some(finder) = &self.config.policy_finder else {
            return DecisionResult::not_applicable();
        };
        match finder.find_policy(ctx) {
            PolicyFinderResult::NotApplicable => DecisionResult::not_applicable(),
            PolicyFinderResult::Indeterminate(status) => DecisionResult::indeterminate(status),
            PolicyFinderResult::Found(policy) => policy.evaluate(ctx),
        }
    }

    /// JSON request in, JSON response out. Malformed input is answered,
    /// not rejected.
    pub fn evaluate_json(&self, input: &str) -> String {
        let response = match serde_json::from_str::<RequestCtx>(input) {
            Ok(request) => self.evaluate(request),
            Err(err) => {
                tracing::warn!(error = %err, "malformed request document");
                ResponseCtx::single(DecisionResult::indeterminate(Status::syntax_error(
                    err.to_string(),
                )))
            }
        };
        encode_response(&response)
    }
}

fn encode_response(response: &ResponseCtx) -> String {
    serde_json::to_string_pretty(response).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "response could not be encoded");
        String::from(r#"{"results":[{"decision":"indeterminate"}]}"#)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::AttributeValue;
    use crate::combine::{ids, CombiningAlgRegistry};
    use crate::ctx::RESOURCE_SCOPE;
    use crate::finder::{
        MemoryPolicyModule, ModularPolicyFinder, PolicyFinderModule, ResourceFinderResult,
    };
    use crate::policy::Policy;
    use crate::result::{Decision, Effect};
    use crate::rule::Rule;
    use crate::status::{STATUS_PROCESSING_ERROR, STATUS_SYNTAX_ERROR};
    use crate::target::Target;

    struct Tree;

    impl ResourceFinder for Tree {
        fn find_child_resources(
            &self,
            parent: &AttributeValue,
            _ctx: &dyn EvaluationCtx,
        ) -> ResourceFinderResult {
            match parent.as_str() {
                Some("root") => ResourceFinderResult::new(vec![
                    AttributeValue::string("root/a"),
                    AttributeValue::string("root/b"),
                ])
                .with_failure(AttributeValue::string("root/c"), Status::processing_error("locked")),
                _ => ResourceFinderResult::default(),
            }
        }

        fn find_descendant_resources(
            &self,
            parent: &AttributeValue,
            ctx: &dyn EvaluationCtx,
        ) -> ResourceFinderResult {
            self.find_child_resources(parent, ctx)
        }
    }

    fn permit_all() -> Pdp {
        let alg = CombiningAlgRegistry::standard()
            .get(ids::RULE_DENY_OVERRIDES)
            .unwrap();
        let policy = Policy::builder("urn:all", alg, Target::any())
            .rule(Rule::new("r", Effect::Permit))
            .build()
            .unwrap();
        let store = Arc::new(MemoryPolicyModule::with_policies(vec![policy.into()]));
        let finder = ModularPolicyFinder::new(vec![store as Arc<dyn PolicyFinderModule>]);
        Pdp::new(
            PdpConfig::new()
                .with_policy_finder(finder)
                .with_resource_finder(Arc::new(Tree)),
        )
    }

    fn scoped(resource: &str, scope: &str) -> RequestCtx {
        RequestCtx::new()
            .with_resource_id(resource)
            .with_resource_attr(RESOURCE_SCOPE, AttributeValue::string(scope))
    }

    #[test]
    fn immediate_request_is_tagged_with_resource() {
        let response = permit_all().evaluate(RequestCtx::new().with_resource_id("doc"));
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].decision, Decision::Permit);
        assert_eq!(response.results[0].resource.as_deref(), Some("doc"));
    }

    #[test]
    fn children_scope_yields_one_result_per_child_and_failure() {
        let response = permit_all().evaluate(scoped("root", "Children"));
        let resources: Vec<(&str, Decision)> = response
            .results
            .iter()
            .map(|r| (r.resource.as_deref().unwrap_or(""), r.decision))
            .collect();
        assert_eq!(
            resources,
            vec![
                ("root/a", Decision::Permit),
                ("root/b", Decision::Permit),
                ("root/c", Decision::Indeterminate),
            ]
        );
    }

    #[test]
    fn empty_expansion_is_one_processing_error() {
        let response = permit_all().evaluate(scoped("leaf", "Descendants"));
        assert_eq!(response.results.len(), 1);
        let status = response.results[0].status.as_ref().unwrap();
        assert_eq!(status.code(), STATUS_PROCESSING_ERROR);
    }

    #[test]
    fn bad_request_is_a_syntax_error() {
        let response = permit_all().evaluate(RequestCtx::new());
        assert_eq!(response.results[0].decision, Decision::Indeterminate);
        assert_eq!(
            response.results[0].status.as_ref().map(|s| s.code()),
            Some(STATUS_SYNTAX_ERROR)
        );

        let json = permit_all().evaluate_json("{ not json");
        assert!(json.contains("\"indeterminate\""));
        assert!(json.contains(STATUS_SYNTAX_ERROR));
    }

    #[test]
    fn missing_policy_finder_is_not_applicable() {
        let pdp = Pdp::new(PdpConfig::new());
        let response = pdp.evaluate(RequestCtx::new().with_resource_id("doc"));
        assert_eq!(response.results[0].decision, Decision::NotApplicable);
    }
}
