// policy_set.rs — A policy set: policies, nested sets and references,
// combined by a policy-combining algorithm.

use std::sync::Arc;

use crate::combine::{
    encode_parameters, CombinerElement, CombinerParameter, CombiningAlgorithm, CombiningKind,
};
use crate::ctx::EvaluationCtx;
use crate::encode::Indenter;
use crate::error::ParsingError;
use crate::obligation::{encode_obligations, Obligation};
use crate::policy::{Policy, DEFAULT_VERSION};
use crate::reference::{PolicyReference, ReferenceKind};
use crate::registry::PolicyMetaData;
use crate::result::DecisionResult;
use crate::target::{MatchResult, Target, XacmlVersion};
use crate::tree::{attach_obligations, PolicyTreeElement};
use crate::version::is_valid_version;

#[derive(Debug)]
pub struct PolicySet {
    id: String,
    version: String,
    description: Option<String>,
    target: Target,
    algorithm: Arc<dyn CombiningAlgorithm>,
    parameters: Vec<CombinerParameter>,
    children: Vec<CombinerElement>,
    obligations: Vec<Obligation>,
    meta: PolicyMetaData,
}

impl PolicySet {
    pub fn builder(
        id: impl Into<String>,
        algorithm: Arc<dyn CombiningAlgorithm>,
        target: Target,
    ) -> PolicySetBuilder {
        PolicySetBuilder {
            id: id.into(),
            algorithm,
            target,
            version: None,
            description: None,
            parameters: Vec::new(),
            children: Vec::new(),
            obligations: Vec::new(),
            meta: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn algorithm(&self) -> &Arc<dyn CombiningAlgorithm> {
        &self.algorithm
    }

    pub fn parameters(&self) -> &[CombinerParameter] {
        &self.parameters
    }

    pub fn combiner_elements(&self) -> &[CombinerElement] {
        &self.children
    }

    pub fn obligations(&self) -> &[Obligation] {
        &self.obligations
    }

    pub fn meta(&self) -> &PolicyMetaData {
        &self.meta
    }

    pub fn children(&self) -> Vec<PolicyTreeElement> {
        self.children.iter().map(|c| c.element.clone()).collect()
    }

    pub fn matches(&self, ctx: &dyn EvaluationCtx) -> MatchResult {
        self.target.matches(ctx)
    }

    pub fn evaluate(&self, ctx: &dyn EvaluationCtx) -> DecisionResult {
        let mut result = self.algorithm.combine(ctx, &self.parameters, &self.children);
        attach_obligations(&mut result, &self.obligations);
        tracing::debug!(
            request = %ctx.request_id(),
            policy_set = %self.id,
            decision = %result.decision,
            "policy set evaluated"
        );
        result
    }

    pub fn encode(&self, w: &mut Indenter) {
        self.write(w, None);
    }

    pub(crate) fn write(&self, w: &mut Indenter, namespace: Option<&str>) {
        let version = self.meta.xacml_version;
        let mut attrs: Vec<(&str, &str)> = Vec::new();
        if let Some(ns) = namespace {
            attrs.push(("xmlns", ns));
        }
        attrs.push(("PolicySetId", self.id.as_str()));
        if version == XacmlVersion::V2 {
            attrs.push(("Version", self.version.as_str()));
        }
        attrs.push(("PolicyCombiningAlgId", self.algorithm.identifier()));
        w.open("PolicySet", &attrs);

        if let Some(description) = &self.description {
            w.text_element("Description", &[], description);
        }
        if let Some(xpath) = &self.meta.xpath_version {
            w.open("PolicySetDefaults", &[]);
            w.text_element("XPathVersion", &[], xpath);
            w.close("PolicySetDefaults");
        }
        self.target.encode(version, w);
        encode_parameters("CombinerParameters", &[], &self.parameters, w);
        for child in &self.children {
            match &child.element {
                PolicyTreeElement::Policy(policy) => encode_parameters(
                    "PolicyCombinerParameters",
                    &[("PolicyIdRef", policy.id())],
                    &child.parameters,
                    w,
                ),
                PolicyTreeElement::PolicySet(set) => encode_parameters(
                    "PolicySetCombinerParameters",
                    &[("PolicySetIdRef", set.id())],
                    &child.parameters,
                    w,
                ),
                PolicyTreeElement::Reference(reference) => {
                    let (element, attr) = match reference.kind() {
                        ReferenceKind::Policy => ("PolicyCombinerParameters", "PolicyIdRef"),
                        ReferenceKind::PolicySet => {
                            ("PolicySetCombinerParameters", "PolicySetIdRef")
                        }
                    };
                    let attrs = [(attr, reference.reference())];
                    encode_parameters(element, &attrs, &child.parameters, w)
                }
                PolicyTreeElement::Rule(_) => {}
            }
            child.element.encode(version, w);
        }
        encode_obligations(&self.obligations, w);
        w.close("PolicySet");
    }
}

pub struct PolicySetBuilder {
    id: String,
    algorithm: Arc<dyn CombiningAlgorithm>,
    target: Target,
    version: Option<String>,
    description: Option<String>,
    parameters: Vec<CombinerParameter>,
    children: Vec<CombinerElement>,
    obligations: Vec<Obligation>,
    meta: Option<PolicyMetaData>,
}

impl PolicySetBuilder {
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn policy(self, policy: Policy) -> Self {
        self.child(PolicyTreeElement::Policy(Arc::new(policy)))
    }

    pub fn policy_set(self, set: PolicySet) -> Self {
        self.child(PolicyTreeElement::PolicySet(Arc::new(set)))
    }

    pub fn reference(self, reference: PolicyReference) -> Self {
        self.child(PolicyTreeElement::Reference(Arc::new(reference)))
    }

    pub fn child(self, element: PolicyTreeElement) -> Self {
        self.child_with_parameters(element, Vec::new())
    }

    pub fn child_with_parameters(
        mut self,
        element: PolicyTreeElement,
        parameters: Vec<CombinerParameter>,
    ) -> Self {
        self.children
            .push(CombinerElement::with_parameters(element, parameters));
        self
    }

    pub fn parameter(mut self, parameter: CombinerParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn obligation(mut self, obligation: Obligation) -> Self {
        self.obligations.push(obligation);
        self
    }

    pub fn meta(mut self, meta: PolicyMetaData) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn build(self) -> Result<PolicySet, ParsingError> {
        if self.algorithm.kind() != CombiningKind::Policy {
            return Err(ParsingError::WrongCombiningKind {
                algorithm: self.algorithm.identifier().to_string(),
                expected: CombiningKind::Policy.to_string(),
            });
        }
        if let Some(rule) = self.children.iter().find_map(|c| match &c.element {
            PolicyTreeElement::Rule(rule) => Some(rule.id().to_string()),
            _ => None,
        }) {
            return Err(ParsingError::Invalid(format!(
                "policy set {} cannot contain rule {}",
                self.id, rule
            )));
        }
        let version = self.version.unwrap_or_else(|| DEFAULT_VERSION.to_string());
        if !is_valid_version(&version) {
            return Err(ParsingError::InvalidVersion(version));
        }
        Ok(PolicySet {
            id: self.id,
            version,
            description: self.description,
            target: self.target,
            algorithm: self.algorithm,
            parameters: self.parameters,
            children: self.children,
            obligations: self.obligations,
            meta: self.meta.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combine::{ids, CombiningAlgRegistry};
    use crate::ctx::{BasicEvaluationCtx, RequestCtx};
    use crate::result::{Decision, Effect};
    use crate::rule::Rule;

    fn algorithm(id: &str) -> Arc<dyn CombiningAlgorithm> {
        CombiningAlgRegistry::standard().get(id).unwrap()
    }

    fn policy(id: &str, effect: Effect) -> Policy {
        Policy::builder(id, algorithm(ids::RULE_FIRST_APPLICABLE), Target::any())
            .rule(Rule::new(format!("{}-rule", id), effect))
            .obligation(Obligation::new(format!("urn:{}", id), effect, vec![]))
            .build()
            .unwrap()
    }

    fn ctx() -> BasicEvaluationCtx {
        BasicEvaluationCtx::new(RequestCtx::new().with_resource_id("doc"), None).unwrap()
    }

    #[test]
    fn rejects_rule_combining_algorithm() {
        let result =
            PolicySet::builder("s", algorithm(ids::RULE_DENY_OVERRIDES), Target::any()).build();
        assert!(matches!(result, Err(ParsingError::WrongCombiningKind { .. })));
    }

    #[test]
    fn rejects_rule_children() {
        let result = PolicySet::builder("s", algorithm(ids::POLICY_DENY_OVERRIDES), Target::any())
            .child(PolicyTreeElement::Rule(Arc::new(Rule::new("r", Effect::Permit))))
            .build();
        assert!(matches!(result, Err(ParsingError::Invalid(_))));
    }

    #[test]
    fn permit_overrides_collects_permit_obligations() {
        let set = PolicySet::builder("s", algorithm(ids::POLICY_PERMIT_OVERRIDES), Target::any())
            .policy(policy("a", Effect::Deny))
            .policy(policy("b", Effect::Permit))
            .build()
            .unwrap();
        let result = set.evaluate(&ctx());
        assert_eq!(result.decision, Decision::Permit);
        let ids: Vec<&str> = result.obligations.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["urn:b"]);
    }

    #[test]
    fn only_one_applicable_rejects_two_matches() {
        let set = PolicySet::builder("s", algorithm(ids::POLICY_ONLY_ONE_APPLICABLE), Target::any())
            .policy(policy("a", Effect::Deny))
            .policy(policy("b", Effect::Permit))
            .build()
            .unwrap();
        assert_eq!(set.evaluate(&ctx()).decision, Decision::Indeterminate);
    }

    #[test]
    fn deny_overrides_combines_deny_obligations_from_nested_set() {
        let inner = PolicySet::builder(
            "inner",
            algorithm(ids::POLICY_FIRST_APPLICABLE),
            Target::any(),
        )
        .policy(policy("a", Effect::Deny))
        .build()
        .unwrap();
        let outer = PolicySet::builder(
            "outer",
            algorithm(ids::POLICY_DENY_OVERRIDES),
            Target::any(),
        )
        .policy(policy("b", Effect::Permit))
        .policy_set(inner)
        .build()
        .unwrap();
        let result = outer.evaluate(&ctx());
        assert_eq!(result.decision, Decision::Deny);
        assert_eq!(result.obligations[0].id, "urn:a");
    }
}
