// policy.rs — A policy: a target, a rule-combining algorithm and its rules.
//
// Policies are assembled through `PolicyBuilder`, which refuses a
// policy-combining algorithm and a malformed version. Once built a policy
// is immutable and shared behind `Arc`.

use std::sync::Arc;

use crate::combine::{
    encode_parameters, CombinerElement, CombinerParameter, CombiningAlgorithm, CombiningKind,
};
use crate::ctx::EvaluationCtx;
use crate::encode::Indenter;
use crate::error::ParsingError;
use crate::expr::VariableDefinition;
use crate::obligation::{encode_obligations, Obligation};
use crate::registry::PolicyMetaData;
use crate::result::DecisionResult;
use crate::rule::Rule;
use crate::target::{MatchResult, Target, XacmlVersion};
use crate::tree::{attach_obligations, PolicyTreeElement};
use crate::version::is_valid_version;

pub const DEFAULT_VERSION: &str = "1.0";

#[derive(Debug)]
pub struct Policy {
    id: String,
    version: String,
    description: Option<String>,
    target: Target,
    algorithm: Arc<dyn CombiningAlgorithm>,
    parameters: Vec<CombinerParameter>,
    rules: Vec<CombinerElement>,
    obligations: Vec<Obligation>,
    variables: Vec<Arc<VariableDefinition>>,
    meta: PolicyMetaData,
}

impl Policy {
    pub fn builder(
        id: impl Into<String>,
        algorithm: Arc<dyn CombiningAlgorithm>,
        target: Target,
    ) -> PolicyBuilder {
        PolicyBuilder {
            id: id.into(),
            algorithm,
            target,
            version: None,
            description: None,
            parameters: Vec::new(),
            rules: Vec::new(),
            obligations: Vec::new(),
            variables: Vec::new(),
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

    pub fn rules(&self) -> &[CombinerElement] {
        &self.rules
    }

    pub fn obligations(&self) -> &[Obligation] {
        &self.obligations
    }

    pub fn variables(&self) -> &[Arc<VariableDefinition>] {
        &self.variables
    }

    pub fn meta(&self) -> &PolicyMetaData {
        &self.meta
    }

    pub fn children(&self) -> Vec<PolicyTreeElement> {
        self.rules.iter().map(|r| r.element.clone()).collect()
    }

    pub fn matches(&self, ctx: &dyn EvaluationCtx) -> MatchResult {
        self.target.matches(ctx)
    }

    /// Combine the rules, then attach the obligations the decision fulfils.
    pub fn evaluate(&self, ctx: &dyn EvaluationCtx) -> DecisionResult {
        let mut result = self.algorithm.combine(ctx, &self.parameters, &self.rules);
        attach_obligations(&mut result, &self.obligations);
        tracing::debug!(
            request = %ctx.request_id(),
            policy = %self.id,
            decision = %result.decision,
            "policy evaluated"
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
        attrs.push(("PolicyId", self.id.as_str()));
        if version == XacmlVersion::V2 {
            attrs.push(("Version", self.version.as_str()));
        }
        attrs.push(("RuleCombiningAlgId", self.algorithm.identifier()));
        w.open("Policy", &attrs);

        if let Some(description) = &self.description {
            w.text_element("Description", &[], description);
        }
        if let Some(xpath) = &self.meta.xpath_version {
            w.open("PolicyDefaults", &[]);
            w.text_element("XPathVersion", &[], xpath);
            w.close("PolicyDefaults");
        }
        self.target.encode(version, w);
        encode_parameters("CombinerParameters", &[], &self.parameters, w);
        for variable in &self.variables {
            variable.encode(w);
        }
        for element in &self.rules {
            if let PolicyTreeElement::Rule(rule) = &element.element {
                encode_parameters(
                    "RuleCombinerParameters",
                    &[("RuleIdRef", rule.id())],
                    &element.parameters,
                    w,
                );
            }
            element.element.encode(version, w);
        }
        encode_obligations(&self.obligations, w);
        w.close("Policy");
    }
}

pub struct PolicyBuilder {
    id: String,
    algorithm: Arc<dyn CombiningAlgorithm>,
    target: Target,
    version: Option<String>,
    description: Option<String>,
    parameters: Vec<CombinerParameter>,
    rules: Vec<CombinerElement>,
    obligations: Vec<Obligation>,
    variables: Vec<Arc<VariableDefinition>>,
    meta: Option<PolicyMetaData>,
}

impl PolicyBuilder {
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn rule(self, rule: Rule) -> Self {
        self.rule_with_parameters(rule, Vec::new())
    }

    pub fn rule_with_parameters(mut self, rule: Rule, parameters: Vec<CombinerParameter>) -> Self {
        self.rules.push(CombinerElement::with_parameters(
            PolicyTreeElement::Rule(Arc::new(rule)),
            parameters,
        ));
        self
    }

    /// A policy-wide combiner parameter.
    pub fn parameter(mut self, parameter: CombinerParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn obligation(mut self, obligation: Obligation) -> Self {
        self.obligations.push(obligation);
        self
    }

    pub fn variable(mut self, variable: Arc<VariableDefinition>) -> Self {
        self.variables.push(variable);
        self
    }

    pub fn meta(mut self, meta: PolicyMetaData) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn build(self) -> Result<Policy, ParsingError> {
        if self.algorithm.kind() != CombiningKind::Rule {
            return Err(ParsingError::WrongCombiningKind {
                algorithm: self.algorithm.identifier().to_string(),
                expected: CombiningKind::Rule.to_string(),
            });
        }
        let version = self.version.unwrap_or_else(|| DEFAULT_VERSION.to_string());
        if !is_valid_version(&version) {
            return Err(ParsingError::InvalidVersion(version));
        }
        Ok(Policy {
            id: self.id,
            version,
            description: self.description,
            target: self.target,
            algorithm: self.algorithm,
            parameters: self.parameters,
            rules: self.rules,
            obligations: self.obligations,
            variables: self.variables,
            meta: self.meta.unwrap_or_default(),
        })
    }
}
