// combine/mod.rs — Combining algorithms and their registry.
//
// A combining algorithm folds the results of a policy's children into one
// `DecisionResult`. Each algorithm declares whether it combines rules or
// policies, and a `Policy` / `PolicySet` refuses an algorithm of the wrong
// kind when it is built.
//
// Rule-combining algorithms call `evaluate` on each rule directly (a rule
// does its own target check). Policy-combining algorithms call `matches`
// first and only evaluate children that match.

mod deny_overrides;
mod first_applicable;
mod only_one;
mod permit_overrides;

pub use deny_overrides::{DenyOverridesPolicyAlg, DenyOverridesRuleAlg};
pub use first_applicable::{FirstApplicablePolicyAlg, FirstApplicableRuleAlg};
pub use only_one::OnlyOneApplicablePolicyAlg;
pub use permit_overrides::{PermitOverridesPolicyAlg, PermitOverridesRuleAlg};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::attr::AttributeValue;
use crate::ctx::EvaluationCtx;
use crate::encode::Indenter;
use crate::error::ParsingError;
use crate::expr::encode_value;
use crate::result::DecisionResult;
use crate::tree::PolicyTreeElement;

const RULE_ALG_NS: &str = "urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:";
const POLICY_ALG_NS: &str = "urn:oasis:names:tc:xacml:1.0:policy-combining-algorithm:";
const RULE_ALG_NS_1_1: &str = "urn:oasis:names:tc:xacml:1.1:rule-combining-algorithm:";
const POLICY_ALG_NS_1_1: &str = "urn:oasis:names:tc:xacml:1.1:policy-combining-algorithm:";

/// Standard combining algorithm identifiers.
pub mod ids {
    pub const RULE_DENY_OVERRIDES: &str =
        "urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:deny-overrides";
    pub const RULE_PERMIT_OVERRIDES: &str =
        "urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:permit-overrides";
    pub const RULE_FIRST_APPLICABLE: &str =
        "urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:first-applicable";
    pub const RULE_ORDERED_DENY_OVERRIDES: &str =
        "urn:oasis:names:tc:xacml:1.1:rule-combining-algorithm:ordered-deny-overrides";
    pub const RULE_ORDERED_PERMIT_OVERRIDES: &str =
        "urn:oasis:names:tc:xacml:1.1:rule-combining-algorithm:ordered-permit-overrides";
    pub const POLICY_DENY_OVERRIDES: &str =
        "urn:oasis:names:tc:xacml:1.0:policy-combining-algorithm:deny-overrides";
    pub const POLICY_PERMIT_OVERRIDES: &str =
        "urn:oasis:names:tc:xacml:1.0:policy-combining-algorithm:permit-overrides";
    pub const POLICY_FIRST_APPLICABLE: &str =
        "urn:oasis:names:tc:xacml:1.0:policy-combining-algorithm:first-applicable";
    pub const POLICY_ONLY_ONE_APPLICABLE: &str =
        "urn:oasis:names:tc:xacml:1.0:policy-combining-algorithm:only-one-applicable";
    pub const POLICY_ORDERED_DENY_OVERRIDES: &str =
        "urn:oasis:names:tc:xacml:1.1:policy-combining-algorithm:ordered-deny-overrides";
    pub const POLICY_ORDERED_PERMIT_OVERRIDES: &str =
        "urn:oasis:names:tc:xacml:1.1:policy-combining-algorithm:ordered-permit-overrides";
}

/// What an algorithm combines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombiningKind {
    Rule,
    Policy,
}

impl fmt::Display for CombiningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CombiningKind::Rule => f.write_str("rules"),
            CombiningKind::Policy => f.write_str("policies"),
        }
    }
}

/// A named parameter passed to a combining algorithm.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinerParameter {
    pub name: String,
    pub value: AttributeValue,
}

impl CombinerParameter {
    pub fn new(name: impl Into<String>, value: AttributeValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn encode(&self, w: &mut Indenter) {
        w.open("CombinerParameter", &[("ParameterName", self.name.as_str())]);
        encode_value(&self.value, w);
        w.close("CombinerParameter");
    }
}

/// Write `<element attrs>` around `parameters`, or nothing when there are none.
pub(crate) fn encode_parameters(
    element: &str,
    attrs: &[(&str, &str)],
    parameters: &[CombinerParameter],
    w: &mut Indenter,
) {
    if parameters.is_empty() {
        return;
    }
    w.open(element, attrs);
    for parameter in parameters {
        parameter.encode(w);
    }
    w.close(element);
}

/// One child of a policy or policy set, with its own combiner parameters.
#[derive(Debug, Clone)]
pub struct CombinerElement {
    pub element: PolicyTreeElement,
    pub parameters: Vec<CombinerParameter>,
}

impl CombinerElement {
    pub fn new(element: PolicyTreeElement) -> Self {
        Self {
            element,
            parameters: Vec::new(),
        }
    }

    pub fn with_parameters(element: PolicyTreeElement, parameters: Vec<CombinerParameter>) -> Self {
        Self { element, parameters }
    }
}

pub trait CombiningAlgorithm: Send + Sync + fmt::Debug {
    fn identifier(&self) -> &str;

    fn kind(&self) -> CombiningKind;

    fn combine(
        &self,
        ctx: &dyn EvaluationCtx,
        parameters: &[CombinerParameter],
        children: &[CombinerElement],
    ) -> DecisionResult;
}

/// Combining algorithms keyed by identifier.
#[derive(Debug, Clone, Default)]
pub struct CombiningAlgRegistry {
    algorithms: HashMap<String, Arc<dyn CombiningAlgorithm>>,
}

impl CombiningAlgRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every standard rule and policy combining algorithm.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for ordered in [false, true] {
            let (rule_ns, policy_ns) = if ordered {
                (RULE_ALG_NS_1_1, POLICY_ALG_NS_1_1)
            } else {
                (RULE_ALG_NS, POLICY_ALG_NS)
            };
            let prefix = if ordered { "ordered-" } else { "" };
            registry.register(Arc::new(DenyOverridesRuleAlg::new(format!(
                "{}{}deny-overrides",
                rule_ns, prefix
            ))));
            registry.register(Arc::new(PermitOverridesRuleAlg::new(format!(
                "{}{}permit-overrides",
                rule_ns, prefix
            ))));
            registry.register(Arc::new(DenyOverridesPolicyAlg::new(format!(
                "{}{}deny-overrides",
                policy_ns, prefix
            ))));
            registry.register(Arc::new(PermitOverridesPolicyAlg::new(format!(
                "{}{}permit-overrides",
                policy_ns, prefix
            ))));
        }
        registry.register(Arc::new(FirstApplicableRuleAlg));
        registry.register(Arc::new(FirstApplicablePolicyAlg));
        registry.register(Arc::new(OnlyOneApplicablePolicyAlg));
        registry
    }

    pub fn register(&mut self, algorithm: Arc<dyn CombiningAlgorithm>) {
        self.algorithms
            .insert(algorithm.identifier().to_string(), algorithm);
    }

    pub fn get(&self, id: &str) -> Result<Arc<dyn CombiningAlgorithm>, ParsingError> {
        self.algorithms
            .get(id)
            .cloned()
            .ok_or_else(|| ParsingError::UnknownCombiningAlgorithm(id.to_string()))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_knows_every_algorithm() {
        let registry = CombiningAlgRegistry::standard();
        for id in [
            ids::RULE_DENY_OVERRIDES,
            ids::RULE_PERMIT_OVERRIDES,
            ids::RULE_FIRST_APPLICABLE,
            ids::RULE_ORDERED_DENY_OVERRIDES,
            ids::RULE_ORDERED_PERMIT_OVERRIDES,
            ids::POLICY_DENY_OVERRIDES,
            ids::POLICY_PERMIT_OVERRIDES,
            ids::POLICY_FIRST_APPLICABLE,
            ids::POLICY_ONLY_ONE_APPLICABLE,
            ids::POLICY_ORDERED_DENY_OVERRIDES,
            ids::POLICY_ORDERED_PERMIT_OVERRIDES,
        ] {
            assert_eq!(registry.get(id).unwrap().identifier(), id);
        }
        assert_eq!(
            registry.get(ids::RULE_DENY_OVERRIDES).unwrap().kind(),
            CombiningKind::Rule
        );
        assert!(matches!(
            registry.get("urn:example:nope"),
            Err(ParsingError::UnknownCombiningAlgorithm(_))
        ));
    }
}
