// tree.rs — The policy tree as one tagged type.
//
// `PolicyTreeElement` is what combining algorithms walk: a rule, a policy,
// a policy set or a reference to one of the latter two. `AbstractPolicy`
// is the subset that can stand at the top of a tree and be returned by a
// `PolicyFinder`.
//
// Accessors that need a reference's target return `Result`; `matches` and
// `evaluate` never fail and turn resolution errors into INDETERMINATE.

use std::sync::Arc;

use crate::ctx::EvaluationCtx;
use crate::encode::{Indenter, XACML1_POLICY_NS, XACML2_POLICY_NS};
use crate::error::ResolutionError;
use crate::obligation::Obligation;
use crate::policy::Policy;
use crate::policy_set::PolicySet;
use crate::reference::PolicyReference;
use crate::registry::PolicyMetaData;
use crate::result::{Decision, DecisionResult, Effect};
use crate::rule::Rule;
use crate::target::{MatchResult, Target, XacmlVersion};

#[derive(Debug, Clone)]
pub enum PolicyTreeElement {
    Rule(Arc<Rule>),
    Policy(Arc<Policy>),
    PolicySet(Arc<PolicySet>),
    Reference(Arc<PolicyReference>),
}

impl PolicyTreeElement {
    /// The element's identifier. A reference answers with the id of the
    /// policy it currently resolves to.
    pub fn id(&self) -> Result<String, ResolutionError> {
        match self {
            PolicyTreeElement::Rule(rule) => Ok(rule.id().to_string()),
            PolicyTreeElement::Policy(policy) => Ok(policy.id().to_string()),
            PolicyTreeElement::PolicySet(set) => Ok(set.id().to_string()),
            PolicyTreeElement::Reference(reference) => reference.id(),
        }
    }

    /// Effect of a rule; `None` for every other element.
    pub fn rule_effect(&self) -> Option<Effect> {
        match self {
            PolicyTreeElement::Rule(rule) => Some(rule.effect()),
            _ => None,
        }
    }

    pub fn children(&self) -> Result<Vec<PolicyTreeElement>, ResolutionError> {
        match self {
            PolicyTreeElement::Rule(_) => Ok(Vec::new()),
            PolicyTreeElement::Policy(policy) => Ok(policy.children()),
            PolicyTreeElement::PolicySet(set) => Ok(set.children()),
            PolicyTreeElement::Reference(reference) => reference.children(),
        }
    }

    pub fn matches(&self, ctx: &dyn EvaluationCtx) -> MatchResult {
        match self {
            PolicyTreeElement::Rule(rule) => rule.matches(ctx),
            PolicyTreeElement::Policy(policy) => policy.matches(ctx),
            PolicyTreeElement::PolicySet(set) => set.matches(ctx),
            PolicyTreeElement::Reference(reference) => reference.matches(ctx),
        }
    }

    pub fn evaluate(&self, ctx: &dyn EvaluationCtx) -> DecisionResult {
        match self {
            PolicyTreeElement::Rule(rule) => rule.evaluate(ctx),
            PolicyTreeElement::Policy(policy) => policy.evaluate(ctx),
            PolicyTreeElement::PolicySet(set) => set.evaluate(ctx),
            PolicyTreeElement::Reference(reference) => reference.evaluate(ctx),
        }
    }

    pub fn encode(&self, version: XacmlVersion, w: &mut Indenter) {
        match self {
            PolicyTreeElement::Rule(rule) => rule.encode(version, w),
            PolicyTreeElement::Policy(policy) => policy.encode(w),
            PolicyTreeElement::PolicySet(set) => set.encode(w),
            PolicyTreeElement::Reference(reference) => reference.encode(version, w),
        }
    }
}

/// A policy or policy set: anything a finder can hand back.
#[derive(Debug, Clone)]
pub enum AbstractPolicy {
    Policy(Arc<Policy>),
    PolicySet(Arc<PolicySet>),
}

impl AbstractPolicy {
    pub fn id(&self) -> &str {
        match self {
            AbstractPolicy::Policy(policy) => policy.id(),
            AbstractPolicy::PolicySet(set) => set.id(),
        }
    }

    pub fn version(&self) -> &str {
        match self {
            AbstractPolicy::Policy(policy) => policy.version(),
            AbstractPolicy::PolicySet(set) => set.version(),
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            AbstractPolicy::Policy(policy) => policy.description(),
            AbstractPolicy::PolicySet(set) => set.description(),
        }
    }

    pub fn target(&self) -> &Target {
        match self {
            AbstractPolicy::Policy(policy) => policy.target(),
            AbstractPolicy::PolicySet(set) => set.target(),
        }
    }

    pub fn obligations(&self) -> &[Obligation] {
        match self {
            AbstractPolicy::Policy(policy) => policy.obligations(),
            AbstractPolicy::PolicySet(set) => set.obligations(),
        }
    }

    pub fn meta(&self) -> &PolicyMetaData {
        match self {
            AbstractPolicy::Policy(policy) => policy.meta(),
            AbstractPolicy::PolicySet(set) => set.meta(),
        }
    }

    pub fn is_policy_set(&self) -> bool {
        matches!(self, AbstractPolicy::PolicySet(_))
    }

    pub fn children(&self) -> Vec<PolicyTreeElement> {
        match self {
            AbstractPolicy::Policy(policy) => policy.children(),
            AbstractPolicy::PolicySet(set) => set.children(),
        }
    }

    pub fn matches(&self, ctx: &dyn EvaluationCtx) -> MatchResult {
        self.target().matches(ctx)
    }

    pub fn evaluate(&self, ctx: &dyn EvaluationCtx) -> DecisionResult {
        match self {
            AbstractPolicy::Policy(policy) => policy.evaluate(ctx),
            AbstractPolicy::PolicySet(set) => set.evaluate(ctx),
        }
    }

    /// Write the element without a namespace declaration, for nesting.
    pub fn encode(&self, w: &mut Indenter) {
        match self {
            AbstractPolicy::Policy(policy) => policy.encode(w),
            AbstractPolicy::PolicySet(set) => set.encode(w),
        }
    }

    /// A standalone document with the namespace of the policy's XACML version.
    pub fn encode_to_string(&self, width: usize) -> String {
        let namespace = match self.meta().xacml_version {
            XacmlVersion::V1 => XACML1_POLICY_NS,
            XacmlVersion::V2 => XACML2_POLICY_NS,
        };
        let mut w = Indenter::new(width);
        match self {
            AbstractPolicy::Policy(policy) => policy.write(&mut w, Some(namespace)),
            AbstractPolicy::PolicySet(set) => set.write(&mut w, Some(namespace)),
        }
        w.finish()
    }

    pub fn into_element(self) -> PolicyTreeElement {
        match self {
            AbstractPolicy::Policy(policy) => PolicyTreeElement::Policy(policy),
            AbstractPolicy::PolicySet(set) => PolicyTreeElement::PolicySet(set),
        }
    }
}

impl From<Policy> for AbstractPolicy {
    fn from(policy: Policy) -> Self {
        AbstractPolicy::Policy(Arc::new(policy))
    }
}

impl From<PolicySet> for AbstractPolicy {
    fn from(set: PolicySet) -> Self {
        AbstractPolicy::PolicySet(Arc::new(set))
    }
}

/// Attach every obligation whose `fulfill_on` equals the decision. Only
/// Permit and Deny carry obligations.
pub(crate) fn attach_obligations(result: &mut DecisionResult, obligations: &[Obligation]) {
    let effect = match result.decision {
        Decision::Permit => Effect::Permit,
        Decision::Deny => Effect::Deny,
        Decision::Indeterminate | Decision::NotApplicable => return,
    };
    for obligation in obligations.iter().filter(|o| o.fulfill_on == effect) {
        result.add_obligation(obligation.clone());
    }
}
