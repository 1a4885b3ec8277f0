// reference.rs — Lazy pointers to policies held by a `PolicyFinder`.
//
// A reference never keeps what it resolved. Every accessor asks the finder
// again, so a store that swaps a policy between two calls is observed on
// the second call. Callers that need throughput cache in the finder.
//
// The finder is held weakly: the finder usually owns the policies that
// contain the reference.

use std::fmt;
use std::sync::{Arc, Weak};

use crate::ctx::EvaluationCtx;
use crate::encode::Indenter;
use crate::error::ResolutionError;
use crate::finder::{PolicyFinder, PolicyFinderResult};
use crate::obligation::Obligation;
use crate::registry::PolicyMetaData;
use crate::result::DecisionResult;
use crate::status::Status;
use crate::target::{MatchResult, Target, XacmlVersion};
use crate::tree::{AbstractPolicy, PolicyTreeElement};
use crate::version::VersionConstraints;

/// Whether a reference points at a `Policy` or a `PolicySet`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Policy,
    PolicySet,
}

impl ReferenceKind {
    pub fn element_name(&self) -> &'static str {
        match self {
            ReferenceKind::Policy => "PolicyIdReference",
            ReferenceKind::PolicySet => "PolicySetIdReference",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKind::Policy => f.write_str("policy"),
            ReferenceKind::PolicySet => f.write_str("policy set"),
        }
    }
}

#[derive(Debug)]
pub struct PolicyReference {
    reference: String,
    kind: ReferenceKind,
    constraints: VersionConstraints,
    finder: Option<Weak<dyn PolicyFinder>>,
    parent_meta: PolicyMetaData,
}

impl PolicyReference {
    pub fn new(
        reference: impl Into<String>,
        kind: ReferenceKind,
        constraints: VersionConstraints,
        parent_meta: PolicyMetaData,
    ) -> Self {
        Self {
            reference: reference.into(),
            kind,
            constraints,
            finder: None,
            parent_meta,
        }
    }

    pub fn with_finder(mut self, finder: &Arc<dyn PolicyFinder>) -> Self {
        self.finder = Some(Arc::downgrade(finder));
        self
    }

    pub fn with_weak_finder(mut self, finder: Weak<dyn PolicyFinder>) -> Self {
        self.finder = Some(finder);
        self
    }

    /// The referenced identifier as written in the document.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn kind(&self) -> ReferenceKind {
        self.kind
    }

    pub fn constraints(&self) -> &VersionConstraints {
        &self.constraints
    }

    /// Ask the finder for the referenced policy. Always a fresh lookup.
    pub fn resolve(&self) -> Result<AbstractPolicy, ResolutionError> {
        let finder = self
            .finder
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or_else(|| ResolutionError::FinderUnavailable(self.reference.clone()))?;

        match finder.find_policy_by_reference(
            &self.reference,
            self.kind,
            &self.constraints,
            &self.parent_meta,
        ) {
            PolicyFinderResult::Found(policy) => {
                let found = if policy.is_policy_set() {
                    ReferenceKind::PolicySet
                } else {
                    ReferenceKind::Policy
                };
                if found != self.kind {
                    return Err(ResolutionError::Indeterminate {
                        reference: self.reference.clone(),
                        status: Status::processing_error(format!(
                            "{} reference resolved to a {}",
                            self.kind, found
                        )),
                    });
                }
                Ok(policy)
            }
            PolicyFinderResult::NotApplicable => {
                Err(ResolutionError::NotFound(self.reference.clone()))
            }
            PolicyFinderResult::Indeterminate(status) => Err(ResolutionError::Indeterminate {
                reference: self.reference.clone(),
                status,
            }),
        }
    }

    pub fn id(&self) -> Result<String, ResolutionError> {
        self.resolve().map(|p| p.id().to_string())
    }

    pub fn version(&self) -> Result<String, ResolutionError> {
        self.resolve().map(|p| p.version().to_string())
    }

    pub fn description(&self) -> Result<Option<String>, ResolutionError> {
        self.resolve().map(|p| p.description().map(str::to_string))
    }

    pub fn target(&self) -> Result<Target, ResolutionError> {
        self.resolve().map(|p| p.target().clone())
    }

    pub fn obligations(&self) -> Result<Vec<Obligation>, ResolutionError> {
        self.resolve().map(|p| p.obligations().to_vec())
    }

    pub fn children(&self) -> Result<Vec<PolicyTreeElement>, ResolutionError> {
        self.resolve().map(|p| p.children())
    }

    pub fn matches(&self, ctx: &dyn EvaluationCtx) -> MatchResult {
        match self.resolve() {
            Ok(policy) => policy.matches(ctx),
            Err(err) => {
                tracing::debug!(request = %ctx.request_id(), error = %err, "reference unresolved");
                MatchResult::Indeterminate(err.status())
            }
        }
    }

    pub fn evaluate(&self, ctx: &dyn EvaluationCtx) -> DecisionResult {
        match self.resolve() {
            Ok(policy) => policy.evaluate(ctx),
            Err(err) => {
                tracing::debug!(request = %ctx.request_id(), error = %err, "reference unresolved");
                DecisionResult::indeterminate(err.status())
            }
        }
    }

    /// Version constraints are written only in the 2.0 syntax.
    pub fn encode(&self, version: XacmlVersion, w: &mut Indenter) {
        let mut attrs: Vec<(&str, &str)> = Vec::new();
        if version == XacmlVersion::V2 {
            if let Some(v) = &self.constraints.version {
                attrs.push(("Version", v.as_str()));
            }
            if let Some(v) = &self.constraints.earliest {
                attrs.push(("EarliestVersion", v.as_str()));
            }
            if let Some(v) = &self.constraints.latest {
                attrs.push(("LatestVersion", v.as_str()));
            }
        }
        w.text_element(self.kind.element_name(), &attrs, &self.reference);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combine::{ids, CombiningAlgRegistry};
    use crate::ctx::{BasicEvaluationCtx, RequestCtx};
    use crate::finder::{MemoryPolicyModule, ModularPolicyFinder, PolicyFinderModule};
    use crate::policy::Policy;
    use crate::result::{Decision, Effect};
    use crate::rule::Rule;

    fn policy(id: &str, version: &str, effect: Effect) -> AbstractPolicy {
        let alg = CombiningAlgRegistry::standard()
            .get(ids::RULE_FIRST_APPLICABLE)
            .unwrap();
        Policy::builder(id, alg, Target::any())
            .version(version)
            .rule(Rule::new("r", effect))
            .build()
            .unwrap()
            .into()
    }

    fn ctx() -> BasicEvaluationCtx {
        BasicEvaluationCtx::new(RequestCtx::new().with_resource_id("doc"), None).unwrap()
    }

    #[test]
    fn missing_finder_is_indeterminate() {
        let reference = PolicyReference::new(
            "urn:p",
            ReferenceKind::Policy,
            VersionConstraints::any(),
            PolicyMetaData::default(),
        );
        assert!(matches!(reference.id(), Err(ResolutionError::FinderUnavailable(_))));
        assert!(reference.evaluate(&ctx()).is_indeterminate());
        assert!(matches!(reference.matches(&ctx()), MatchResult::Indeterminate(_)));
    }

    #[test]
    fn kind_mismatch_is_an_error() {
        let store = Arc::new(MemoryPolicyModule::new());
        store.insert(policy("urn:p", "1.0", Effect::Permit));
        let finder: Arc<dyn PolicyFinder> =
            ModularPolicyFinder::new(vec![store as Arc<dyn PolicyFinderModule>]);
        let reference = PolicyReference::new(
            "urn:p",
            ReferenceKind::PolicySet,
            VersionConstraints::any(),
            PolicyMetaData::default(),
        )
        .with_finder(&finder);
        assert!(matches!(
            reference.resolve(),
            Err(ResolutionError::NotFound(_)) | Err(ResolutionError::Indeterminate { .. })
        ));
    }

    #[test]
    fn resolution_is_never_cached() {
        let store = Arc::new(MemoryPolicyModule::new());
        store.insert(policy("urn:p", "1.0", Effect::Permit));
        let finder: Arc<dyn PolicyFinder> =
            ModularPolicyFinder::new(vec![store.clone() as Arc<dyn PolicyFinderModule>]);
        let reference = PolicyReference::new(
            "urn:p",
            ReferenceKind::Policy,
            VersionConstraints::any(),
            PolicyMetaData::default(),
        )
        .with_finder(&finder);

        assert_eq!(reference.evaluate(&ctx()).decision, Decision::Permit);
        store.insert(policy("urn:p", "1.0", Effect::Deny));
        assert_eq!(reference.evaluate(&ctx()).decision, Decision::Deny);
        store.remove("urn:p");
        assert!(matches!(reference.id(), Err(ResolutionError::NotFound(_))));
    }
}
