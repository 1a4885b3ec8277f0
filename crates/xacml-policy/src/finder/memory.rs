// finder/memory.rs — In-memory policy store.
//
// Holds any number of policies, including several versions of one id.
// Top-level search matches every stored policy and treats two matches as
// ambiguous. Reference lookup picks the highest version meeting the
// reference's constraints.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::ctx::EvaluationCtx;
use crate::reference::ReferenceKind;
use crate::registry::PolicyMetaData;
use crate::status::Status;
use crate::target::MatchResult;
use crate::tree::AbstractPolicy;
use crate::version::{compare_versions, VersionConstraints};

use super::{PolicyFinderModule, PolicyFinderResult};

#[derive(Debug, Default)]
pub struct MemoryPolicyModule {
    policies: RwLock<Vec<AbstractPolicy>>,
}

impl MemoryPolicyModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policies(policies: Vec<AbstractPolicy>) -> Self {
        let module = Self::new();
        for policy in policies {
            module.insert(policy);
        }
        module
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<AbstractPolicy>> {
        self.policies.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<AbstractPolicy>> {
        self.policies.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a policy, replacing any stored policy of the same kind, id and version.
    pub fn insert(&self, policy: AbstractPolicy) {
        let mut policies = self.write();
        policies.retain(|p| {
            p.id() != policy.id()
                || p.version() != policy.version()
                || p.is_policy_set() != policy.is_policy_set()
        });
        policies.push(policy);
    }

    /// Drop every version of `id`; returns how many were removed.
    pub fn remove(&self, id: &str) -> usize {
        let mut policies = self.write();
        let before = policies.len();
        policies.retain(|p| p.id() != id);
        before - policies.len()
    }

    /// Swap the whole store.
    pub fn replace_all(&self, policies: Vec<AbstractPolicy>) {
        *self.write() = policies;
    }

    pub fn policies(&self) -> Vec<AbstractPolicy> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

impl PolicyFinderModule for MemoryPolicyModule {
    fn name(&self) -> &str {
        "memory"
    }

    fn supports_request(&self) -> bool {
        true
    }

    fn supports_reference(&self) -> bool {
        true
    }

    fn find_policy(&self, ctx: &dyn EvaluationCtx) -> PolicyFinderResult {
        let policies = self.read();
        let mut selected: Option<&AbstractPolicy> = None;
        for policy in policies.iter() {
            match policy.matches(ctx) {
                MatchResult::NoMatch => {}
                MatchResult::Indeterminate(status) => {
                    return PolicyFinderResult::Indeterminate(status)
                }
                MatchResult::Match => {
                    if selected.is_some() {
                        return PolicyFinderResult::Indeterminate(Status::processing_error(
                            "too many applicable top-level policies",
                        ));
                    }
                    selected = Some(policy);
                }
            }
        }
        match selected {
            Some(policy) => PolicyFinderResult::Found(policy.clone()),
            None => PolicyFinderResult::NotApplicable,
        }
    }

    fn find_policy_by_reference(
        &self,
        reference: &str,
        kind: ReferenceKind,
        constraints: &VersionConstraints,
        _parent_meta: &PolicyMetaData,
    ) -> PolicyFinderResult {
        let want_set = kind == ReferenceKind::PolicySet;
        self.read()
            .iter()
            .filter(|p| p.id() == reference && p.is_policy_set() == want_set)
            .filter(|p| constraints.meets_constraint(Some(p.version())))
            .max_by(|a, b| compare_versions(a.version(), b.version()))
            .cloned()
            .map_or(PolicyFinderResult::NotApplicable, PolicyFinderResult::Found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combine::{ids, CombiningAlgRegistry};
    use crate::policy::Policy;
    use crate::result::Effect;
    use crate::rule::Rule;
    use crate::target::Target;

    fn policy(id: &str, version: &str) -> AbstractPolicy {
        let alg = CombiningAlgRegistry::standard()
            .get(ids::RULE_FIRST_APPLICABLE)
            .unwrap();
        Policy::builder(id, alg, Target::any())
            .version(version)
            .rule(Rule::new("r", Effect::Permit))
            .build()
            .unwrap()
            .into()
    }

    fn lookup(module: &MemoryPolicyModule, constraints: VersionConstraints) -> Option<String> {
        module
            .find_policy_by_reference(
                "urn:p",
                ReferenceKind::Policy,
                &constraints,
                &PolicyMetaData::default(),
            )
            .policy()
            .map(|p| p.version().to_string())
    }

    #[test]
    fn picks_highest_version_within_constraints() {
        let module = MemoryPolicyModule::with_policies(vec![
            policy("urn:p", "1.2"),
            policy("urn:p", "1.10"),
            policy("urn:p", "2.0"),
        ]);
        assert_eq!(lookup(&module, VersionConstraints::any()).as_deref(), Some("2.0"));
        assert_eq!(
            lookup(&module, VersionConstraints::new(Some("1.*"), None, None)).as_deref(),
            Some("1.10")
        );
        assert_eq!(
            lookup(&module, VersionConstraints::new(None, None, Some("1.5"))).as_deref(),
            Some("1.2")
        );
        assert_eq!(lookup(&module, VersionConstraints::new(Some("3"), None, None)), None);
    }

    #[test]
    fn insert_replaces_same_version() {
        let module = MemoryPolicyModule::new();
        module.insert(policy("urn:p", "1.0"));
        module.insert(policy("urn:p", "1.0"));
        module.insert(policy("urn:p", "1.1"));
        assert_eq!(module.len(), 2);
        assert_eq!(module.remove("urn:p"), 2);
        assert!(module.is_empty());
    }
}
