// finder/modular.rs — A `PolicyFinder` assembled from modules.

use std::sync::{Arc, Weak};

use crate::ctx::EvaluationCtx;
use crate::reference::ReferenceKind;
use crate::registry::PolicyMetaData;
use crate::status::Status;
use crate::version::VersionConstraints;

use super::{PolicyFinder, PolicyFinderModule, PolicyFinderResult};

pub struct ModularPolicyFinder {
    modules: Vec<Arc<dyn PolicyFinderModule>>,
}

impl ModularPolicyFinder {
    /// Build the finder and hand every module a weak handle to it.
    pub fn new(modules: Vec<Arc<dyn PolicyFinderModule>>) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<ModularPolicyFinder>| {
            let handle: Weak<dyn PolicyFinder> = weak.clone();
            for module in &modules {
                module.init(&handle);
            }
            tracing::info!(modules = modules.len(), "policy finder initialised");
            Self { modules }
        })
    }

    pub fn modules(&self) -> &[Arc<dyn PolicyFinderModule>] {
        &self.modules
    }
}

impl PolicyFinder for ModularPolicyFinder {
    fn find_policy(&self, ctx: &dyn EvaluationCtx) -> PolicyFinderResult {
        let mut found = None;
        for module in self.modules.iter().filter(|m| m.supports_request()) {
            match module.find_policy(ctx) {
                PolicyFinderResult::NotApplicable => {}
                PolicyFinderResult::Indeterminate(status) => {
                    tracing::warn!(module = module.name(), %status, "policy module failed");
                    return PolicyFinderResult::Indeterminate(status);
                }
                PolicyFinderResult::Found(policy) => {
                    if found.is_some() {
                        return PolicyFinderResult::Indeterminate(Status::processing_error(
                            "too many applicable top-level policies",
                        ));
                    }
                    found = Some(policy);
                }
            }
        }
        match found {
            Some(policy) => {
                tracing::debug!(
                    request = %ctx.request_id(),
                    policy = policy.id(),
                    "applicable policy found"
                );
                PolicyFinderResult::Found(policy)
            }
            None => PolicyFinderResult::NotApplicable,
        }
    }

    fn find_policy_by_reference(
        &self,
        reference: &str,
        kind: ReferenceKind,
        constraints: &VersionConstraints,
        parent_meta: &PolicyMetaData,
    ) -> PolicyFinderResult {
        for module in self.modules.iter().filter(|m| m.supports_reference()) {
            let result = module.find_policy_by_reference(reference, kind, constraints, parent_meta);
            if !result.not_applicable() {
                return result;
            }
        }
        tracing::debug!(reference, %kind, "no module resolved reference");
        PolicyFinderResult::NotApplicable
    }
}
