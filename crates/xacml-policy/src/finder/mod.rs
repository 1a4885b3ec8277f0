// finder/mod.rs — Collaborators the engine consults while evaluating.
//
// The engine never stores, fetches or expands anything itself. Policies
// come from a `PolicyFinder`, attributes missing from the request from an
// `AttributeFinder`, and scope expansion from a `ResourceFinder`. All of
// them are called synchronously; any I/O, caching or timeout handling is
// theirs.

mod attribute;
mod memory;
mod modular;
mod resource;

pub use attribute::{AttributeFinder, ChainedAttributeFinder};
pub use memory::MemoryPolicyModule;
pub use modular::ModularPolicyFinder;
pub use resource::{ChainedResourceFinder, ResourceFinder, ResourceFinderResult};

use std::sync::Weak;

use crate::ctx::EvaluationCtx;
use crate::reference::ReferenceKind;
use crate::registry::PolicyMetaData;
use crate::status::Status;
use crate::tree::AbstractPolicy;
use crate::version::VersionConstraints;

/// Outcome of a policy lookup.
#[derive(Debug, Clone)]
pub enum PolicyFinderResult {
    NotApplicable,
    Indeterminate(Status),
    Found(AbstractPolicy),
}

impl PolicyFinderResult {
    pub fn not_applicable(&self) -> bool {
        matches!(self, PolicyFinderResult::NotApplicable)
    }

    pub fn indeterminate(&self) -> bool {
        matches!(self, PolicyFinderResult::Indeterminate(_))
    }

    pub fn status(&self) -> Option<&Status> {
        match self {
            PolicyFinderResult::Indeterminate(status) => Some(status),
            _ => None,
        }
    }

    pub fn policy(&self) -> Option<&AbstractPolicy> {
        match self {
            PolicyFinderResult::Found(policy) => Some(policy),
            _ => None,
        }
    }
}

/// Source of policies for the PDP and for policy references.
pub trait PolicyFinder: Send + Sync {
    /// The single policy applicable to this request. More than one
    /// applicable policy is an error, not a choice.
    fn find_policy(&self, ctx: &dyn EvaluationCtx) -> PolicyFinderResult;

    /// The policy a reference points at, honouring its version constraints.
    fn find_policy_by_reference(
        &self,
        reference: &str,
        kind: ReferenceKind,
        constraints: &VersionConstraints,
        parent_meta: &PolicyMetaData,
    ) -> PolicyFinderResult;
}

/// One pluggable source inside a `ModularPolicyFinder`.
///
/// Modules that parse policies receive the finder at `init` so the
/// references they build resolve through it.
pub trait PolicyFinderModule: Send + Sync {
    fn name(&self) -> &str;

    fn init(&self, _finder: &Weak<dyn PolicyFinder>) {}

    fn supports_request(&self) -> bool {
        false
    }

    fn supports_reference(&self) -> bool {
        false
    }

    fn find_policy(&self, _ctx: &dyn EvaluationCtx) -> PolicyFinderResult {
        PolicyFinderResult::NotApplicable
    }

    fn find_policy_by_reference(
        &self,
        _reference: &str,
        _kind: ReferenceKind,
        _constraints: &VersionConstraints,
        _parent_meta: &PolicyMetaData,
    ) -> PolicyFinderResult {
        PolicyFinderResult::NotApplicable
    }
}
