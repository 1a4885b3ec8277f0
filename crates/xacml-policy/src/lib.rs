//! # xacml-policy
//!
//! XACML 1.x / 2.0 policy decision engine.
//!
//! A [`Pdp`] takes a [`RequestCtx`], asks its [`PolicyFinder`] for the one
//! applicable top-level policy, and evaluates it into a [`ResponseCtx`].
//! Policy trees are read from XML by the [`PolicyReader`] and can be written
//! back with [`AbstractPolicy::encode_to_string`].
//!
//! ## Key invariants
//!
//! - **The PDP always answers**: malformed requests, missing attributes and
//!   unresolvable references become INDETERMINATE results with a status,
//!   never errors.
//! - **Obligations follow the decision**: an obligation is attached only when
//!   its `FulfillOn` effect equals the final decision of its policy.
//! - **References resolve on every access**: a `PolicyReference` never caches
//!   the policy it found, so a reloaded store is seen immediately.
//! - **Load-time strictness**: type errors, unknown functions, unknown
//!   algorithms and variable cycles are rejected while reading the policy.

pub mod attr;
pub mod combine;
pub mod ctx;
pub mod encode;
pub mod error;
pub mod expr;
pub mod finder;
pub mod func;
pub mod obligation;
pub mod pdp;
pub mod policy;
pub mod policy_set;
pub mod reader;
pub mod reference;
pub mod registry;
pub mod result;
pub mod rule;
pub mod select;
pub mod status;
pub mod target;
pub mod tree;
pub mod version;

pub use attr::{AttributeFactory, AttributeValue, Bag};
pub use combine::{CombinerParameter, CombiningAlgRegistry, CombiningAlgorithm};
pub use ctx::{BasicEvaluationCtx, Category, EvaluationCtx, RequestCtx, Scope};
pub use error::{ParsingError, ResolutionError};
pub use finder::{
    AttributeFinder, MemoryPolicyModule, ModularPolicyFinder, PolicyFinder, PolicyFinderModule,
    PolicyFinderResult, ResourceFinder, ResourceFinderResult,
};
pub use func::FunctionRegistry;
pub use obligation::{AttributeAssignment, Obligation};
pub use pdp::{Pdp, PdpConfig};
pub use policy::Policy;
pub use policy_set::PolicySet;
pub use reader::PolicyReader;
pub use reference::{PolicyReference, ReferenceKind};
pub use registry::{PolicyMetaData, Registry};
pub use result::{Decision, DecisionResult, Effect, ResponseCtx};
pub use rule::Rule;
pub use status::Status;
pub use target::{MatchResult, Target, XacmlVersion};
pub use tree::{AbstractPolicy, PolicyTreeElement};
pub use version::VersionConstraints;
