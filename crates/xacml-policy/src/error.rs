// error.rs — Error types for the decision engine.
//
// Two families live here. `ParsingError` covers anything structurally
// wrong with a policy document or request, and is raised at load time.
// `ResolutionError` is what a `PolicyReference` accessor returns when the
// referenced policy cannot be fetched. Evaluation-time problems are never
// errors: they travel as `Status` values inside INDETERMINATE results.

use thiserror::Error;

use crate::status::Status;

/// Structural failures found while reading policies, requests or configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParsingError {
    /// A policy file could not be read from disk.
    #[error("cannot read {path}: {reason}")]
    Read { path: String, reason: String },

    /// The input is not well-formed XML.
    #[error("malformed XML: {0}")]
    Xml(String),

    /// An element appeared where a different one was required.
    #[error("unexpected element <{found}>, expected {expected}")]
    UnexpectedElement { expected: String, found: String },

    /// A required XML attribute is absent.
    #[error("missing required attribute '{attribute}' on <{element}>")]
    MissingAttribute { element: String, attribute: String },

    /// No combining algorithm is registered under this identifier.
    #[error("unknown combining algorithm '{0}'")]
    UnknownCombiningAlgorithm(String),

    /// A rule-combining algorithm was given to a policy set, or vice versa.
    #[error("combining algorithm '{algorithm}' cannot combine {expected}")]
    WrongCombiningKind { algorithm: String, expected: String },

    /// No function is registered under this identifier.
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    /// No attribute datatype is registered under this identifier.
    #[error("unknown data type '{0}'")]
    UnknownDataType(String),

    /// A literal could not be parsed as its declared datatype.
    #[error("invalid {data_type} value '{value}': {reason}")]
    InvalidValue {
        data_type: String,
        value: String,
        reason: String,
    },

    /// Function arguments do not match the function's signature.
    #[error("type error in {function}: {reason}")]
    TypeMismatch { function: String, reason: String },

    /// Two `VariableDefinition`s in one policy share an id.
    #[error("duplicate variable definition '{0}'")]
    DuplicateVariable(String),

    /// A `VariableReference` names a definition that does not exist.
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),

    /// Variable definitions reference each other in a cycle.
    #[error("circular variable reference through '{0}'")]
    CircularVariable(String),

    /// A combiner parameter block names a child that does not exist.
    #[error("combiner parameters reference unknown element '{0}'")]
    UnmatchedCombinerParameters(String),

    /// A policy version is not a dotted sequence of integers.
    #[error("invalid version '{0}'")]
    InvalidVersion(String),

    /// A rule or obligation carries an effect other than Permit or Deny.
    #[error("invalid effect '{0}'")]
    InvalidEffect(String),

    /// The request cannot be turned into an evaluation context.
    #[error("invalid request: {0}")]
    Request(String),

    /// Any other structural inconsistency.
    #[error("{0}")]
    Invalid(String),
}

impl From<roxmltree::Error> for ParsingError {
    fn from(err: roxmltree::Error) -> Self {
        ParsingError::Xml(err.to_string())
    }
}

/// Failure to resolve a `PolicyReference` into a concrete policy.
///
/// Resolution is always a fresh call into the `PolicyFinder`, so the same
/// reference can fail on one access and succeed on the next.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolutionError {
    /// The finder had no policy satisfying the reference.
    #[error("policy reference '{0}' could not be resolved")]
    NotFound(String),

    /// The finder reported an error while searching.
    #[error("policy reference '{reference}' resolution failed: {status}")]
    Indeterminate { reference: String, status: Status },

    /// The finder the reference was built against has been dropped.
    #[error("no policy finder available to resolve '{0}'")]
    FinderUnavailable(String),
}

impl ResolutionError {
    /// Status to attach to an INDETERMINATE result caused by this failure.
    pub fn status(&self) -> Status {
        match self {
            ResolutionError::Indeterminate { status, .. } => status.clone(),
            other => Status::processing_error(other.to_string()),
        }
    }
}
