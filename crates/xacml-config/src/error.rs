// error.rs — Error types for PDP configuration.

use thiserror::Error;
use xacml_policy::ParsingError;

/// Errors raised while loading a configuration or wiring a PDP from it.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML or has the wrong shape.
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// No factory is registered for a module kind.
    #[error("unknown {role} module kind '{kind}'")]
    UnknownModule { role: String, kind: String },

    /// A module entry's settings do not fit its kind.
    #[error("invalid settings for '{kind}' module: {reason}")]
    InvalidSettings { kind: String, reason: String },

    /// A PDP name that is not configured.
    #[error("no PDP named '{0}' is configured")]
    UnknownPdp(String),

    /// No `default_pdp` and more than one PDP to choose from.
    #[error("no default PDP configured")]
    NoDefaultPdp,

    /// A policy file glob is malformed.
    #[error("invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// A configured attribute value does not parse as its datatype.
    #[error("invalid configured value: {0}")]
    Value(#[from] ParsingError),
}
