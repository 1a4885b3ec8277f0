//! # xacml-config
//!
//! PDP configuration for the XACML decision engine.
//!
//! A TOML file names one or more PDPs and lists the finder modules each one
//! is wired from. Module kinds resolve through an explicit [`ModuleRegistry`]
//! filled at startup; nothing is discovered at runtime.
//!
//! Built-in kinds:
//! - `directory`: policies read from XML files in a directory ([`DirectoryPolicyModule`])
//! - `static`: attribute values declared in the config ([`StaticAttributeModule`])
//! - `hierarchy`: a parent/children resource map ([`HierarchyResourceFinder`])

pub mod config;
pub mod directory;
pub mod error;
pub mod hierarchy;
pub mod modules;
pub mod static_attrs;
pub mod store;

pub use config::{ConfigFile, ModuleEntry, PdpSection, RegistrySection};
pub use directory::DirectoryPolicyModule;
pub use error::ConfigError;
pub use hierarchy::HierarchyResourceFinder;
pub use modules::{ModuleContext, ModuleRegistry};
pub use static_attrs::{StaticAttributeEntry, StaticAttributeModule};
pub use store::ConfigurationStore;
