// registry.rs — Per-engine tables of datatypes, functions and algorithms.
//
// Nothing in the engine reaches for a global factory. A `Registry` is
// built once at startup and handed to the reader through
// `PolicyMetaData`, so two engines with different extensions can run side
// by side.

use std::sync::Arc;

use crate::attr::AttributeFactory;
use crate::combine::CombiningAlgRegistry;
use crate::func::FunctionRegistry;
use crate::target::XacmlVersion;

#[derive(Debug, Clone)]
pub struct Registry {
    pub attributes: Arc<AttributeFactory>,
    pub functions: FunctionRegistry,
    pub algorithms: CombiningAlgRegistry,
}

impl Registry {
    pub fn new(
        attributes: AttributeFactory,
        functions: FunctionRegistry,
        algorithms: CombiningAlgRegistry,
    ) -> Self {
        Self {
            attributes: Arc::new(attributes),
            functions,
            algorithms,
        }
    }

    /// Every built-in datatype, function and combining algorithm.
    pub fn standard() -> Self {
        Self::new(
            AttributeFactory::standard(),
            FunctionRegistry::standard(),
            CombiningAlgRegistry::standard(),
        )
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Document-level facts a policy carries alongside its tree.
#[derive(Debug, Clone)]
pub struct PolicyMetaData {
    pub xacml_version: XacmlVersion,
    /// Value of `XPathVersion` in `PolicyDefaults` / `PolicySetDefaults`.
    pub xpath_version: Option<String>,
    pub registry: Arc<Registry>,
}

impl PolicyMetaData {
    pub fn new(xacml_version: XacmlVersion, registry: Arc<Registry>) -> Self {
        Self {
            xacml_version,
            xpath_version: None,
            registry,
        }
    }

    pub fn with_xpath_version(mut self, version: impl Into<String>) -> Self {
        self.xpath_version = Some(version.into());
        self
    }
}

impl Default for PolicyMetaData {
    fn default() -> Self {
        Self::new(XacmlVersion::default(), Arc::new(Registry::standard()))
    }
}
