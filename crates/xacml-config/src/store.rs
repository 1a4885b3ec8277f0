// store.rs — Loaded configuration and the PDPs it describes.
//
// Loading validates everything that can be checked without touching the
// filesystem beyond the config file itself: the TOML shape, that every
// module kind has a registered factory, and that `default_pdp` names a
// configured PDP. Modules are built when a PDP is requested, so each call
// to `pdp()` yields an independent engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use xacml_policy::attr::AttributeFactory;
use xacml_policy::combine::CombiningAlgRegistry;
use xacml_policy::finder::{ChainedAttributeFinder, ChainedResourceFinder};
use xacml_policy::{
    AttributeFinder, FunctionRegistry, ModularPolicyFinder, Pdp, PdpConfig, Registry,
    ResourceFinder,
};

use crate::config::{ConfigFile, PdpSection, RegistrySection};
use crate::error::ConfigError;
use crate::modules::{ModuleContext, ModuleRegistry};

pub struct ConfigurationStore {
    config: ConfigFile,
    base_dir: PathBuf,
    modules: ModuleRegistry,
    registry: Arc<Registry>,
}

impl ConfigurationStore {
    /// Load a config file with the built-in module kinds.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with(path, ModuleRegistry::standard())
    }

    /// Load a config file with a caller-supplied module table.
    pub fn load_with(path: &Path, modules: ModuleRegistry) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let store = Self::parse(&text, base_dir, modules)?;
        tracing::info!(
            path = %path.display(),
            pdps = store.config.pdp.len(),
            "configuration loaded"
        );
        Ok(store)
    }

    /// Parse configuration text; relative module paths resolve against `base_dir`.
    pub fn parse(
        text: &str,
        base_dir: impl Into<PathBuf>,
        modules: ModuleRegistry,
    ) -> Result<Self, ConfigError> {
        let config: ConfigFile = toml::from_str(text)?;
        Self::from_config(config, base_dir, modules)
    }

    pub fn from_config(
        config: ConfigFile,
        base_dir: impl Into<PathBuf>,
        modules: ModuleRegistry,
    ) -> Result<Self, ConfigError> {
        if let Some(name) = &config.default_pdp {
            if !config.pdp.contains_key(name) {
                return Err(ConfigError::UnknownPdp(name.clone()));
            }
        }
        for section in config.pdp.values() {
            modules.check_kinds(
                &section.policy_finder,
                &section.attribute_finder,
                &section.resource_finder,
            )?;
        }
        let registry = Arc::new(build_registry(&config.registry));
        Ok(Self {
            config,
            base_dir: base_dir.into(),
            modules,
            registry,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Names of every configured PDP.
    pub fn supported_pdps(&self) -> Vec<&str> {
        self.config.pdp.keys().map(String::as_str).collect()
    }

    /// The PDP named by `default_pdp`, or the only PDP when there is one.
    pub fn default_pdp(&self) -> Result<Pdp, ConfigError> {
        match (&self.config.default_pdp, self.config.pdp.len()) {
            (Some(name), _) => self.pdp(name),
            (None, 1) => {
                let name = self.config.pdp.keys().next().ok_or(ConfigError::NoDefaultPdp)?;
                self.pdp(name)
            }
            (None, _) => Err(ConfigError::NoDefaultPdp),
        }
    }

    pub fn pdp(&self, name: &str) -> Result<Pdp, ConfigError> {
        let section = self
            .config
            .pdp
            .get(name)
            .ok_or_else(|| ConfigError::UnknownPdp(name.to_string()))?;
        let pdp = Pdp::new(self.pdp_config(section)?);
        tracing::info!(pdp = name, "PDP ready");
        Ok(pdp)
    }

    fn pdp_config(&self, section: &PdpSection) -> Result<PdpConfig, ConfigError> {
        let ctx = ModuleContext {
            base_dir: &self.base_dir,
            registry: &self.registry,
        };
        let mut config = PdpConfig::new();

        if !section.policy_finder.is_empty() {
            let modules = section
                .policy_finder
                .iter()
                .map(|entry| self.modules.build_policy_module(entry, &ctx))
                .collect::<Result<Vec<_>, _>>()?;
            config = config.with_policy_finder(ModularPolicyFinder::new(modules));
        }

        let mut attributes = section
            .attribute_finder
            .iter()
            .map(|entry| self.modules.build_attribute_module(entry, &ctx))
            .collect::<Result<Vec<Arc<dyn AttributeFinder>>, _>>()?;
        if attributes.len() == 1 {
            config = config.with_attribute_finder(attributes.remove(0));
        } else if !attributes.is_empty() {
            config =
                config.with_attribute_finder(Arc::new(ChainedAttributeFinder::new(attributes)));
        }

        let mut resources = section
            .resource_finder
            .iter()
            .map(|entry| self.modules.build_resource_module(entry, &ctx))
            .collect::<Result<Vec<Arc<dyn ResourceFinder>>, _>>()?;
        if resources.len() == 1 {
            config = config.with_resource_finder(resources.remove(0));
        } else if !resources.is_empty() {
            config = config.with_resource_finder(Arc::new(ChainedResourceFinder::new(resources)));
        }

        Ok(config)
    }
}

fn build_registry(section: &RegistrySection) -> Registry {
    Registry::new(
        if section.use_standard_datatypes {
            AttributeFactory::standard()
        } else {
            AttributeFactory::new()
        },
        if section.use_standard_functions {
            FunctionRegistry::standard()
        } else {
            FunctionRegistry::new()
        },
        if section.use_standard_algorithms {
            CombiningAlgRegistry::standard()
        } else {
            CombiningAlgRegistry::new()
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use xacml_policy::attr::types;

    fn store(text: &str) -> Result<ConfigurationStore, ConfigError> {
        ConfigurationStore::parse(text, "/tmp", ModuleRegistry::standard())
    }

    #[test]
    fn default_must_name_a_configured_pdp() {
        match store("default_pdp = \"missing\"") {
            Err(ConfigError::UnknownPdp(name)) => assert_eq!(name, "missing"),
            Err(other) => panic!("expected UnknownPdp, got {:?}", other),
            Ok(_) => panic!("expected UnknownPdp, got a store"),
        }
    }

    #[test]
    fn unknown_module_kind_fails_at_load() {
        let text = r#"
            [[pdp.main.attribute_finder]]
            kind = "ldap"
        "#;
        match store(text) {
            Err(ConfigError::UnknownModule { role, kind }) => {
                assert_eq!(role, "attribute");
                assert_eq!(kind, "ldap");
            }
            Err(other) => panic!("expected UnknownModule, got {:?}", other),
            Ok(_) => panic!("expected UnknownModule, got a store"),
        }
    }

    #[test]
    fn single_pdp_is_the_default() {
        let one = store("[pdp.only]").unwrap();
        assert_eq!(one.supported_pdps(), vec!["only"]);
        assert!(one.default_pdp().is_ok());
        assert!(matches!(one.pdp("other"), Err(ConfigError::UnknownPdp(_))));

        let two = store("[pdp.a]\n[pdp.b]").unwrap();
        assert!(matches!(two.default_pdp(), Err(ConfigError::NoDefaultPdp)));
    }

    #[test]
    fn registry_section_controls_tables() {
        let limited = store("[registry]\nuse_standard_datatypes = false").unwrap();
        assert!(!limited.registry().attributes.supports(types::STRING));
        assert!(!limited.registry().functions.is_empty());
    }
}
