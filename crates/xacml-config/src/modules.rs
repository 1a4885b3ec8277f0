// modules.rs — Registration table for finder modules.
//
// A module kind named in a config file maps to a factory registered here
// at startup. The three built-in kinds are registered by `standard()`;
// embedders add their own with the `register_*` methods before loading a
// configuration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use xacml_policy::{AttributeFinder, PolicyFinderModule, Registry, ResourceFinder};

use crate::config::ModuleEntry;
use crate::directory::DirectoryPolicyModule;
use crate::error::ConfigError;
use crate::hierarchy::HierarchyResourceFinder;
use crate::static_attrs::StaticAttributeModule;

/// What a factory may need beyond its own settings.
pub struct ModuleContext<'a> {
    /// Directory of the configuration file; relative paths resolve against it.
    pub base_dir: &'a Path,
    pub registry: &'a Arc<Registry>,
}

impl ModuleContext<'_> {
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

type Factory<T> =
    Box<dyn Fn(&ModuleEntry, &ModuleContext<'_>) -> Result<Arc<T>, ConfigError> + Send + Sync>;

pub struct ModuleRegistry {
    policy: HashMap<String, Factory<dyn PolicyFinderModule>>,
    attribute: HashMap<String, Factory<dyn AttributeFinder>>,
    resource: HashMap<String, Factory<dyn ResourceFinder>>,
}

impl ModuleRegistry {
    /// An empty table.
    pub fn new() -> Self {
        Self {
            policy: HashMap::new(),
            attribute: HashMap::new(),
            resource: HashMap::new(),
        }
    }

    /// `directory`, `static` and `hierarchy`.
    pub fn standard() -> Self {
        let mut modules = Self::new();
        modules.register_policy_module("directory", |entry, ctx| {
            Ok(Arc::new(DirectoryPolicyModule::from_entry(entry, ctx)?))
        });
        modules.register_attribute_module("static", |entry, ctx| {
            Ok(Arc::new(StaticAttributeModule::from_entry(entry, ctx)?))
        });
        modules.register_resource_module("hierarchy", |entry, _| {
            Ok(Arc::new(HierarchyResourceFinder::from_entry(entry)?))
        });
        modules
    }

    pub fn register_policy_module<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&ModuleEntry, &ModuleContext<'_>) -> Result<Arc<dyn PolicyFinderModule>, ConfigError>
            + Send
            + Sync
            + 'static,
    {
        self.policy.insert(kind.into(), Box::new(factory));
    }

    pub fn register_attribute_module<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&ModuleEntry, &ModuleContext<'_>) -> Result<Arc<dyn AttributeFinder>, ConfigError>
            + Send
            + Sync
            + 'static,
    {
        self.attribute.insert(kind.into(), Box::new(factory));
    }

    pub fn register_resource_module<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&ModuleEntry, &ModuleContext<'_>) -> Result<Arc<dyn ResourceFinder>, ConfigError>
            + Send
            + Sync
            + 'static,
    {
        self.resource.insert(kind.into(), Box::new(factory));
    }

    pub fn build_policy_module(
        &self,
        entry: &ModuleEntry,
        ctx: &ModuleContext<'_>,
    ) -> Result<Arc<dyn PolicyFinderModule>, ConfigError> {
        build(&self.policy, "policy", entry, ctx)
    }

    pub fn build_attribute_module(
        &self,
        entry: &ModuleEntry,
        ctx: &ModuleContext<'_>,
    ) -> Result<Arc<dyn AttributeFinder>, ConfigError> {
        build(&self.attribute, "attribute", entry, ctx)
    }

    pub fn build_resource_module(
        &self,
        entry: &ModuleEntry,
        ctx: &ModuleContext<'_>,
    ) -> Result<Arc<dyn ResourceFinder>, ConfigError> {
        build(&self.resource, "resource", entry, ctx)
    }

    /// Fail on the first entry whose kind has no factory.
    pub(crate) fn check_kinds(
        &self,
        policy: &[ModuleEntry],
        attribute: &[ModuleEntry],
        resource: &[ModuleEntry],
    ) -> Result<(), ConfigError> {
        check(&self.policy, "policy", policy)?;
        check(&self.attribute, "attribute", attribute)?;
        check(&self.resource, "resource", resource)
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn build<T: ?Sized>(
    table: &HashMap<String, Factory<T>>,
    role: &str,
    entry: &ModuleEntry,
    ctx: &ModuleContext<'_>,
) -> Result<Arc<T>, ConfigError> {
    let factory = table.get(&entry.kind).ok_or_else(|| unknown(role, &entry.kind))?;
    factory(entry, ctx)
}

fn check<T: ?Sized>(
    table: &HashMap<String, Factory<T>>,
    role: &str,
    entries: &[ModuleEntry],
) -> Result<(), ConfigError> {
    match entries.iter().find(|e| !table.contains_key(&e.kind)) {
        Some(entry) => Err(unknown(role, &entry.kind)),
        None => Ok(()),
    }
}

fn unknown(role: &str, kind: &str) -> ConfigError {
    ConfigError::UnknownModule {
        role: role.to_string(),
        kind: kind.to_string(),
    }
}

/// Deserialize a module entry's settings into the struct its kind expects.
pub fn settings<T: DeserializeOwned>(entry: &ModuleEntry) -> Result<T, ConfigError> {
    toml::Value::Table(entry.settings.clone())
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::InvalidSettings {
            kind: entry.kind.clone(),
            reason: e.message().to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use xacml_policy::finder::ChainedResourceFinder;

    fn ctx(registry: &Arc<Registry>) -> ModuleContext<'_> {
        ModuleContext {
            base_dir: Path::new("/etc/xacml"),
            registry,
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let registry = Arc::new(Registry::standard());
        let modules = ModuleRegistry::standard();
        match modules.build_policy_module(&ModuleEntry::new("ldap"), &ctx(&registry)) {
            Err(ConfigError::UnknownModule { role, kind }) => {
                assert_eq!(role, "policy");
                assert_eq!(kind, "ldap");
            }
            Err(other) => panic!("expected UnknownModule, got {:?}", other),
            Ok(_) => panic!("expected UnknownModule, got a module"),
        }
        assert!(modules
            .check_kinds(&[], &[], &[ModuleEntry::new("static")])
            .is_err());
    }

    #[test]
    fn custom_kinds_can_be_registered() {
        let registry = Arc::new(Registry::standard());
        let mut modules = ModuleRegistry::new();
        modules.register_resource_module("none", |_, _| {
            Ok(Arc::new(ChainedResourceFinder::default()))
        });
        assert!(modules
            .build_resource_module(&ModuleEntry::new("none"), &ctx(&registry))
            .is_ok());
        assert!(modules
            .build_resource_module(&ModuleEntry::new("hierarchy"), &ctx(&registry))
            .is_err());
    }

    #[test]
    fn relative_paths_resolve_against_config_dir() {
        let registry = Arc::new(Registry::standard());
        let ctx = ctx(&registry);
        assert_eq!(ctx.resolve(Path::new("policies")), Path::new("/etc/xacml/policies"));
        assert_eq!(ctx.resolve(Path::new("/srv/p")), Path::new("/srv/p"));
    }

    #[test]
    fn bad_settings_name_the_kind() {
        let entry = ModuleEntry::new("directory").with_setting("path", 7_i64);
        #[derive(Debug, serde::Deserialize)]
        struct Dir {
            #[allow(dead_code)]
            path: String,
        }
        match settings::<Dir>(&entry) {
            Err(ConfigError::InvalidSettings { kind, .. }) => assert_eq!(kind, "directory"),
            other => panic!("expected InvalidSettings, got {:?}", other),
        }
    }
}
