// directory.rs — Policy finder module backed by a directory of XML files.
//
// Files are read when the module is attached to a finder (so references
// inside them resolve through that finder) and again on every `reload()`.
// A file that does not parse is skipped with a warning; the rest still
// load. Matching and reference lookup are delegated to an in-memory store.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, Weak};

use serde::Deserialize;
use xacml_policy::finder::MemoryPolicyModule;
use xacml_policy::{
    AbstractPolicy, EvaluationCtx, PolicyFinder, PolicyFinderModule, PolicyFinderResult,
    PolicyMetaData, PolicyReader, ReferenceKind, Registry, VersionConstraints,
};

use crate::config::ModuleEntry;
use crate::error::ConfigError;
use crate::modules::{settings, ModuleContext};

pub const DEFAULT_PATTERN: &str = "*.xml";

#[derive(Debug, Deserialize)]
struct DirectorySettings {
    path: PathBuf,
    #[serde(default = "default_pattern")]
    pattern: String,
}

fn default_pattern() -> String {
    DEFAULT_PATTERN.to_string()
}

pub struct DirectoryPolicyModule {
    dir: PathBuf,
    pattern: String,
    registry: Arc<Registry>,
    finder: RwLock<Option<Weak<dyn PolicyFinder>>>,
    store: MemoryPolicyModule,
}

impl DirectoryPolicyModule {
    pub fn new(dir: impl Into<PathBuf>, registry: Arc<Registry>) -> Self {
        Self {
            dir: dir.into(),
            pattern: default_pattern(),
            registry,
            finder: RwLock::new(None),
            store: MemoryPolicyModule::new(),
        }
    }

    /// File-name glob inside the directory, `*.xml` unless set.
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Result<Self, ConfigError> {
        let pattern = pattern.into();
        glob::Pattern::new(&pattern)?;
        self.pattern = pattern;
        Ok(self)
    }

    pub(crate) fn from_entry(
        entry: &ModuleEntry,
        ctx: &ModuleContext<'_>,
    ) -> Result<Self, ConfigError> {
        let settings: DirectorySettings = settings(entry)?;
        Self::new(ctx.resolve(&settings.path), ctx.registry.clone()).with_pattern(settings.pattern)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Policies currently loaded.
    pub fn policies(&self) -> Vec<AbstractPolicy> {
        self.store.policies()
    }

    /// Re-read every matching file, replacing what was loaded before.
    /// Returns the number of policies loaded.
    pub fn reload(&self) -> Result<usize, ConfigError> {
        let pattern = format!(
            "{}/{}",
            glob::Pattern::escape(&self.dir.to_string_lossy()),
            self.pattern
        );
        let mut reader = PolicyReader::new(self.registry.clone());
        if let Some(finder) = self
            .finder
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
        {
            reader = reader.with_finder(finder);
        }

        let mut policies = Vec::new();
        for entry in glob::glob(&pattern)? {
            let path = match entry {
                Ok(path) => path,
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unreadable policy path");
                    continue;
                }
            };
            match reader.read_file(&path) {
                Ok(policy) => policies.push(policy),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping policy file");
                }
            }
        }

        let count = policies.len();
        self.store.replace_all(policies);
        tracing::info!(dir = %self.dir.display(), count, "loaded policy directory");
        Ok(count)
    }
}

impl PolicyFinderModule for DirectoryPolicyModule {
    fn name(&self) -> &str {
        "directory"
    }

    fn init(&self, finder: &Weak<dyn PolicyFinder>) {
        *self.finder.write().unwrap_or_else(|e| e.into_inner()) = Some(finder.clone());
        if let Err(err) = self.reload() {
            tracing::warn!(dir = %self.dir.display(), error = %err, "policy directory not loaded");
        }
    }

    fn supports_request(&self) -> bool {
        true
    }

    fn supports_reference(&self) -> bool {
        true
    }

    fn find_policy(&self, ctx: &dyn EvaluationCtx) -> PolicyFinderResult {
        self.store.find_policy(ctx)
    }

    fn find_policy_by_reference(
        &self,
        reference: &str,
        kind: ReferenceKind,
        constraints: &VersionConstraints,
        parent_meta: &PolicyMetaData,
    ) -> PolicyFinderResult {
        self.store
            .find_policy_by_reference(reference, kind, constraints, parent_meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use xacml_policy::{BasicEvaluationCtx, Decision, ModularPolicyFinder, RequestCtx};

    const NS: &str = "urn:oasis:names:tc:xacml:2.0:policy:schema:os";
    const FIRST_APPLICABLE: &str =
        "urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:first-applicable";

    fn policy(id: &str, effect: &str) -> String {
        format!(
            r#"<Policy xmlns="{NS}" PolicyId="{id}" RuleCombiningAlgId="{FIRST_APPLICABLE}">
              <Rule RuleId="r" Effect="{effect}"/>
            </Policy>"#
        )
    }

    fn ctx() -> BasicEvaluationCtx {
        BasicEvaluationCtx::new(RequestCtx::new().with_resource_id("doc"), None).unwrap()
    }

    #[test]
    fn loads_matching_files_and_skips_broken_ones() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("good.xml"), policy("urn:good", "Permit")).unwrap();
        fs::write(dir.path().join("broken.xml"), "<Policy").unwrap();
        fs::write(dir.path().join("notes.txt"), policy("urn:ignored", "Deny")).unwrap();

        let module = DirectoryPolicyModule::new(dir.path(), Arc::new(Registry::standard()));
        assert_eq!(module.reload().unwrap(), 1);
        assert_eq!(module.policies()[0].id(), "urn:good");
    }

    #[test]
    fn attaching_to_a_finder_loads_and_reload_picks_up_changes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("p.xml"), policy("urn:p", "Permit")).unwrap();

        let registry = Arc::new(Registry::standard());
        let module = Arc::new(DirectoryPolicyModule::new(dir.path(), registry));
        let finder = ModularPolicyFinder::new(vec![module.clone() as Arc<dyn PolicyFinderModule>]);
        match finder.find_policy(&ctx()) {
            PolicyFinderResult::Found(p) => {
                assert_eq!(p.evaluate(&ctx()).decision, Decision::Permit)
            }
            other => panic!("expected Found, got {:?}", other),
        }

        fs::write(dir.path().join("p.xml"), policy("urn:p", "Deny")).unwrap();
        module.reload().unwrap();
        match finder.find_policy(&ctx()) {
            PolicyFinderResult::Found(p) => assert_eq!(p.evaluate(&ctx()).decision, Decision::Deny),
            other => panic!("expected Found, got {:?}", other),
        }
    }

    #[test]
    fn custom_pattern_and_bad_pattern() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.policy"), policy("urn:a", "Permit")).unwrap();
        let module = DirectoryPolicyModule::new(dir.path(), Arc::new(Registry::standard()))
            .with_pattern("*.policy")
            .unwrap();
        assert_eq!(module.reload().unwrap(), 1);

        assert!(DirectoryPolicyModule::new(dir.path(), Arc::new(Registry::standard()))
            .with_pattern("[")
            .is_err());
    }
}
