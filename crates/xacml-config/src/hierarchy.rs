// hierarchy.rs — Resource finder over a configured parent -> children map.
//
// Children keep the datatype of the parent id they were found under.
// Descendants are every resource reachable from the parent, each listed
// once in breadth-first order; a cycle in the map does not loop.

use std::collections::{BTreeMap, HashSet, VecDeque};

use serde::Deserialize;
use xacml_policy::{AttributeValue, EvaluationCtx, ResourceFinder, ResourceFinderResult};

use crate::config::ModuleEntry;
use crate::error::ConfigError;
use crate::modules::settings;

#[derive(Debug, Deserialize)]
struct HierarchySettings {
    #[serde(default)]
    children: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct HierarchyResourceFinder {
    children: BTreeMap<String, Vec<String>>,
}

impl HierarchyResourceFinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_children<I, S>(mut self, parent: impl Into<String>, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.children
            .entry(parent.into())
            .or_default()
            .extend(children.into_iter().map(Into::into));
        self
    }

    pub(crate) fn from_entry(entry: &ModuleEntry) -> Result<Self, ConfigError> {
        let settings: HierarchySettings = settings(entry)?;
        Ok(Self {
            children: settings.children,
        })
    }

    fn children_of(&self, parent: &str) -> &[String] {
        self.children.get(parent).map(Vec::as_slice).unwrap_or(&[])
    }

    fn descendants_of(&self, parent: &str) -> Vec<&str> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([parent]);
        let mut found = Vec::new();
        seen.insert(parent);
        while let Some(next) = queue.pop_front() {
            for child in self.children_of(next) {
                if seen.insert(child.as_str()) {
                    found.push(child.as_str());
                    queue.push_back(child.as_str());
                }
            }
        }
        found
    }
}

/// A resource id with the same datatype as `like`.
fn resource_like(like: &AttributeValue, id: &str) -> AttributeValue {
    match like {
        AttributeValue::AnyUri(_) => AttributeValue::any_uri(id),
        _ => AttributeValue::string(id),
    }
}

impl ResourceFinder for HierarchyResourceFinder {
    fn find_child_resources(
        &self,
        parent: &AttributeValue,
        _ctx: &dyn EvaluationCtx,
    ) -> ResourceFinderResult {
        let resources = self
            .children_of(&parent.encode())
            .iter()
            .map(|id| resource_like(parent, id))
            .collect();
        ResourceFinderResult::new(resources)
    }

    fn find_descendant_resources(
        &self,
        parent: &AttributeValue,
        _ctx: &dyn EvaluationCtx,
    ) -> ResourceFinderResult {
        let resources = self
            .descendants_of(&parent.encode())
            .into_iter()
            .map(|id| resource_like(parent, id))
            .collect();
        ResourceFinderResult::new(resources)
    }
}
