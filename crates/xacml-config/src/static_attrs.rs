// static_attrs.rs — Attribute finder serving values declared in configuration.
//
// Values are parsed with the engine's attribute factory when the module is
// built, so a bad literal is a configuration error rather than a failed
// lookup. A lookup matches on category, attribute id and datatype; when the
// designator names an issuer, only entries with that issuer match.

use std::sync::Arc;

use serde::Deserialize;
use xacml_policy::attr::types;
use xacml_policy::expr::EvaluationResult;
use xacml_policy::{AttributeFinder, AttributeValue, Bag, Category, EvaluationCtx, Registry};

use crate::config::ModuleEntry;
use crate::error::ConfigError;
use crate::modules::{settings, ModuleContext};

#[derive(Debug, Deserialize)]
struct StaticSettings {
    #[serde(default)]
    attributes: Vec<StaticAttributeEntry>,
}

/// One `[[...attributes]]` entry of a `static` module.
#[derive(Debug, Clone, Deserialize)]
pub struct StaticAttributeEntry {
    pub category: Category,
    pub id: String,
    #[serde(default = "default_data_type")]
    pub data_type: String,
    #[serde(default)]
    pub issuer: Option<String>,
    pub values: Vec<String>,
}

fn default_data_type() -> String {
    types::STRING.to_string()
}

#[derive(Debug, Clone)]
struct StaticAttribute {
    category: Category,
    id: String,
    issuer: Option<String>,
    bag: Bag,
}

#[derive(Debug, Clone, Default)]
pub struct StaticAttributeModule {
    attributes: Vec<StaticAttribute>,
}

impl StaticAttributeModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(
        mut self,
        entry: StaticAttributeEntry,
        registry: &Registry,
    ) -> Result<Self, ConfigError> {
        let values = entry
            .values
            .iter()
            .map(|text| registry.attributes.create(&entry.data_type, text))
            .collect::<Result<Vec<AttributeValue>, _>>()?;
        self.attributes.push(StaticAttribute {
            category: entry.category,
            id: entry.id,
            issuer: entry.issuer,
            bag: Bag::new(entry.data_type, values),
        });
        Ok(self)
    }

    pub(crate) fn from_entry(
        entry: &ModuleEntry,
        ctx: &ModuleContext<'_>,
    ) -> Result<Self, ConfigError> {
        let settings: StaticSettings = settings(entry)?;
        let mut module = Self::new();
        for attribute in settings.attributes {
            module = module.with_entry(attribute, ctx.registry)?;
        }
        tracing::info!(attributes = module.len(), "static attribute module ready");
        Ok(module)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl AttributeFinder for StaticAttributeModule {
    fn find_attribute(
        &self,
        category: Category,
        data_type: &str,
        id: &str,
        issuer: Option<&str>,
        _subject_category: Option<&str>,
        _ctx: &dyn EvaluationCtx,
    ) -> EvaluationResult {
        let values: Vec<AttributeValue> = self
            .attributes
            .iter()
            .filter(|a| a.category == category && a.id == id && a.bag.data_type() == data_type)
            .filter(|a| issuer.map_or(true, |wanted| a.issuer.as_deref() == Some(wanted)))
            .flat_map(|a| a.bag.values().iter().cloned())
            .collect();
        EvaluationResult::Bag(Bag::new(data_type, values))
    }
}
