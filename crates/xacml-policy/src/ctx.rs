// ctx.rs — Requests and the per-request evaluation context.
//
// A `RequestCtx` is the decoded request: subjects, resource, action and
// environment attributes. `BasicEvaluationCtx` wraps one request for the
// lifetime of a single evaluation. It answers attribute lookups (request
// first, then the `AttributeFinder`), pins "current time" to one instant,
// and lets the PDP swap the resource id while expanding a scope.
//
// A context belongs to exactly one in-flight evaluation. It is not `Sync`
// and must not be shared across threads.

use std::cell::OnceCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attr::{types, AttributeValue, Bag};
use crate::error::ParsingError;
use crate::expr::EvaluationResult;
use crate::finder::AttributeFinder;
use crate::select;
use crate::status::Status;

pub const RESOURCE_ID: &str = "urn:oasis:names:tc:xacml:1.0:resource:resource-id";
pub const RESOURCE_SCOPE: &str = "urn:oasis:names:tc:xacml:1.0:resource:scope";
pub const ACCESS_SUBJECT: &str = "urn:oasis:names:tc:xacml:1.0:subject-category:access-subject";
pub const CURRENT_TIME: &str = "urn:oasis:names:tc:xacml:1.0:environment:current-time";
pub const CURRENT_DATE: &str = "urn:oasis:names:tc:xacml:1.0:environment:current-date";
pub const CURRENT_DATE_TIME: &str = "urn:oasis:names:tc:xacml:1.0:environment:current-dateTime";

/// The four attribute categories of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Subject,
    Resource,
    Action,
    Environment,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Subject => "Subject",
            Category::Resource => "Resource",
            Category::Action => "Action",
            Category::Environment => "Environment",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How far a request reaches below its resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    #[default]
    Immediate,
    Children,
    Descendants,
}

impl Scope {
    fn parse(text: &str) -> Option<Self> {
        match text {
            "Immediate" => Some(Scope::Immediate),
            "Children" => Some(Scope::Children),
            "Descendants" => Some(Scope::Descendants),
            _ => None,
        }
    }
}

/// One named attribute with its values. Several entries with the same id
/// contribute to the same bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    pub values: Vec<AttributeValue>,
}

impl Attribute {
    pub fn new(id: impl Into<String>, value: AttributeValue) -> Self {
        Self {
            id: id.into(),
            issuer: None,
            values: vec![value],
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }
}

/// A subject of the request, tagged with its subject category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    #[serde(default = "default_subject_category")]
    pub category: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

fn default_subject_category() -> String {
    ACCESS_SUBJECT.to_string()
}

/// A decoded access request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestCtx {
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub resource: Vec<Attribute>,
    #[serde(default)]
    pub action: Vec<Attribute>,
    #[serde(default)]
    pub environment: Vec<Attribute>,
    /// XML content of the resource, queried by attribute selectors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_content: Option<String>,
}

impl RequestCtx {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute to the access-subject, creating it if needed.
    pub fn with_subject_attr(mut self, id: impl Into<String>, value: AttributeValue) -> Self {
        let attribute = Attribute::new(id, value);
        match self.subjects.iter_mut().find(|s| s.category == ACCESS_SUBJECT) {
            Some(subject) => subject.attributes.push(attribute),
            None => self.subjects.push(Subject {
                category: default_subject_category(),
                attributes: vec![attribute],
            }),
        }
        self
    }

    pub fn with_resource_attr(mut self, id: impl Into<String>, value: AttributeValue) -> Self {
        self.resource.push(Attribute::new(id, value));
        self
    }

    /// Shorthand for a string `resource-id`.
    pub fn with_resource_id(self, id: impl Into<String>) -> Self {
        self.with_resource_attr(RESOURCE_ID, AttributeValue::string(id))
    }

    pub fn with_action_attr(mut self, id: impl Into<String>, value: AttributeValue) -> Self {
        self.action.push(Attribute::new(id, value));
        self
    }

    pub fn with_env_attr(mut self, id: impl Into<String>, value: AttributeValue) -> Self {
        self.environment.push(Attribute::new(id, value));
        self
    }

    pub fn with_resource_content(mut self, content: impl Into<String>) -> Self {
        self.resource_content = Some(content.into());
        self
    }
}

/// The request-facing interface used by every evaluation step.
pub trait EvaluationCtx {
    /// Identifier correlating log lines of one evaluation.
    fn request_id(&self) -> Uuid;

    fn scope(&self) -> Scope;

    fn resource_id(&self) -> &AttributeValue;

    /// Replace the resource id (scope expansion evaluates each child in turn).
    fn set_resource_id(&mut self, id: AttributeValue);

    fn subject_attribute(
        &self,
        data_type: &str,
        id: &str,
        issuer: Option<&str>,
        category: &str,
    ) -> EvaluationResult;

    fn resource_attribute(&self, data_type: &str, id: &str, issuer: Option<&str>)
        -> EvaluationResult;

    fn action_attribute(&self, data_type: &str, id: &str, issuer: Option<&str>)
        -> EvaluationResult;

    fn environment_attribute(&self, data_type: &str, id: &str, issuer: Option<&str>)
        -> EvaluationResult;

    fn current_time(&self) -> NaiveTime;

    fn current_date(&self) -> NaiveDate;

    fn current_date_time(&self) -> DateTime<Utc>;

    /// Run a selector path against the request's resource content and
    /// return the text of every selected node.
    fn select(
        &self,
        path: &str,
        namespaces: &HashMap<String, String>,
    ) -> Result<Vec<String>, Status>;

    /// Category-dispatching lookup used by designators.
    fn attribute(
        &self,
        category: Category,
        data_type: &str,
        id: &str,
        issuer: Option<&str>,
        subject_category: Option<&str>,
    ) -> EvaluationResult {
        match category {
            Category::Subject => self.subject_attribute(
                data_type,
                id,
                issuer,
                subject_category.unwrap_or(ACCESS_SUBJECT),
            ),
            Category::Resource => self.resource_attribute(data_type, id, issuer),
            Category::Action => self.action_attribute(data_type, id, issuer),
            Category::Environment => self.environment_attribute(data_type, id, issuer),
        }
    }
}

/// The standard `EvaluationCtx` over a `RequestCtx`.
pub struct BasicEvaluationCtx {
    request_id: Uuid,
    subjects: Vec<Subject>,
    resource: Vec<Attribute>,
    action: Vec<Attribute>,
    environment: Vec<Attribute>,
    resource_content: Option<String>,
    resource_id: AttributeValue,
    scope: Scope,
    attribute_finder: Option<Arc<dyn AttributeFinder>>,
    clock: OnceCell<DateTime<Utc>>,
}

impl BasicEvaluationCtx {
    /// Wrap a request. Fails when the resource does not carry exactly one
    /// `resource-id` or the `scope` attribute is not a single known value.
    pub fn new(
        request: RequestCtx,
        attribute_finder: Option<Arc<dyn AttributeFinder>>,
    ) -> Result<Self, ParsingError> {
        let mut ids = values_of(&request.resource, RESOURCE_ID);
        if ids.len() != 1 {
            return Err(ParsingError::Request(format!(
                "resource must carry exactly one resource-id, found {}",
                ids.len()
            )));
        }
        let resource_id = ids.remove(0);

        let scopes = values_of(&request.resource, RESOURCE_SCOPE);
        let scope = match scopes.as_slice() {
            [] => Scope::Immediate,
            [value] => value
                .as_str()
                .and_then(Scope::parse)
                .ok_or_else(|| {
                    ParsingError::Request(format!("unknown scope '{}'", value.encode()))
                })?,
            _ => {
                return Err(ParsingError::Request(
                    "resource scope must have a single value".to_string(),
                ))
            }
        };

        let clock = match values_of(&request.environment, CURRENT_DATE_TIME)
            .into_iter()
            .find(|v| v.data_type() == types::DATE_TIME)
        {
            Some(AttributeValue::DateTime(now)) => OnceCell::from(now),
            _ => OnceCell::new(),
        };

        Ok(Self {
            request_id: Uuid::new_v4(),
            subjects: request.subjects,
            resource: request.resource,
            action: request.action,
            environment: request.environment,
            resource_content: request.resource_content,
            resource_id,
            scope,
            attribute_finder,
            clock,
        })
    }

    fn now(&self) -> DateTime<Utc> {
        *self.clock.get_or_init(Utc::now)
    }

    fn lookup(
        &self,
        attributes: &[Attribute],
        category: Category,
        data_type: &str,
        id: &str,
        issuer: Option<&str>,
        subject_category: Option<&str>,
    ) -> EvaluationResult {
        let values: Vec<AttributeValue> = attributes
            .iter()
            .filter(|a| a.id == id && issuer.map_or(true, |i| a.issuer.as_deref() == Some(i)))
            .flat_map(|a| a.values.iter().filter(|v| v.data_type() == data_type).cloned())
            .collect();
        if !values.is_empty() {
            return EvaluationResult::Bag(Bag::new(data_type, values));
        }

        if category == Category::Environment {
            if let Some(value) = self.clock_value(data_type, id) {
                return EvaluationResult::Bag(Bag::single(value));
            }
        }

        match &self.attribute_finder {
            Some(finder) => {
                tracing::debug!(
                    request = %self.request_id,
                    %category,
                    attribute = id,
                    "attribute not in request, asking finder"
                );
                finder.find_attribute(category, data_type, id, issuer, subject_category, self)
            }
            None => EvaluationResult::Bag(Bag::empty(data_type)),
        }
    }

    fn clock_value(&self, data_type: &str, id: &str) -> Option<AttributeValue> {
        match (id, data_type) {
            (CURRENT_TIME, types::TIME) => Some(AttributeValue::Time(self.current_time())),
            (CURRENT_DATE, types::DATE) => Some(AttributeValue::Date(self.current_date())),
            (CURRENT_DATE_TIME, types::DATE_TIME) => {
                Some(AttributeValue::DateTime(self.current_date_time()))
            }
            _ => None,
        }
    }
}

fn values_of(attributes: &[Attribute], id: &str) -> Vec<AttributeValue> {
    attributes
        .iter()
        .filter(|a| a.id == id)
        .flat_map(|a| a.values.iter().cloned())
        .collect()
}

impl EvaluationCtx for BasicEvaluationCtx {
    fn request_id(&self) -> Uuid {
        self.request_id
    }

    fn scope(&self) -> Scope {
        self.scope
    }

    fn resource_id(&self) -> &AttributeValue {
        &self.resource_id
    }

    fn set_resource_id(&mut self, id: AttributeValue) {
        self.resource.retain(|a| a.id != RESOURCE_ID);
        self.resource.push(Attribute::new(RESOURCE_ID, id.clone()));
        self.resource_id = id;
    }

    fn subject_attribute(
        &self,
        data_type: &str,
        id: &str,
        issuer: Option<&str>,
        category: &str,
    ) -> EvaluationResult {
        let attributes: Vec<Attribute> = self
            .subjects
            .iter()
            .filter(|s| s.category == category)
            .flat_map(|s| s.attributes.iter().cloned())
            .collect();
        self.lookup(&attributes, Category::Subject, data_type, id, issuer, Some(category))
    }

    fn resource_attribute(
        &self,
        data_type: &str,
        id: &str,
        issuer: Option<&str>,
    ) -> EvaluationResult {
        self.lookup(&self.resource, Category::Resource, data_type, id, issuer, None)
    }

    fn action_attribute(
        &self,
        data_type: &str,
        id: &str,
        issuer: Option<&str>,
    ) -> EvaluationResult {
        self.lookup(&self.action, Category::Action, data_type, id, issuer, None)
    }

    fn environment_attribute(
        &self,
        data_type: &str,
        id: &str,
        issuer: Option<&str>,
    ) -> EvaluationResult {
        self.lookup(&self.environment, Category::Environment, data_type, id, issuer, None)
    }

    fn current_time(&self) -> NaiveTime {
        self.now().time()
    }

    fn current_date(&self) -> NaiveDate {
        self.now().date_naive()
    }

    fn current_date_time(&self) -> DateTime<Utc> {
        self.now()
    }

    fn select(
        &self,
        path: &str,
        namespaces: &HashMap<String, String>,
    ) -> Result<Vec<String>, Status> {
        let Some(content) = self.resource_content.as_deref() else {
            return Ok(Vec::new());
        };
        select::select(content, path, namespaces).map_err(|e| e.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(request: RequestCtx) -> BasicEvaluationCtx {
        BasicEvaluationCtx::new(request, None).unwrap()
    }

    #[test]
    fn resource_id_is_required() {
        let err = BasicEvaluationCtx::new(RequestCtx::new(), None).err().unwrap();
        assert!(matches!(err, ParsingError::Request(_)));
    }

    #[test]
    fn scope_defaults_to_immediate_and_parses_children() {
        assert_eq!(ctx(RequestCtx::new().with_resource_id("a")).scope(), Scope::Immediate);
        let request = RequestCtx::new()
            .with_resource_id("a")
            .with_resource_attr(RESOURCE_SCOPE, AttributeValue::string("Children"));
        assert_eq!(ctx(request).scope(), Scope::Children);
    }

    #[test]
    fn unknown_scope_is_rejected() {
        let request = RequestCtx::new()
            .with_resource_id("a")
            .with_resource_attr(RESOURCE_SCOPE, AttributeValue::string("Siblings"));
        assert!(BasicEvaluationCtx::new(request, None).is_err());
    }

    #[test]
    fn lookups_filter_by_type_and_issuer() {
        let mut request = RequestCtx::new()
            .with_resource_id("doc")
            .with_subject_attr("role", AttributeValue::string("admin"))
            .with_subject_attr("role", AttributeValue::Integer(3));
        request.subjects[0]
            .attributes
            .push(Attribute::new("role", AttributeValue::string("auditor")).with_issuer("hr"));
        let ctx = ctx(request);

        match ctx.subject_attribute(types::STRING, "role", None, ACCESS_SUBJECT) {
            EvaluationResult::Bag(bag) => assert_eq!(bag.len(), 2),
            other => panic!("expected bag, got {:?}", other),
        }
        match ctx.subject_attribute(types::STRING, "role", Some("hr"), ACCESS_SUBJECT) {
            EvaluationResult::Bag(bag) => {
                assert_eq!(bag.values(), &[AttributeValue::string("auditor")])
            }
            other => panic!("expected bag, got {:?}", other),
        }
    }

    #[test]
    fn missing_attribute_is_an_empty_bag() {
        let ctx = ctx(RequestCtx::new().with_resource_id("doc"));
        match ctx.action_attribute(types::STRING, "action-id", None) {
            EvaluationResult::Bag(bag) => assert!(bag.is_empty()),
            other => panic!("expected bag, got {:?}", other),
        }
    }

    #[test]
    fn current_time_is_stable_within_a_request() {
        let ctx = ctx(RequestCtx::new().with_resource_id("doc"));
        let first = ctx.current_date_time();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert_eq!(first, ctx.current_date_time());
        match ctx.environment_attribute(types::DATE_TIME, CURRENT_DATE_TIME, None) {
            EvaluationResult::Bag(bag) => {
                assert_eq!(bag.values(), &[AttributeValue::DateTime(first)])
            }
            other => panic!("expected bag, got {:?}", other),
        }
    }

    #[test]
    fn request_supplied_date_time_is_the_clock() {
        let now = Utc::now() - chrono::Duration::days(3);
        let request = RequestCtx::new()
            .with_resource_id("doc")
            .with_env_attr(CURRENT_DATE_TIME, AttributeValue::DateTime(now));
        let ctx = ctx(request);
        assert_eq!(ctx.current_date_time(), now);
        assert_eq!(ctx.current_date(), now.date_naive());
    }

    #[test]
    fn set_resource_id_updates_designator_view() {
        let mut ctx = ctx(RequestCtx::new().with_resource_id("parent"));
        ctx.set_resource_id(AttributeValue::string("parent/child"));
        match ctx.resource_attribute(types::STRING, RESOURCE_ID, None) {
            EvaluationResult::Bag(bag) => {
                assert_eq!(bag.values(), &[AttributeValue::string("parent/child")])
            }
            other => panic!("expected bag, got {:?}", other),
        }
    }
}
