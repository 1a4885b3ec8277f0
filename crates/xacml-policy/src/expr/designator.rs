// expr/designator.rs — Attribute designators.

use crate::attr::Bag;
use crate::ctx::{Category, EvaluationCtx, ACCESS_SUBJECT};
use crate::encode::Indenter;
use crate::status::Status;

use super::EvaluationResult;

/// Pulls the bag of values named by (category, data type, id, issuer)
/// from the evaluation context.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDesignator {
    category: Category,
    data_type: String,
    id: String,
    issuer: Option<String>,
    subject_category: Option<String>,
    must_be_present: bool,
}

impl AttributeDesignator {
    pub fn new(category: Category, data_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            category,
            data_type: data_type.into(),
            id: id.into(),
            issuer: None,
            subject_category: None,
            must_be_present: false,
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Only meaningful for subject designators.
    pub fn with_subject_category(mut self, category: impl Into<String>) -> Self {
        self.subject_category = Some(category.into());
        self
    }

    pub fn must_be_present(mut self, required: bool) -> Self {
        self.must_be_present = required;
        self
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn data_type(&self) -> &str {
        &self.data_type
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    pub fn evaluate(&self, ctx: &dyn EvaluationCtx) -> EvaluationResult {
        let result = ctx.attribute(
            self.category,
            &self.data_type,
            &self.id,
            self.issuer.as_deref(),
            self.subject_category.as_deref(),
        );
        match result {
            EvaluationResult::Bag(bag) if bag.is_empty() && self.must_be_present => {
                tracing::debug!(
                    request = %ctx.request_id(),
                    attribute = %self.id,
                    "required attribute is missing"
                );
                EvaluationResult::Indeterminate(Status::missing_attribute(format!(
                    "{} attribute '{}' of type {} must be present",
                    self.category, self.id, self.data_type
                )))
            }
            EvaluationResult::Value(value) => EvaluationResult::Bag(Bag::single(value)),
            other => other,
        }
    }

    pub fn encode(&self, w: &mut Indenter) {
        let element = match self.category {
            Category::Subject => "SubjectAttributeDesignator",
            Category::Resource => "ResourceAttributeDesignator",
            Category::Action => "ActionAttributeDesignator",
            Category::Environment => "EnvironmentAttributeDesignator",
        };
        let mut attrs = vec![
            ("AttributeId", self.id.as_str()),
            ("DataType", self.data_type.as_str()),
        ];
        if let Some(issuer) = &self.issuer {
            attrs.push(("Issuer", issuer.as_str()));
        }
        if self.must_be_present {
            attrs.push(("MustBePresent", "true"));
        }
        if let Some(category) = &self.subject_category {
            if category != ACCESS_SUBJECT {
                attrs.push(("SubjectCategory", category.as_str()));
            }
        }
        w.empty(element, &attrs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::{types, AttributeValue};
    use crate::ctx::{BasicEvaluationCtx, RequestCtx};
    use crate::status::STATUS_MISSING_ATTRIBUTE;

    fn ctx() -> BasicEvaluationCtx {
        let request = RequestCtx::new()
            .with_resource_id("doc")
            .with_subject_attr("role", AttributeValue::string("admin"));
        BasicEvaluationCtx::new(request, None).unwrap()
    }

    #[test]
    fn returns_request_values() {
        let designator = AttributeDesignator::new(Category::Subject, types::STRING, "role");
        match designator.evaluate(&ctx()) {
            EvaluationResult::Bag(bag) => assert!(bag.contains(&AttributeValue::string("admin"))),
            other => panic!("expected bag, got {:?}", other),
        }
    }

    #[test]
    fn missing_required_attribute_is_indeterminate() {
        let designator = AttributeDesignator::new(Category::Action, types::STRING, "action-id")
            .must_be_present(true);
        match designator.evaluate(&ctx()) {
            EvaluationResult::Indeterminate(status) => {
                assert_eq!(status.code(), STATUS_MISSING_ATTRIBUTE)
            }
            other => panic!("expected indeterminate, got {:?}", other),
        }
    }

    #[test]
    fn missing_optional_attribute_is_empty() {
        let designator = AttributeDesignator::new(Category::Action, types::STRING, "action-id");
        match designator.evaluate(&ctx()) {
            EvaluationResult::Bag(bag) => assert!(bag.is_empty()),
            other => panic!("expected bag, got {:?}", other),
        }
    }
}
