// expr/selector.rs — Attribute selectors.
//
// A selector runs a location path against the request's resource content
// and parses each selected string as its declared datatype. The namespace
// scope is captured when the policy is read, so prefixes in the path
// resolve the way they did in the policy document.

use std::collections::HashMap;
use std::sync::Arc;

use crate::attr::{AttributeFactory, Bag};
use crate::ctx::EvaluationCtx;
use crate::encode::Indenter;
use crate::status::Status;

use super::EvaluationResult;

#[derive(Debug, Clone)]
pub struct AttributeSelector {
    path: String,
    data_type: String,
    must_be_present: bool,
    namespaces: HashMap<String, String>,
    factory: Arc<AttributeFactory>,
}

impl AttributeSelector {
    pub fn new(
        path: impl Into<String>,
        data_type: impl Into<String>,
        factory: Arc<AttributeFactory>,
    ) -> Self {
        Self {
            path: path.into(),
            data_type: data_type.into(),
            must_be_present: false,
            namespaces: HashMap::new(),
            factory,
        }
    }

    pub fn must_be_present(mut self, required: bool) -> Self {
        self.must_be_present = required;
        self
    }

    pub fn with_namespaces(mut self, namespaces: HashMap<String, String>) -> Self {
        self.namespaces = namespaces;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn data_type(&self) -> &str {
        &self.data_type
    }

    pub fn evaluate(&self, ctx: &dyn EvaluationCtx) -> EvaluationResult {
        let texts = match ctx.select(&self.path, &self.namespaces) {
            Ok(texts) => texts,
            Err(status) => return EvaluationResult::Indeterminate(status),
        };
        if texts.is_empty() && self.must_be_present {
            return EvaluationResult::Indeterminate(Status::missing_attribute(format!(
                "selector '{}' matched nothing",
                self.path
            )));
        }
        let mut values = Vec::with_capacity(texts.len());
        for text in texts {
            match self.factory.create(&self.data_type, &text) {
                Ok(value) => values.push(value),
                Err(e) => {
                    return EvaluationResult::Indeterminate(Status::processing_error(e.to_string()))
                }
            }
        }
        EvaluationResult::Bag(Bag::new(self.data_type.clone(), values))
    }

    pub fn namespaces(&self) -> &HashMap<String, String> {
        &self.namespaces
    }

    /// Writes every captured prefix as an `xmlns:` declaration on the
    /// element itself, so the path resolves wherever the element ends up.
    pub fn encode(&self, w: &mut Indenter) {
        let mut prefixes: Vec<(String, &str)> = self
            .namespaces
            .iter()
            .filter(|(prefix, _)| prefix.as_str() != "xml")
            .map(|(prefix, uri)| (format!("xmlns:{}", prefix), uri.as_str()))
            .collect();
        prefixes.sort();

        let mut attrs: Vec<(&str, &str)> = prefixes
            .iter()
            .map(|(name, uri)| (name.as_str(), *uri))
            .collect();
        attrs.push(("RequestContextPath", self.path.as_str()));
        attrs.push(("DataType", self.data_type.as_str()));
        if self.must_be_present {
            attrs.push(("MustBePresent", "true"));
        }
        w.empty("AttributeSelector", &attrs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::{types, AttributeValue};
    use crate::ctx::{BasicEvaluationCtx, RequestCtx};
    use crate::status::{STATUS_MISSING_ATTRIBUTE, STATUS_SYNTAX_ERROR};

    fn ctx(content: Option<&str>) -> BasicEvaluationCtx {
        let mut request = RequestCtx::new().with_resource_id("doc");
        request.resource_content = content.map(str::to_string);
        BasicEvaluationCtx::new(request, None).unwrap()
    }

    fn selector(path: &str, data_type: &str) -> AttributeSelector {
        AttributeSelector::new(path, data_type, Arc::new(AttributeFactory::standard()))
    }

    #[test]
    fn parses_selected_text_as_declared_type() {
        let ctx = ctx(Some("<order><qty>3</qty><qty>5</qty></order>"));
        match selector("/order/qty", types::INTEGER).evaluate(&ctx) {
            EvaluationResult::Bag(bag) => assert_eq!(
                bag.values(),
                &[AttributeValue::Integer(3), AttributeValue::Integer(5)]
            ),
            other => panic!("expected bag, got {:?}", other),
        }
    }

    #[test]
    fn missing_document_is_empty_unless_required() {
        match selector("/order", types::STRING).evaluate(&ctx(None)) {
            EvaluationResult::Bag(bag) => assert!(bag.is_empty()),
            other => panic!("expected bag, got {:?}", other),
        }
        match selector("/order", types::STRING)
            .must_be_present(true)
            .evaluate(&ctx(None))
        {
            EvaluationResult::Indeterminate(status) => {
                assert_eq!(status.code(), STATUS_MISSING_ATTRIBUTE)
            }
            other => panic!("expected indeterminate, got {:?}", other),
        }
    }

    #[test]
    fn encode_declares_captured_prefixes() {
        let namespaces = HashMap::from([
            ("md".to_string(), "urn:example:md".to_string()),
            ("xml".to_string(), "http://www.w3.org/XML/1998/namespace".to_string()),
        ]);
        let sel = selector("/md:record/md:owner/text()", types::STRING).with_namespaces(namespaces);
        let mut w = Indenter::new(2);
        sel.encode(&mut w);
        let xml = w.finish();
        assert!(xml.contains(r#"xmlns:md="urn:example:md""#));
        assert!(!xml.contains("xmlns:xml"));

        let ctx = ctx(Some(
            r#"<md:record xmlns:md="urn:example:md"><md:owner>alice</md:owner></md:record>"#,
        ));
        match sel.evaluate(&ctx) {
            EvaluationResult::Bag(bag) => {
                assert_eq!(bag.values(), &[AttributeValue::string("alice")])
            }
            other => panic!("expected bag, got {:?}", other),
        }
    }

    #[test]
    fn bad_path_is_syntax_error() {
        let ctx = ctx(Some("<order/>"));
        match selector("order[1]", types::STRING).evaluate(&ctx) {
            EvaluationResult::Indeterminate(status) => {
                assert_eq!(status.code(), STATUS_SYNTAX_ERROR)
            }
            other => panic!("expected indeterminate, got {:?}", other),
        }
    }
}
