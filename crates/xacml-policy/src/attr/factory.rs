// attr/factory.rs — Datatype registration table.
//
// Replaces a process-wide attribute factory: every engine owns its own
// table, so two differently-configured engines can live in one process.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::{parse_standard, AttributeValue, STANDARD_TYPES};
use crate::error::ParsingError;

/// Turns the lexical form of one datatype into a value.
pub type ValueParser = Arc<dyn Fn(&str) -> Result<AttributeValue, String> + Send + Sync>;

/// Maps datatype URIs to parsers.
#[derive(Clone, Default)]
pub struct AttributeFactory {
    parsers: HashMap<String, ValueParser>,
}

impl AttributeFactory {
    /// A factory that knows no datatypes.
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory preloaded with every built-in datatype.
    pub fn standard() -> Self {
        let mut factory = Self::new();
        for &(_, uri) in STANDARD_TYPES {
            factory.register(uri, move |text| {
                parse_standard(uri, text).unwrap_or_else(|| Err(format!("no parser for {}", uri)))
            });
        }
        factory
    }

    /// Add (or replace) the parser for a datatype.
    pub fn register<F>(&mut self, data_type: impl Into<String>, parser: F)
    where
        F: Fn(&str) -> Result<AttributeValue, String> + Send + Sync + 'static,
    {
        self.parsers.insert(data_type.into(), Arc::new(parser));
    }

    pub fn supports(&self, data_type: &str) -> bool {
        self.parsers.contains_key(data_type)
    }

    pub fn supported_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.parsers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Parse `text` as a value of `data_type`.
    pub fn create(&self, data_type: &str, text: &str) -> Result<AttributeValue, ParsingError> {
        let parser = self
            .parsers
            .get(data_type)
            .ok_or_else(|| ParsingError::UnknownDataType(data_type.to_string()))?;
        parser(text).map_err(|reason| ParsingError::InvalidValue {
            data_type: data_type.to_string(),
            value: text.to_string(),
            reason,
        })
    }
}

impl fmt::Debug for AttributeFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeFactory")
            .field("types", &self.supported_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::types;

    #[test]
    fn standard_factory_parses_builtin_types() {
        let factory = AttributeFactory::standard();
        assert_eq!(
            factory.create(types::INTEGER, "7").unwrap(),
            AttributeValue::Integer(7)
        );
        assert!(factory.supports(types::BASE64_BINARY));
    }

    #[test]
    fn unknown_type_is_a_parse_error() {
        let factory = AttributeFactory::new();
        assert_eq!(
            factory.create(types::STRING, "x"),
            Err(ParsingError::UnknownDataType(types::STRING.to_string()))
        );
    }

    #[test]
    fn custom_types_can_be_registered() {
        let mut factory = AttributeFactory::standard();
        factory.register("urn:example:point", |text| {
            Ok(AttributeValue::Other {
                data_type: "urn:example:point".to_string(),
                text: text.trim().to_string(),
            })
        });
        let value = factory.create("urn:example:point", " 1,2 ").unwrap();
        assert_eq!(value.encode(), "1,2");
    }

    #[test]
    fn invalid_literal_reports_value() {
        let factory = AttributeFactory::standard();
        match factory.create(types::BOOLEAN, "maybe") {
            Err(ParsingError::InvalidValue { value, .. }) => assert_eq!(value, "maybe"),
            other => panic!("expected InvalidValue, got {:?}", other),
        }
    }
}
