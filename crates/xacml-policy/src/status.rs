// status.rs — Status codes carried by INDETERMINATE outcomes.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const STATUS_OK: &str = "urn:oasis:names:tc:xacml:1.0:status:ok";
pub const STATUS_MISSING_ATTRIBUTE: &str = "urn:oasis:names:tc:xacml:1.0:status:missing-attribute";
pub const STATUS_SYNTAX_ERROR: &str = "urn:oasis:names:tc:xacml:1.0:status:syntax-error";
pub const STATUS_PROCESSING_ERROR: &str = "urn:oasis:names:tc:xacml:1.0:status:processing-error";

/// A classified diagnostic: one or more status-code URIs (most general
/// first) plus an optional human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub codes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Status {
    pub fn new(code: impl Into<String>, message: Option<String>) -> Self {
        Self {
            codes: vec![code.into()],
            message,
        }
    }

    pub fn ok() -> Self {
        Self::new(STATUS_OK, None)
    }

    pub fn processing_error(message: impl Into<String>) -> Self {
        Self::new(STATUS_PROCESSING_ERROR, Some(message.into()))
    }

    pub fn syntax_error(message: impl Into<String>) -> Self {
        Self::new(STATUS_SYNTAX_ERROR, Some(message.into()))
    }

    pub fn missing_attribute(message: impl Into<String>) -> Self {
        Self::new(STATUS_MISSING_ATTRIBUTE, Some(message.into()))
    }

    /// The primary (first) status code.
    pub fn code(&self) -> &str {
        self.codes.first().map(String::as_str).unwrap_or(STATUS_OK)
    }

    pub fn is_ok(&self) -> bool {
        self.code() == STATUS_OK
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{} ({})", self.code(), message),
            None => write!(f, "{}", self.code()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_primary_code() {
        assert_eq!(Status::processing_error("x").code(), STATUS_PROCESSING_ERROR);
        assert_eq!(Status::syntax_error("x").code(), STATUS_SYNTAX_ERROR);
        assert_eq!(Status::missing_attribute("x").code(), STATUS_MISSING_ATTRIBUTE);
        assert!(Status::ok().is_ok());
    }

    #[test]
    fn display_includes_message() {
        let status = Status::processing_error("no finder");
        assert_eq!(
            status.to_string(),
            format!("{} (no finder)", STATUS_PROCESSING_ERROR)
        );
    }
}
