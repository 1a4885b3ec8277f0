// obligation.rs — Obligations attached to Permit and Deny decisions.

use serde::{Deserialize, Serialize};

use crate::attr::AttributeValue;
use crate::encode::Indenter;
use crate::result::Effect;

/// One `AttributeAssignment` carried by an obligation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeAssignment {
    pub id: String,
    pub value: AttributeValue,
}

impl AttributeAssignment {
    pub fn new(id: impl Into<String>, value: AttributeValue) -> Self {
        Self {
            id: id.into(),
            value,
        }
    }
}

/// A directive the caller must discharge when the decision equals
/// `fulfill_on`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obligation {
    pub id: String,
    pub fulfill_on: Effect,
    #[serde(default)]
    pub assignments: Vec<AttributeAssignment>,
}

impl Obligation {
    pub fn new(
        id: impl Into<String>,
        fulfill_on: Effect,
        assignments: Vec<AttributeAssignment>,
    ) -> Self {
        Self {
            id: id.into(),
            fulfill_on,
            assignments,
        }
    }

    pub fn encode(&self, w: &mut Indenter) {
        let attrs = [("ObligationId", self.id.as_str()), ("FulfillOn", self.fulfill_on.as_str())];
        if self.assignments.is_empty() {
            w.empty("Obligation", &attrs);
            return;
        }
        w.open("Obligation", &attrs);
        for assignment in &self.assignments {
            w.text_element(
                "AttributeAssignment",
                &[
                    ("AttributeId", assignment.id.as_str()),
                    ("DataType", assignment.value.data_type()),
                ],
                &assignment.value.encode(),
            );
        }
        w.close("Obligation");
    }
}

/// Write an `<Obligations>` block, or nothing when there are none.
pub(crate) fn encode_obligations(obligations: &[Obligation], w: &mut Indenter) {
    if obligations.is_empty() {
        return;
    }
    w.open("Obligations", &[]);
    for obligation in obligations {
        obligation.encode(w);
    }
    w.close("Obligations");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::types;

    #[test]
    fn encodes_assignments() {
        let obligation = Obligation::new(
            "urn:notify",
            Effect::Deny,
            vec![AttributeAssignment::new("email", AttributeValue::string("sec@example.org"))],
        );
        let mut w = Indenter::new(0);
        obligation.encode(&mut w);
        let xml = w.finish();
        assert!(xml.contains("FulfillOn=\"Deny\""));
        assert!(xml.contains(&format!("DataType=\"{}\">sec@example.org<", types::STRING)));
    }
}
