// attr/bag.rs — Multisets of attribute values.

use super::AttributeValue;

/// An unordered multiset of values sharing one declared datatype.
///
/// An empty bag is a real result ("the attribute has no values"), distinct
/// from an INDETERMINATE lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Bag {
    data_type: String,
    values: Vec<AttributeValue>,
}

impl Bag {
    pub fn new(data_type: impl Into<String>, values: Vec<AttributeValue>) -> Self {
        Self {
            data_type: data_type.into(),
            values,
        }
    }

    pub fn empty(data_type: impl Into<String>) -> Self {
        Self::new(data_type, Vec::new())
    }

    pub fn single(value: AttributeValue) -> Self {
        Self::new(value.data_type().to_string(), vec![value])
    }

    pub fn data_type(&self) -> &str {
        &self.data_type
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, value: &AttributeValue) -> bool {
        self.values.contains(value)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AttributeValue> {
        self.values.iter()
    }

    pub fn values(&self) -> &[AttributeValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<AttributeValue> {
        self.values
    }

    /// Multiset equality, ignoring order.
    pub fn same_members(&self, other: &Bag) -> bool {
        self.values.iter().all(|v| other.contains(v))
            && other.values.iter().all(|v| self.contains(v))
    }
}

impl<'a> IntoIterator for &'a Bag {
    type Item = &'a AttributeValue;
    type IntoIter = std::slice::Iter<'a, AttributeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
