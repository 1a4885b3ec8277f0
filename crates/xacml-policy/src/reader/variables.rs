// reader/variables.rs — Variable definitions of one policy being read.
//
// Definitions are parsed on first use, so a reference may appear before
// the definition it names. Each definition is parsed once and shared by
// every reference to it. A definition that reaches itself again while
// being parsed is a cycle. A manager lives for one policy only.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use roxmltree::Node;

use crate::error::ParsingError;
use crate::expr::VariableDefinition;

use super::expr::ExprParser;
use super::{elements, required_attr};

pub(crate) struct VariableManager<'a, 'i> {
    nodes: HashMap<String, Node<'a, 'i>>,
    order: Vec<String>,
    resolved: RefCell<HashMap<String, Arc<VariableDefinition>>>,
    in_progress: RefCell<HashSet<String>>,
}

impl<'a, 'i> VariableManager<'a, 'i> {
    /// Index the `VariableDefinition` elements of a policy by id.
    pub(crate) fn new(definitions: &[Node<'a, 'i>]) -> Result<Self, ParsingError> {
        let mut manager = Self::empty();
        for node in definitions {
            let id = required_attr(*node, "VariableId")?;
            if manager.nodes.insert(id.to_string(), *node).is_some() {
                return Err(ParsingError::DuplicateVariable(id.to_string()));
            }
            manager.order.push(id.to_string());
        }
        Ok(manager)
    }

    /// No definitions: every reference is undefined.
    pub(crate) fn empty() -> Self {
        Self {
            nodes: HashMap::new(),
            order: Vec::new(),
            resolved: RefCell::new(HashMap::new()),
            in_progress: RefCell::new(HashSet::new()),
        }
    }

    pub(crate) fn definition(
        &self,
        id: &str,
        parser: &ExprParser<'_, 'a, 'i>,
    ) -> Result<Arc<VariableDefinition>, ParsingError> {
        if let Some(definition) = self.resolved.borrow().get(id) {
            return Ok(definition.clone());
        }
        let node = *self
            .nodes
            .get(id)
            .ok_or_else(|| ParsingError::UndefinedVariable(id.to_string()))?;
        if !self.in_progress.borrow_mut().insert(id.to_string()) {
            return Err(ParsingError::CircularVariable(id.to_string()));
        }

        let expression = elements(node)
            .next()
            .ok_or_else(|| ParsingError::Invalid(format!("variable {} has no expression", id)))
            .and_then(|child| parser.read_expression(child));
        self.in_progress.borrow_mut().remove(id);

        let definition = Arc::new(VariableDefinition::new(id, expression?));
        self.resolved
            .borrow_mut()
            .insert(id.to_string(), definition.clone());
        Ok(definition)
    }

    /// Every definition in document order, including unreferenced ones.
    pub(crate) fn definitions(
        &self,
        parser: &ExprParser<'_, 'a, 'i>,
    ) -> Result<Vec<Arc<VariableDefinition>>, ParsingError> {
        self.order
            .iter()
            .map(|id| self.definition(id, parser))
            .collect()
    }
}
