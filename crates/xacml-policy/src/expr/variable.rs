// expr/variable.rs — Variable definitions and references.
//
// A reference holds the parsed definition directly. The reader resolves
// definitions lazily (see reader/variables.rs) so forward references work
// and each definition is parsed once per policy.

use std::sync::Arc;

use crate::ctx::EvaluationCtx;
use crate::encode::Indenter;

use super::{EvaluationResult, Expression};

#[derive(Debug, Clone)]
pub struct VariableDefinition {
    id: String,
    expression: Expression,
}

impl VariableDefinition {
    pub fn new(id: impl Into<String>, expression: Expression) -> Self {
        Self {
            id: id.into(),
            expression,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn encode(&self, w: &mut Indenter) {
        w.open("VariableDefinition", &[("VariableId", self.id.as_str())]);
        self.expression.encode(w);
        w.close("VariableDefinition");
    }
}

#[derive(Debug, Clone)]
pub struct VariableReference {
    definition: Arc<VariableDefinition>,
}

impl VariableReference {
    pub fn new(definition: Arc<VariableDefinition>) -> Self {
        Self { definition }
    }

    pub fn id(&self) -> &str {
        self.definition.id()
    }

    pub fn definition(&self) -> &Arc<VariableDefinition> {
        &self.definition
    }

    pub fn evaluate(&self, ctx: &dyn EvaluationCtx) -> EvaluationResult {
        self.definition.expression.evaluate(ctx)
    }
}
