// reader/expr.rs — Expressions, targets, rules and obligations.
//
// Everything below the policy level is read here. Function identifiers in
// target matches come from the target tier of the function registry;
// everything inside a condition or variable uses the condition tier.

use std::collections::HashMap;

use roxmltree::Node;

use crate::attr::{types, AttributeValue};
use crate::combine::CombinerParameter;
use crate::ctx::Category;
use crate::error::ParsingError;
use crate::expr::{
    Apply, AttributeDesignator, AttributeSelector, Condition, Expression, VariableReference,
};
use crate::obligation::{AttributeAssignment, Obligation};
use crate::registry::Registry;
use crate::result::Effect;
use crate::rule::Rule;
use crate::target::{Target, TargetMatch, TargetMatchGroup, TargetSection};

use super::variables::VariableManager;
use super::{elements, name, required_attr, unexpected};

pub(crate) struct ExprParser<'p, 'a, 'i> {
    registry: &'p Registry,
    vars: &'p VariableManager<'a, 'i>,
}

impl<'p, 'a, 'i> ExprParser<'p, 'a, 'i> {
    pub(crate) fn new(registry: &'p Registry, vars: &'p VariableManager<'a, 'i>) -> Self {
        Self { registry, vars }
    }

    pub(crate) fn read_expression(&self, node: Node<'a, 'i>) -> Result<Expression, ParsingError> {
        match name(node) {
            "Apply" => {
                let function = self
                    .registry
                    .functions
                    .condition_function(required_attr(node, "FunctionId")?)?;
                let args = self.read_arguments(node)?;
                Ok(Expression::Apply(Apply::new(function, args)?))
            }
            "AttributeValue" => Ok(Expression::Value(self.read_value(node)?)),
            "AttributeSelector" => Ok(Expression::Selector(self.read_selector(node)?)),
            "Function" => Ok(Expression::Function(
                self.registry
                    .functions
                    .condition_function(required_attr(node, "FunctionId")?)?,
            )),
            "VariableReference" => {
                let definition = self
                    .vars
                    .definition(required_attr(node, "VariableId")?, self)?;
                Ok(Expression::Variable(VariableReference::new(definition)))
            }
            other => match designator_category(other) {
                Some(category) => Ok(Expression::Designator(self.read_designator(node, category)?)),
                None => Err(unexpected("an expression", other)),
            },
        }
    }

    fn read_arguments(&self, node: Node<'a, 'i>) -> Result<Vec<Expression>, ParsingError> {
        elements(node).map(|child| self.read_expression(child)).collect()
    }

    /// `<AttributeValue DataType="...">text</AttributeValue>` and the
    /// elements shaped like it.
    pub(crate) fn read_value(&self, node: Node<'a, 'i>) -> Result<AttributeValue, ParsingError> {
        let data_type = required_attr(node, "DataType")?;
        let text = node.text().unwrap_or("");
        let text = if data_type == types::STRING {
            text
        } else {
            text.trim()
        };
        self.registry.attributes.create(data_type, text)
    }

    fn read_designator(
        &self,
        node: Node<'a, 'i>,
        category: Category,
    ) -> Result<AttributeDesignator, ParsingError> {
        let mut designator = AttributeDesignator::new(
            category,
            required_attr(node, "DataType")?,
            required_attr(node, "AttributeId")?,
        )
        .must_be_present(node.attribute("MustBePresent") == Some("true"));
        if let Some(issuer) = node.attribute("Issuer") {
            designator = designator.with_issuer(issuer);
        }
        if let Some(subject_category) = node.attribute("SubjectCategory") {
            designator = designator.with_subject_category(subject_category);
        }
        Ok(designator)
    }

    fn read_selector(&self, node: Node<'a, 'i>) -> Result<AttributeSelector, ParsingError> {
        let namespaces: HashMap<String, String> = node
            .namespaces()
            .filter_map(|ns| ns.name().map(|prefix| (prefix.to_string(), ns.uri().to_string())))
            .collect();
        Ok(AttributeSelector::new(
            required_attr(node, "RequestContextPath")?,
            required_attr(node, "DataType")?,
            self.registry.attributes.clone(),
        )
        .must_be_present(node.attribute("MustBePresent") == Some("true"))
        .with_namespaces(namespaces))
    }

    pub(crate) fn read_target(&self, node: Node<'a, 'i>) -> Result<Target, ParsingError> {
        let mut target = Target::any();
        for section in elements(node) {
            let category = match name(section) {
                "Subjects" => Category::Subject,
                "Resources" => Category::Resource,
                "Actions" => Category::Action,
                "Environments" => Category::Environment,
                other => return Err(unexpected("a target section", other)),
            };
            target = target.with_section(self.read_section(section, category)?);
        }
        Ok(target)
    }

    /// A section is either `Any<Category>` or a list of match groups.
    fn read_section(
        &self,
        node: Node<'a, 'i>,
        category: Category,
    ) -> Result<TargetSection, ParsingError> {
        let group_name = category.as_str();
        let any_name = format!("Any{}", group_name);
        let mut groups = Vec::new();
        for child in elements(node) {
            let found = name(child);
            if found == any_name {
                return Ok(TargetSection::any(category));
            }
            if found != group_name {
                return Err(unexpected(group_name, found));
            }
            let matches = elements(child)
                .map(|m| self.read_match(m, category))
                .collect::<Result<Vec<_>, _>>()?;
            groups.push(TargetMatchGroup::new(matches));
        }
        Ok(TargetSection::new(category, groups))
    }

    fn read_match(
        &self,
        node: Node<'a, 'i>,
        category: Category,
    ) -> Result<TargetMatch, ParsingError> {
        let expected = format!("{}Match", category);
        if name(node) != expected {
            return Err(unexpected(&expected, name(node)));
        }
        let function = self
            .registry
            .functions
            .target_function(required_attr(node, "MatchId")?)?;

        let mut literal = None;
        let mut source = None;
        for child in elements(node) {
            match name(child) {
                "AttributeValue" => literal = Some(self.read_value(child)?),
                "AttributeSelector" => {
                    source = Some(Expression::Selector(self.read_selector(child)?))
                }
                other => match designator_category(other) {
                    Some(c) if c == category => {
                        source = Some(Expression::Designator(self.read_designator(child, c)?))
                    }
                    Some(_) => {
                        return Err(unexpected(&format!("{}AttributeDesignator", category), other))
                    }
                    None => return Err(unexpected("AttributeValue, designator or selector", other)),
                },
            }
        }
        let literal = literal
            .ok_or_else(|| ParsingError::Invalid(format!("{} has no AttributeValue", expected)))?;
        let source = source.ok_or_else(|| {
            ParsingError::Invalid(format!("{} has no designator or selector", expected))
        })?;
        TargetMatch::new(category, function, literal, source)
    }

    pub(crate) fn read_rule(&self, node: Node<'a, 'i>) -> Result<Rule, ParsingError> {
        let id = required_attr(node, "RuleId")?;
        let effect_text = required_attr(node, "Effect")?;
        let effect = Effect::parse(effect_text)
            .ok_or_else(|| ParsingError::InvalidEffect(effect_text.to_string()))?;
        let mut rule = Rule::new(id, effect);
        for child in elements(node) {
            rule = match name(child) {
                "Description" => rule.with_description(child.text().unwrap_or("").trim()),
                "Target" => rule.with_target(self.read_target(child)?),
                "Condition" => rule.with_condition(self.read_condition(child)?),
                other => return Err(unexpected("Description, Target or Condition", other)),
            };
        }
        Ok(rule)
    }

    /// 2.0 wraps one expression; 1.x is itself an apply with a `FunctionId`.
    fn read_condition(&self, node: Node<'a, 'i>) -> Result<Condition, ParsingError> {
        if let Some(function_id) = node.attribute("FunctionId") {
            let function = self.registry.functions.condition_function(function_id)?;
            let args = self.read_arguments(node)?;
            return Condition::legacy(Apply::new(function, args)?);
        }
        let child = elements(node)
            .next()
            .ok_or_else(|| ParsingError::Invalid("empty Condition".to_string()))?;
        Condition::new(self.read_expression(child)?)
    }

    pub(crate) fn read_obligations(
        &self,
        node: Node<'a, 'i>,
    ) -> Result<Vec<Obligation>, ParsingError> {
        let mut obligations = Vec::new();
        for child in elements(node) {
            if name(child) != "Obligation" {
                return Err(unexpected("Obligation", name(child)));
            }
            let fulfill_on = required_attr(child, "FulfillOn")?;
            let effect = Effect::parse(fulfill_on)
                .ok_or_else(|| ParsingError::InvalidEffect(fulfill_on.to_string()))?;
            let assignments = elements(child)
                .map(|a| {
                    Ok(AttributeAssignment::new(
                        required_attr(a, "AttributeId")?,
                        self.read_value(a)?,
                    ))
                })
                .collect::<Result<Vec<_>, ParsingError>>()?;
            obligations.push(Obligation::new(
                required_attr(child, "ObligationId")?,
                effect,
                assignments,
            ));
        }
        Ok(obligations)
    }

    /// The `CombinerParameter` children of any combiner-parameters block.
    pub(crate) fn read_parameters(
        &self,
        node: Node<'a, 'i>,
    ) -> Result<Vec<CombinerParameter>, ParsingError> {
        let mut parameters = Vec::new();
        for child in elements(node) {
            if name(child) != "CombinerParameter" {
                return Err(unexpected("CombinerParameter", name(child)));
            }
            let value = elements(child).next().ok_or_else(|| {
                ParsingError::Invalid("CombinerParameter has no value".to_string())
            })?;
            parameters.push(CombinerParameter::new(
                required_attr(child, "ParameterName")?,
                self.read_value(value)?,
            ));
        }
        Ok(parameters)
    }
}

fn designator_category(element: &str) -> Option<Category> {
    match element {
        "SubjectAttributeDesignator" => Some(Category::Subject),
        "ResourceAttributeDesignator" => Some(Category::Resource),
        "ActionAttributeDesignator" => Some(Category::Action),
        "EnvironmentAttributeDesignator" => Some(Category::Environment),
        _ => None,
    }
}
