// reader/mod.rs — XACML policy documents into policy trees.
//
// Accepts 1.x and 2.0 documents. Elements are matched by local name, so
// the namespace only decides which syntax the tree encodes back to. Any
// structural problem is a `ParsingError`; nothing here is deferred to
// evaluation time.
//
// References read from a document resolve through the finder given to
// `with_finder`. Without one they are INDETERMINATE when evaluated.

mod expr;
mod variables;

use std::path::Path;
use std::sync::{Arc, Weak};

use roxmltree::{Document, Node};

use crate::combine::{CombinerParameter, CombiningKind};
use crate::encode::XACML1_POLICY_NS;
use crate::error::ParsingError;
use crate::finder::PolicyFinder;
use crate::policy::Policy;
use crate::policy_set::PolicySet;
use crate::reference::{PolicyReference, ReferenceKind};
use crate::registry::{PolicyMetaData, Registry};
use crate::target::{Target, XacmlVersion};
use crate::tree::{AbstractPolicy, PolicyTreeElement};
use crate::version::VersionConstraints;

use expr::ExprParser;
use variables::VariableManager;

pub struct PolicyReader {
    registry: Arc<Registry>,
    finder: Option<Weak<dyn PolicyFinder>>,
}

impl PolicyReader {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            finder: None,
        }
    }

    pub fn with_finder(mut self, finder: Weak<dyn PolicyFinder>) -> Self {
        self.finder = Some(finder);
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn read_str(&self, xml: &str) -> Result<AbstractPolicy, ParsingError> {
        let doc = Document::parse(xml)?;
        let root = doc.root_element();
        let version = match root.tag_name().namespace() {
            Some(XACML1_POLICY_NS) => XacmlVersion::V1,
            _ => XacmlVersion::V2,
        };
        let policy = self.read_element(root, version, None)?;
        tracing::debug!(policy = policy.id(), version = policy.version(), "policy read");
        Ok(policy)
    }

    pub fn read_file(&self, path: &Path) -> Result<AbstractPolicy, ParsingError> {
        let xml = std::fs::read_to_string(path).map_err(|e| ParsingError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        self.read_str(&xml)
    }

    fn read_element(
        &self,
        node: Node<'_, '_>,
        version: XacmlVersion,
        xpath: Option<&str>,
    ) -> Result<AbstractPolicy, ParsingError> {
        match name(node) {
            "Policy" => Ok(self.read_policy(node, version, xpath)?.into()),
            "PolicySet" => Ok(self.read_policy_set(node, version, xpath)?.into()),
            other => Err(unexpected("Policy or PolicySet", other)),
        }
    }

    fn meta(&self, version: XacmlVersion, xpath: Option<&str>) -> PolicyMetaData {
        let meta = PolicyMetaData::new(version, self.registry.clone());
        match xpath {
            Some(xpath) => meta.with_xpath_version(xpath),
            None => meta,
        }
    }

    fn read_policy(
        &self,
        node: Node<'_, '_>,
        version: XacmlVersion,
        inherited_xpath: Option<&str>,
    ) -> Result<Policy, ParsingError> {
        let id = required_attr(node, "PolicyId")?;
        let algorithm = self
            .registry
            .algorithms
            .get(required_attr(node, "RuleCombiningAlgId")?)?;

        let mut description = None;
        let mut xpath = inherited_xpath.map(str::to_string);
        let mut target = None;
        let mut parameter_nodes = Vec::new();
        let mut rule_parameter_nodes = Vec::new();
        let mut variable_nodes = Vec::new();
        let mut rule_nodes = Vec::new();
        let mut obligation_nodes = None;
        for child in elements(node) {
            match name(child) {
                "Description" => description = Some(text(child)),
                "PolicyDefaults" => xpath = read_xpath_version(child).or(xpath),
                "Target" => target = Some(child),
                "CombinerParameters" => parameter_nodes.push(child),
                "RuleCombinerParameters" => rule_parameter_nodes.push(child),
                "VariableDefinition" => variable_nodes.push(child),
                "Rule" => rule_nodes.push(child),
                "Obligations" => obligation_nodes = Some(child),
                other => return Err(unexpected("a policy child element", other)),
            }
        }

        let vars = VariableManager::new(&variable_nodes)?;
        let parser = ExprParser::new(&self.registry, &vars);

        let mut pending = Vec::new();
        for block in rule_parameter_nodes {
            pending.push(PendingParameters {
                element: "Rule",
                reference: required_attr(block, "RuleIdRef")?.to_string(),
                parameters: parser.read_parameters(block)?,
            });
        }

        let mut builder = Policy::builder(id, algorithm, read_target(&parser, target)?)
            .meta(self.meta(version, xpath.as_deref()));
        if let Some(v) = node.attribute("Version") {
            builder = builder.version(v);
        }
        if let Some(description) = description {
            builder = builder.description(description);
        }
        for block in parameter_nodes {
            for parameter in parser.read_parameters(block)? {
                builder = builder.parameter(parameter);
            }
        }
        for rule_node in rule_nodes {
            let rule = parser.read_rule(rule_node)?;
            let parameters = claim(&mut pending, "Rule", rule.id());
            builder = builder.rule_with_parameters(rule, parameters);
        }
        ensure_claimed(&pending)?;
        for variable in vars.definitions(&parser)? {
            builder = builder.variable(variable);
        }
        if let Some(obligations) = obligation_nodes {
            for obligation in parser.read_obligations(obligations)? {
                builder = builder.obligation(obligation);
            }
        }
        builder.build()
    }

    fn read_policy_set(
        &self,
        node: Node<'_, '_>,
        version: XacmlVersion,
        inherited_xpath: Option<&str>,
    ) -> Result<PolicySet, ParsingError> {
        let id = required_attr(node, "PolicySetId")?;
        let algorithm = self
            .registry
            .algorithms
            .get(required_attr(node, "PolicyCombiningAlgId")?)?;
        if algorithm.kind() != CombiningKind::Policy {
            return Err(ParsingError::WrongCombiningKind {
                algorithm: algorithm.identifier().to_string(),
                expected: CombiningKind::Policy.to_string(),
            });
        }

        let vars = VariableManager::empty();
        let parser = ExprParser::new(&self.registry, &vars);

        let mut description = None;
        let mut xpath = inherited_xpath.map(str::to_string);
        let mut target = None;
        let mut parameters = Vec::new();
        let mut pending = Vec::new();
        let mut child_nodes = Vec::new();
        let mut obligations = Vec::new();
        for child in elements(node) {
            match name(child) {
                "Description" => description = Some(text(child)),
                "PolicySetDefaults" => xpath = read_xpath_version(child).or(xpath),
                "Target" => target = Some(child),
                "CombinerParameters" => parameters.extend(parser.read_parameters(child)?),
                "PolicyCombinerParameters" => pending.push(PendingParameters {
                    element: "Policy",
                    reference: required_attr(child, "PolicyIdRef")?.to_string(),
                    parameters: parser.read_parameters(child)?,
                }),
                "PolicySetCombinerParameters" => pending.push(PendingParameters {
                    element: "PolicySet",
                    reference: required_attr(child, "PolicySetIdRef")?.to_string(),
                    parameters: parser.read_parameters(child)?,
                }),
                "Policy" | "PolicySet" | "PolicyIdReference" | "PolicySetIdReference" => {
                    child_nodes.push(child)
                }
                "Obligations" => obligations = parser.read_obligations(child)?,
                other => return Err(unexpected("a policy set child element", other)),
            }
        }

        let meta = self.meta(version, xpath.as_deref());
        let mut builder = PolicySet::builder(id, algorithm, read_target(&parser, target)?)
            .meta(meta.clone());
        if let Some(v) = node.attribute("Version") {
            builder = builder.version(v);
        }
        if let Some(description) = description {
            builder = builder.description(description);
        }
        for parameter in parameters {
            builder = builder.parameter(parameter);
        }
        for child in child_nodes {
            let (element, key, tree) = match name(child) {
                "Policy" => {
                    let policy = self.read_policy(child, version, xpath.as_deref())?;
                    let key = policy.id().to_string();
                    ("Policy", key, PolicyTreeElement::Policy(Arc::new(policy)))
                }
                "PolicySet" => {
                    let set = self.read_policy_set(child, version, xpath.as_deref())?;
                    let key = set.id().to_string();
                    ("PolicySet", key, PolicyTreeElement::PolicySet(Arc::new(set)))
                }
                "PolicyIdReference" => {
                    let reference = self.read_reference(child, ReferenceKind::Policy, &meta)?;
                    let key = reference.reference().to_string();
                    ("Policy", key, PolicyTreeElement::Reference(Arc::new(reference)))
                }
                _ => {
                    let reference = self.read_reference(child, ReferenceKind::PolicySet, &meta)?;
                    let key = reference.reference().to_string();
                    ("PolicySet", key, PolicyTreeElement::Reference(Arc::new(reference)))
                }
            };
            let parameters = claim(&mut pending, element, &key);
            builder = builder.child_with_parameters(tree, parameters);
        }
        ensure_claimed(&pending)?;
        for obligation in obligations {
            builder = builder.obligation(obligation);
        }
        builder.build()
    }

    fn read_reference(
        &self,
        node: Node<'_, '_>,
        kind: ReferenceKind,
        meta: &PolicyMetaData,
    ) -> Result<PolicyReference, ParsingError> {
        let reference = text(node);
        if reference.is_empty() {
            return Err(ParsingError::Invalid(format!(
                "empty {}",
                kind.element_name()
            )));
        }
        let constraints = VersionConstraints::new(
            node.attribute("Version"),
            node.attribute("EarliestVersion"),
            node.attribute("LatestVersion"),
        );
        let reference = PolicyReference::new(reference, kind, constraints, meta.clone());
        Ok(match &self.finder {
            Some(finder) => reference.with_weak_finder(finder.clone()),
            None => reference,
        })
    }
}

/// Combiner parameters waiting for the child they name.
struct PendingParameters {
    element: &'static str,
    reference: String,
    parameters: Vec<CombinerParameter>,
}

/// Take every pending block naming this child.
fn claim(
    pending: &mut Vec<PendingParameters>,
    element: &str,
    reference: &str,
) -> Vec<CombinerParameter> {
    let mut claimed = Vec::new();
    pending.retain_mut(|p| {
        if p.element == element && p.reference == reference {
            claimed.append(&mut p.parameters);
            false
        } else {
            true
        }
    });
    claimed
}

fn ensure_claimed(pending: &[PendingParameters]) -> Result<(), ParsingError> {
    match pending.first() {
        Some(p) => Err(ParsingError::UnmatchedCombinerParameters(p.reference.clone())),
        None => Ok(()),
    }
}

fn read_target<'a, 'i>(
    parser: &ExprParser<'_, 'a, 'i>,
    node: Option<Node<'a, 'i>>,
) -> Result<Target, ParsingError> {
    match node {
        Some(node) => parser.read_target(node),
        None => Ok(Target::any()),
    }
}

fn read_xpath_version(defaults: Node<'_, '_>) -> Option<String> {
    elements(defaults)
        .find(|n| name(*n) == "XPathVersion")
        .map(text)
}

pub(crate) fn name<'a>(node: Node<'a, '_>) -> &'a str {
    node.tag_name().name()
}

pub(crate) fn elements<'a, 'i>(node: Node<'a, 'i>) -> impl Iterator<Item = Node<'a, 'i>> {
    node.children().filter(|n| n.is_element())
}

pub(crate) fn required_attr<'a>(
    node: Node<'a, '_>,
    attribute: &str,
) -> Result<&'a str, ParsingError> {
    node.attribute(attribute)
        .ok_or_else(|| ParsingError::MissingAttribute {
            element: name(node).to_string(),
            attribute: attribute.to_string(),
        })
}

pub(crate) fn unexpected(expected: &str, found: &str) -> ParsingError {
    ParsingError::UnexpectedElement {
        expected: expected.to_string(),
        found: found.to_string(),
    }
}

fn text(node: Node<'_, '_>) -> String {
    node.text().unwrap_or("").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combine::ids;
    use crate::ctx::{BasicEvaluationCtx, RequestCtx};
    use crate::expr::Expression;
    use crate::result::Decision;

    const NS: &str = "urn:oasis:names:tc:xacml:2.0:policy:schema:os";

    fn reader() -> PolicyReader {
        PolicyReader::new(Arc::new(Registry::standard()))
    }

    fn policy_with(body: &str) -> String {
        format!(
            r#"<Policy xmlns="{}" PolicyId="urn:p" RuleCombiningAlgId="{}">{}</Policy>"#,
            NS,
            ids::RULE_FIRST_APPLICABLE,
            body
        )
    }

    fn ctx() -> BasicEvaluationCtx {
        BasicEvaluationCtx::new(RequestCtx::new().with_resource_id("doc"), None).unwrap()
    }

    #[test]
    fn forward_variable_reference_resolves() {
        let xml = policy_with(
            r#"<Target/>
            <Rule RuleId="r" Effect="Permit">
              <Condition><VariableReference VariableId="flag"/></Condition>
            </Rule>
            <VariableDefinition VariableId="flag">
              <AttributeValue DataType="http://www.w3.org/2001/XMLSchema#boolean">true</AttributeValue>
            </VariableDefinition>"#,
        );
        let policy = reader().read_str(&xml).unwrap();
        assert_eq!(policy.evaluate(&ctx()).decision, Decision::Permit);
        match &policy {
            AbstractPolicy::Policy(p) => assert_eq!(p.variables().len(), 1),
            other => panic!("expected Policy, got {:?}", other),
        }
    }

    #[test]
    fn shared_variable_is_parsed_once() {
        let xml = policy_with(
            r#"<VariableDefinition VariableId="a">
              <AttributeValue DataType="http://www.w3.org/2001/XMLSchema#boolean">true</AttributeValue>
            </VariableDefinition>
            <Rule RuleId="r1" Effect="Permit"><Condition><VariableReference VariableId="a"/></Condition></Rule>
            <Rule RuleId="r2" Effect="Deny"><Condition><VariableReference VariableId="a"/></Condition></Rule>"#,
        );
        let AbstractPolicy::Policy(policy) = reader().read_str(&xml).unwrap() else {
            panic!("expected a policy");
        };
        let definitions: Vec<_> = policy
            .rules()
            .iter()
            .filter_map(|c| match &c.element {
                PolicyTreeElement::Rule(rule) => match rule.condition().map(|c| c.expression()) {
                    Some(Expression::Variable(v)) => Some(v.definition().clone()),
                    _ => None,
                },
                _ => None,
            })
            .collect();
        assert_eq!(definitions.len(), 2);
        assert!(Arc::ptr_eq(&definitions[0], &definitions[1]));
    }

    #[test]
    fn circular_variables_are_rejected() {
        let xml = policy_with(
            r#"<VariableDefinition VariableId="a"><VariableReference VariableId="b"/></VariableDefinition>
            <VariableDefinition VariableId="b"><VariableReference VariableId="a"/></VariableDefinition>"#,
        );
        match reader().read_str(&xml) {
            Err(ParsingError::CircularVariable(_)) => {}
            other => panic!("expected CircularVariable, got {:?}", other),
        }
    }

    #[test]
    fn duplicate_and_undefined_variables_are_rejected() {
        let duplicate = policy_with(
            r#"<VariableDefinition VariableId="a"><AttributeValue DataType="http://www.w3.org/2001/XMLSchema#boolean">true</AttributeValue></VariableDefinition>
            <VariableDefinition VariableId="a"><AttributeValue DataType="http://www.w3.org/2001/XMLSchema#boolean">true</AttributeValue></VariableDefinition>"#,
        );
        assert_eq!(
            reader().read_str(&duplicate).unwrap_err(),
            ParsingError::DuplicateVariable("a".to_string())
        );

        let undefined = policy_with(
            r#"<Rule RuleId="r" Effect="Permit"><Condition><VariableReference VariableId="nope"/></Condition></Rule>"#,
        );
        assert_eq!(
            reader().read_str(&undefined).unwrap_err(),
            ParsingError::UndefinedVariable("nope".to_string())
        );
    }

    #[test]
    fn unmatched_rule_parameters_fail() {
        let xml = policy_with(
            r#"<RuleCombinerParameters RuleIdRef="ghost">
              <CombinerParameter ParameterName="w">
                <AttributeValue DataType="http://www.w3.org/2001/XMLSchema#integer">1</AttributeValue>
              </CombinerParameter>
            </RuleCombinerParameters>
            <Rule RuleId="r" Effect="Permit"/>"#,
        );
        assert_eq!(
            reader().read_str(&xml).unwrap_err(),
            ParsingError::UnmatchedCombinerParameters("ghost".to_string())
        );
    }

    #[test]
    fn unknown_algorithm_and_bad_effect_fail() {
        let xml = format!(
            r#"<Policy xmlns="{}" PolicyId="p" RuleCombiningAlgId="urn:nope"/>"#,
            NS
        );
        assert!(matches!(
            reader().read_str(&xml),
            Err(ParsingError::UnknownCombiningAlgorithm(_))
        ));

        let xml = policy_with(r#"<Rule RuleId="r" Effect="Maybe"/>"#);
        assert_eq!(
            reader().read_str(&xml).unwrap_err(),
            ParsingError::InvalidEffect("Maybe".to_string())
        );
    }

    #[test]
    fn policy_set_rejects_rule_algorithm() {
        let xml = format!(
            r#"<PolicySet xmlns="{}" PolicySetId="s" PolicyCombiningAlgId="{}"/>"#,
            NS,
            ids::RULE_DENY_OVERRIDES
        );
        assert!(matches!(
            reader().read_str(&xml),
            Err(ParsingError::WrongCombiningKind { .. })
        ));
    }

    #[test]
    fn match_designator_must_fit_its_section() {
        let xml = policy_with(
            r#"<Target><Subjects><Subject>
                 <SubjectMatch MatchId="urn:oasis:names:tc:xacml:1.0:function:string-equal">
                   <AttributeValue DataType="http://www.w3.org/2001/XMLSchema#string">x</AttributeValue>
                   <ResourceAttributeDesignator AttributeId="urn:a" DataType="http://www.w3.org/2001/XMLSchema#string"/>
                 </SubjectMatch>
               </Subject></Subjects></Target>"#,
        );
        match reader().read_str(&xml) {
            Err(ParsingError::UnexpectedElement { expected, found }) => {
                assert_eq!(expected, "SubjectAttributeDesignator");
                assert_eq!(found, "ResourceAttributeDesignator");
            }
            other => panic!("expected UnexpectedElement, got {:?}", other),
        }
    }

    #[test]
    fn reads_xacml1_condition_and_any_sections() {
        let xml = format!(
            r#"<Policy xmlns="urn:oasis:names:tc:xacml:1.0:policy" PolicyId="old" RuleCombiningAlgId="{}">
              <Target>
                <Subjects><AnySubject/></Subjects>
                <Resources><AnyResource/></Resources>
                <Actions><AnyAction/></Actions>
              </Target>
              <Rule RuleId="r" Effect="Deny">
                <Condition FunctionId="urn:oasis:names:tc:xacml:1.0:function:integer-greater-than">
                  <AttributeValue DataType="http://www.w3.org/2001/XMLSchema#integer">5</AttributeValue>
                  <AttributeValue DataType="http://www.w3.org/2001/XMLSchema#integer">2</AttributeValue>
                </Condition>
              </Rule>
            </Policy>"#,
            ids::RULE_DENY_OVERRIDES
        );
        let policy = reader().read_str(&xml).unwrap();
        assert_eq!(policy.meta().xacml_version, XacmlVersion::V1);
        assert!(policy.target().matches_any());
        assert_eq!(policy.evaluate(&ctx()).decision, Decision::Deny);

        let encoded = policy.encode_to_string(2);
        assert!(encoded.contains("<AnySubject/>"));
        assert!(encoded.contains("<Condition FunctionId="));
        assert!(!encoded.contains("Version=\""));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        match reader().read_file(&dir.path().join("absent.xml")) {
            Err(ParsingError::Read { path, .. }) => assert!(path.ends_with("absent.xml")),
            other => panic!("expected Read error, got {:?}", other),
        }
    }
}
