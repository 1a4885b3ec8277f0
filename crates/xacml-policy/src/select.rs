// select.rs — Location paths over the request's resource content.
//
// Attribute selectors address the resource content with a small subset
// of XPath: absolute child steps (`/a/b`), descendant steps (`//b`), the
// `*` wildcard, `prefix:local` names resolved through the selector's
// namespace scope, and a final `@attr` or `text()` step. Element names
// without a prefix match on local name alone.
//
// Anything outside that subset is a syntax error, reported as a
// syntax-error status by the caller. A document that does not parse is a
// processing error.

use std::collections::{HashMap, HashSet};

use roxmltree::{Document, Node, NodeId};

use crate::status::Status;

/// Why a selection could not be run.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectError {
    /// The path is outside the supported subset or uses an unbound prefix.
    Syntax(String),
    /// The resource content is not well-formed XML.
    Document(String),
}

impl SelectError {
    pub fn status(&self) -> Status {
        match self {
            SelectError::Syntax(msg) => Status::syntax_error(msg.clone()),
            SelectError::Document(msg) => Status::processing_error(msg.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq)]
enum NameTest {
    Any,
    Local(String),
    Qualified { namespace: String, local: String },
}

impl NameTest {
    fn parse(token: &str, namespaces: &HashMap<String, String>) -> Result<Self, SelectError> {
        if token == "*" {
            return Ok(NameTest::Any);
        }
        let (prefix, local) = match token.split_once(':') {
            Some((prefix, local)) => (Some(prefix), local),
            None => (None, token),
        };
        if !is_name(local) {
            return Err(SelectError::Syntax(format!("invalid name '{}'", token)));
        }
        match prefix {
            None => Ok(NameTest::Local(local.to_string())),
            Some(prefix) => {
                let namespace = namespaces
                    .get(prefix)
                    .ok_or_else(|| SelectError::Syntax(format!("unbound prefix '{}'", prefix)))?;
                Ok(NameTest::Qualified {
                    namespace: namespace.clone(),
                    local: local.to_string(),
                })
            }
        }
    }

    fn matches(&self, name: &str, namespace: Option<&str>) -> bool {
        match self {
            NameTest::Any => true,
            NameTest::Local(local) => local == name,
            NameTest::Qualified {
                namespace: ns,
                local,
            } => local == name && namespace == Some(ns.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Terminal {
    Attribute(NameTest),
    Text,
}

#[derive(Debug, Clone, PartialEq)]
struct Path {
    steps: Vec<(Axis, NameTest)>,
    terminal: Option<(Axis, Terminal)>,
}

fn is_name(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn parse_path(path: &str, namespaces: &HashMap<String, String>) -> Result<Path, SelectError> {
    let path = path.trim();
    if !path.starts_with('/') {
        return Err(SelectError::Syntax(format!(
            "path '{}' must be absolute",
            path
        )));
    }

    let mut steps = Vec::new();
    let mut terminal = None;
    let mut rest = path;
    while !rest.is_empty() {
        if terminal.is_some() {
            return Err(SelectError::Syntax(format!(
                "'{}': attribute and text() steps must come last",
                path
            )));
        }
        let axis = if let Some(r) = rest.strip_prefix("//") {
            rest = r;
            Axis::Descendant
        } else if let Some(r) = rest.strip_prefix('/') {
            rest = r;
            Axis::Child
        } else {
            return Err(SelectError::Syntax(format!("'{}': expected '/'", path)));
        };
        let end = rest.find('/').unwrap_or(rest.len());
        let token = &rest[..end];
        rest = &rest[end..];

        if token.is_empty() {
            return Err(SelectError::Syntax(format!("'{}': empty step", path)));
        }
        if token == "text()" {
            terminal = Some((axis, Terminal::Text));
        } else if let Some(name) = token.strip_prefix('@') {
            terminal = Some((axis, Terminal::Attribute(NameTest::parse(name, namespaces)?)));
        } else {
            steps.push((axis, NameTest::parse(token, namespaces)?));
        }
    }
    Ok(Path { steps, terminal })
}

fn step<'a, 'input>(
    nodes: &[Node<'a, 'input>],
    axis: Axis,
    test: &NameTest,
) -> Vec<Node<'a, 'input>> {
    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut out = Vec::new();
    for node in nodes {
        let candidates: Box<dyn Iterator<Item = Node<'a, 'input>> + 'a> = match axis {
            Axis::Child => Box::new(node.children()),
            Axis::Descendant => Box::new(node.descendants().skip(1)),
        };
        for candidate in candidates.filter(|n| n.is_element()) {
            let name = candidate.tag_name();
            if test.matches(name.name(), name.namespace()) && seen.insert(candidate.id()) {
                out.push(candidate);
            }
        }
    }
    out
}

/// Context set for a terminal step: the current nodes, or for `//` every
/// node at or below them.
fn terminal_context<'a, 'input>(nodes: &[Node<'a, 'input>], axis: Axis) -> Vec<Node<'a, 'input>> {
    match axis {
        Axis::Child => nodes.to_vec(),
        Axis::Descendant => {
            let mut seen: HashSet<NodeId> = HashSet::new();
            nodes
                .iter()
                .flat_map(|n| n.descendants())
                .filter(|n| n.is_element() || n.is_root())
                .filter(|n| seen.insert(n.id()))
                .collect()
        }
    }
}

fn string_value(node: &Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

/// Run `path` against `content` and return the string value of every
/// selected node, in document order.
pub fn select(
    content: &str,
    path: &str,
    namespaces: &HashMap<String, String>,
) -> Result<Vec<String>, SelectError> {
    let path = parse_path(path, namespaces)?;
    let document = Document::parse(content).map_err(|e| SelectError::Document(e.to_string()))?;

    let mut nodes = vec![document.root()];
    for (axis, test) in &path.steps {
        nodes = step(&nodes, *axis, test);
        if nodes.is_empty() {
            return Ok(Vec::new());
        }
    }

    let values = match &path.terminal {
        None => nodes.iter().map(string_value).collect(),
        Some((axis, Terminal::Text)) => terminal_context(&nodes, *axis)
            .iter()
            .flat_map(|n| n.children())
            .filter(|n| n.is_text())
            .filter_map(|n| n.text().map(str::to_string))
            .collect(),
        Some((axis, Terminal::Attribute(test))) => terminal_context(&nodes, *axis)
            .iter()
            .flat_map(|n| n.attributes())
            .filter(|a| test.matches(a.name(), a.namespace()))
            .map(|a| a.value().to_string())
            .collect(),
    };
    Ok(values)
}
