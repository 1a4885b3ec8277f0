// check.rs — Parse a policy document and print it re-encoded.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use xacml_policy::{PolicyReader, Registry};

pub fn execute(policy: &Path, indent: usize) -> anyhow::Result<()> {
    print!("{}", render(policy, indent)?);
    Ok(())
}

fn render(policy: &Path, indent: usize) -> anyhow::Result<String> {
    let reader = PolicyReader::new(Arc::new(Registry::standard()));
    let parsed = reader
        .read_file(policy)
        .with_context(|| format!("checking {}", policy.display()))?;
    tracing::info!(
        policy = parsed.id(),
        version = parsed.version(),
        children = parsed.children().len(),
        "policy is valid"
    );
    Ok(parsed.encode_to_string(indent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const POLICY: &str = r#"<Policy xmlns="urn:oasis:names:tc:xacml:2.0:policy:schema:os"
        PolicyId="urn:example:p" Version="3.0"
        RuleCombiningAlgId="urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:permit-overrides">
      <Rule RuleId="r" Effect="Permit"/>
    </Policy>"#;

    #[test]
    fn renders_with_requested_indent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.xml");
        fs::write(&path, POLICY).unwrap();

        let out = render(&path, 4).unwrap();
        assert!(out.starts_with("<Policy xmlns="));
        assert!(out.contains("\n    <Rule RuleId=\"r\" Effect=\"Permit\"/>"));
        assert!(out.contains("Version=\"3.0\""));
    }

    #[test]
    fn invalid_policy_reports_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.xml");
        fs::write(&path, "<Rule RuleId=\"r\" Effect=\"Permit\"/>").unwrap();
        let err = render(&path, 2).unwrap_err();
        assert!(format!("{:#}", err).contains("bad.xml"));
    }
}
