// version.rs — Test a policy version against reference constraints.

use xacml_policy::version::is_valid_version;
use xacml_policy::VersionConstraints;

pub fn execute(
    version: &str,
    exact: Option<&str>,
    earliest: Option<&str>,
    latest: Option<&str>,
) -> anyhow::Result<()> {
    if matches(version, exact, earliest, latest)? {
        println!("{} meets the constraints", version);
        Ok(())
    } else {
        anyhow::bail!("{} does not meet the constraints", version)
    }
}

fn matches(
    version: &str,
    exact: Option<&str>,
    earliest: Option<&str>,
    latest: Option<&str>,
) -> anyhow::Result<bool> {
    if !is_valid_version(version) {
        anyhow::bail!("'{}' is not a version (expected dotted integers)", version);
    }
    Ok(VersionConstraints::new(exact, earliest, latest).meets_constraint(Some(version)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patterns_and_bounds() {
        assert!(matches("1.5", Some("1.*"), None, None).unwrap());
        assert!(!matches("2.0", Some("1.*"), None, None).unwrap());
        assert!(!matches("1.3", None, None, Some("1.2")).unwrap());
        assert!(matches("1.2.9.3", Some("1.2.+"), None, None).unwrap());
        assert!(matches("4", None, Some("3.9"), None).unwrap());
    }

    #[test]
    fn rejects_non_versions() {
        assert!(matches("1.x", None, None, None).is_err());
        assert!(execute("2.0", Some("1.*"), None, None).is_err());
    }
}
