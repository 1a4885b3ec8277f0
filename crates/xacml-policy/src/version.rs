// version.rs — Policy versions and version constraints.
//
// Versions are dotted integer sequences ("1.2.10"). Constraint patterns
// may also use `*` (any single token) and `+` (any number of trailing
// tokens, including none). A reference carries up to three patterns: an
// exact version, an earliest and a latest; a version meets the constraints
// when it passes all three.
//
// An absent version argument compares as equal to every pattern, so it
// meets any constraints.

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static VERSION_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^([0-9]+\.)*[0-9]+$").ok());

/// True when `version` is a dotted sequence of integers.
pub fn is_valid_version(version: &str) -> bool {
    VERSION_RE.as_ref().is_some_and(|re| re.is_match(version))
}

/// Compare two concrete versions token by token. A version that is a
/// prefix of another sorts first.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = compare_tokens(x, y);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

fn compare_tokens(x: &str, y: &str) -> Ordering {
    match (x.parse::<u64>(), y.parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => x.cmp(y),
    }
}

/// Exact / earliest / latest version patterns of a policy reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionConstraints {
    pub version: Option<String>,
    pub earliest: Option<String>,
    pub latest: Option<String>,
}

impl VersionConstraints {
    pub fn new(version: Option<&str>, earliest: Option<&str>, latest: Option<&str>) -> Self {
        Self {
            version: version.map(str::to_string),
            earliest: earliest.map(str::to_string),
            latest: latest.map(str::to_string),
        }
    }

    /// No constraints at all: every version qualifies.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn is_unconstrained(&self) -> bool {
        self.version.is_none() && self.earliest.is_none() && self.latest.is_none()
    }

    /// True when `version` matches the exact pattern and lies within the
    /// earliest/latest bounds.
    pub fn meets_constraint(&self, version: Option<&str>) -> bool {
        let matches_exact = self
            .version
            .as_deref()
            .map_or(true, |pattern| compare(version, pattern) == Ordering::Equal);
        let above_earliest = self
            .earliest
            .as_deref()
            .map_or(true, |pattern| compare(version, pattern) != Ordering::Less);
        let below_latest = self
            .latest
            .as_deref()
            .map_or(true, |pattern| compare(version, pattern) != Ordering::Greater);
        matches_exact && above_earliest && below_latest
    }
}

/// Compare a version against a pattern.
fn compare(version: Option<&str>, pattern: &str) -> Ordering {
    let Some(version) = version else {
        return Ordering::Equal;
    };
    let mut tokens = version.split('.');
    let mut patterns = pattern.split('.');
    loop {
        match (tokens.next(), patterns.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some("+")) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(_), Some("+")) => return Ordering::Equal,
            (Some(_), Some("*")) => continue,
            (Some(token), Some(expected)) => {
                let ordering = compare_tokens(token, expected);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_token() {
        let c = VersionConstraints::new(Some("1.*"), None, None);
        assert!(c.meets_constraint(Some("1.5")));
        assert!(!c.meets_constraint(Some("2.0")));
        assert!(!c.meets_constraint(Some("1.5.1")));
    }

    #[test]
    fn latest_bound() {
        let c = VersionConstraints::new(None, None, Some("1.2"));
        assert!(!c.meets_constraint(Some("1.3")));
        assert!(c.meets_constraint(Some("1.2")));
        assert!(c.meets_constraint(Some("1.1.9")));
    }

    #[test]
    fn earliest_bound() {
        let c = VersionConstraints::new(None, Some("2.0"), None);
        assert!(c.meets_constraint(Some("2.0.1")));
        assert!(!c.meets_constraint(Some("1.9")));
    }

    #[test]
    fn plus_matches_any_suffix() {
        let c = VersionConstraints::new(Some("1.2.+"), None, None);
        assert!(c.meets_constraint(Some("1.2.9.3")));
        assert!(c.meets_constraint(Some("1.2")));
        assert!(!c.meets_constraint(Some("1.3.0")));
    }

    #[test]
    fn numeric_tokens_compare_numerically() {
        let c = VersionConstraints::new(None, None, Some("1.10"));
        assert!(c.meets_constraint(Some("1.9")));
        assert_eq!(compare_versions("1.10", "1.9"), Ordering::Greater);
        assert_eq!(compare_versions("1.2", "1.2.0"), Ordering::Less);
    }

    #[test]
    fn absent_version_meets_everything() {
        let c = VersionConstraints::new(Some("3.0"), Some("3.0"), Some("3.0"));
        assert!(c.meets_constraint(None));
    }

    #[test]
    fn version_syntax() {
        assert!(is_valid_version("1.0"));
        assert!(is_valid_version("12"));
        assert!(!is_valid_version("1."));
        assert!(!is_valid_version("1.a"));
        assert!(!is_valid_version(""));
        assert!(!is_valid_version(".1"));
        assert!(!is_valid_version("1..2"));
        assert!(!is_valid_version("\u{661}.0"));
        assert!(is_valid_version("2.10.0"));
    }
}
