// target.rs — Applicability filters for rules, policies and policy sets.
//
// A `Target` has four sections (subject, resource, action, environment).
// A section is an OR over match groups, a group is an AND over individual
// matches, and a match tests whether any member of an attribute bag
// satisfies the match function against a literal.
//
// Matching does not follow expression evaluation's fail-fast rule. A
// single match keeps trying bag members after an error and only reports
// INDETERMINATE (with the first error) when no member matched. A section
// likewise prefers any MATCH over an earlier INDETERMINATE group.

use std::fmt;
use std::sync::Arc;

use crate::attr::AttributeValue;
use crate::ctx::{Category, EvaluationCtx};
use crate::encode::Indenter;
use crate::error::ParsingError;
use crate::expr::{encode_value, EvaluationResult, Expression};
use crate::func::Function;
use crate::status::Status;

/// Three-valued match outcome. INDETERMINATE always explains itself.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    Match,
    NoMatch,
    Indeterminate(Status),
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        matches!(self, MatchResult::Match)
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchResult::Match => f.write_str("MATCH"),
            MatchResult::NoMatch => f.write_str("NO_MATCH"),
            MatchResult::Indeterminate(status) => write!(f, "INDETERMINATE ({})", status),
        }
    }
}

/// Whether a document uses the XACML 1.x or 2.0 target syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XacmlVersion {
    V1,
    #[default]
    V2,
}

/// `<SubjectMatch>`, `<ResourceMatch>`, ...: function(literal, bag member).
#[derive(Debug, Clone)]
pub struct TargetMatch {
    category: Category,
    function: Arc<dyn Function>,
    literal: AttributeValue,
    source: Expression,
}

impl TargetMatch {
    /// `source` must be a designator or selector; the function is checked
    /// against (literal, member of source).
    pub fn new(
        category: Category,
        function: Arc<dyn Function>,
        literal: AttributeValue,
        source: Expression,
    ) -> Result<Self, ParsingError> {
        if !matches!(source, Expression::Designator(_) | Expression::Selector(_)) {
            return Err(ParsingError::Invalid(format!(
                "{}Match must compare against a designator or selector",
                category
            )));
        }
        function.check_inputs_no_bag(&[Expression::Value(literal.clone()), source.clone()])?;
        Ok(Self {
            category,
            function,
            literal,
            source,
        })
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn function(&self) -> &Arc<dyn Function> {
        &self.function
    }

    pub fn literal(&self) -> &AttributeValue {
        &self.literal
    }

    pub fn source(&self) -> &Expression {
        &self.source
    }

    pub fn matches(&self, ctx: &dyn EvaluationCtx) -> MatchResult {
        let bag = match self.source.evaluate(ctx) {
            EvaluationResult::Indeterminate(status) => return MatchResult::Indeterminate(status),
            EvaluationResult::Bag(bag) => bag,
            EvaluationResult::Value(value) => crate::attr::Bag::single(value),
        };
        if bag.is_empty() {
            return MatchResult::NoMatch;
        }

        let mut first_error: Option<Status> = None;
        for member in &bag {
            let args = [Expression::Value(self.literal.clone()), Expression::Value(member.clone())];
            match self.function.evaluate(&args, ctx) {
                EvaluationResult::Indeterminate(status) => {
                    first_error.get_or_insert(status);
                }
                result => {
                    if result.as_bool() == Some(true) {
                        return MatchResult::Match;
                    }
                }
            }
        }
        match first_error {
            Some(status) => MatchResult::Indeterminate(status),
            None => MatchResult::NoMatch,
        }
    }

    pub fn encode(&self, w: &mut Indenter) {
        let element = format!("{}Match", self.category);
        w.open(&element, &[("MatchId", self.function.identifier())]);
        encode_value(&self.literal, w);
        self.source.encode(w);
        w.close(&element);
    }
}

/// AND over matches: `<Subject>`, `<Resource>`, ...
#[derive(Debug, Clone, Default)]
pub struct TargetMatchGroup {
    matches: Vec<TargetMatch>,
}

impl TargetMatchGroup {
    pub fn new(matches: Vec<TargetMatch>) -> Self {
        Self { matches }
    }

    pub fn matches_list(&self) -> &[TargetMatch] {
        &self.matches
    }

    pub fn matches(&self, ctx: &dyn EvaluationCtx) -> MatchResult {
        for target_match in &self.matches {
            let result = target_match.matches(ctx);
            if !result.is_match() {
                return result;
            }
        }
        MatchResult::Match
    }

    fn encode(&self, category: Category, w: &mut Indenter) {
        let element = category.as_str();
        w.open(element, &[]);
        for target_match in &self.matches {
            target_match.encode(w);
        }
        w.close(element);
    }
}

/// OR over groups for one category. No groups means "any".
#[derive(Debug, Clone)]
pub struct TargetSection {
    category: Category,
    groups: Vec<TargetMatchGroup>,
}

impl TargetSection {
    pub fn any(category: Category) -> Self {
        Self {
            category,
            groups: Vec::new(),
        }
    }

    pub fn new(category: Category, groups: Vec<TargetMatchGroup>) -> Self {
        Self { category, groups }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn groups(&self) -> &[TargetMatchGroup] {
        &self.groups
    }

    pub fn matches_any(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn matches(&self, ctx: &dyn EvaluationCtx) -> MatchResult {
        if self.matches_any() {
            return MatchResult::Match;
        }
        let mut first_error: Option<Status> = None;
        for group in &self.groups {
            match group.matches(ctx) {
                MatchResult::Match => return MatchResult::Match,
                MatchResult::Indeterminate(status) => {
                    first_error.get_or_insert(status);
                }
                MatchResult::NoMatch => {}
            }
        }
        match first_error {
            Some(status) => MatchResult::Indeterminate(status),
            None => MatchResult::NoMatch,
        }
    }

    fn encode(&self, version: XacmlVersion, w: &mut Indenter) {
        let plural = format!("{}s", self.category);
        if self.matches_any() {
            // 2.0 leaves an "any" section out; 1.x spells it out.
            if version == XacmlVersion::V1 {
                w.open(&plural, &[]);
                w.empty(&format!("Any{}", self.category), &[]);
                w.close(&plural);
            }
            return;
        }
        w.open(&plural, &[]);
        for group in &self.groups {
            group.encode(self.category, w);
        }
        w.close(&plural);
    }
}

/// The full four-section target.
#[derive(Debug, Clone)]
pub struct Target {
    subjects: TargetSection,
    resources: TargetSection,
    actions: TargetSection,
    environments: TargetSection,
}

impl Default for Target {
    fn default() -> Self {
        Self::any()
    }
}

impl Target {
    /// A target that matches every request.
    pub fn any() -> Self {
        Self {
            subjects: TargetSection::any(Category::Subject),
            resources: TargetSection::any(Category::Resource),
            actions: TargetSection::any(Category::Action),
            environments: TargetSection::any(Category::Environment),
        }
    }

    pub fn new(
        subjects: TargetSection,
        resources: TargetSection,
        actions: TargetSection,
        environments: TargetSection,
    ) -> Self {
        Self {
            subjects,
            resources,
            actions,
            environments,
        }
    }

    /// Replace the section of the same category.
    pub fn with_section(mut self, section: TargetSection) -> Self {
        match section.category {
            Category::Subject => self.subjects = section,
            Category::Resource => self.resources = section,
            Category::Action => self.actions = section,
            Category::Environment => self.environments = section,
        }
        self
    }

    /// Sections in evaluation order.
    pub fn sections(&self) -> [&TargetSection; 4] {
        [&self.subjects, &self.resources, &self.actions, &self.environments]
    }

    pub fn matches_any(&self) -> bool {
        self.sections().iter().all(|s| s.matches_any())
    }

    pub fn matches(&self, ctx: &dyn EvaluationCtx) -> MatchResult {
        if self.matches_any() {
            return MatchResult::Match;
        }
        for section in self.sections() {
            let result = section.matches(ctx);
            if !result.is_match() {
                tracing::debug!(
                    request = %ctx.request_id(),
                    category = %section.category(),
                    outcome = %result,
                    "target section did not match"
                );
                return result;
            }
        }
        MatchResult::Match
    }

    pub fn encode(&self, version: XacmlVersion, w: &mut Indenter) {
        let sections: Vec<&TargetSection> = self
            .sections()
            .into_iter()
            .filter(|s| {
                version == XacmlVersion::V2
                    || s.category() != Category::Environment
                    || !s.matches_any()
            })
            .collect();
        if version == XacmlVersion::V2 && self.matches_any() {
            w.empty("Target", &[]);
            return;
        }
        w.open("Target", &[]);
        for section in sections {
            section.encode(version, w);
        }
        w.close("Target");
    }
}
