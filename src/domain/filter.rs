use std::{collections::BTreeSet, fmt};

use crate::{
    domain::UrnId,
    el::{Expression, Identified, ParseError},
};

/// Narrows which requirements (or SVCs) of one imported module stay visible
/// to the importing module.
///
/// Exclude criteria take precedence: when a rule has any, its include
/// criteria are ignored. A rule without criteria keeps everything.
#[derive(Debug, Clone, Default)]
pub struct FilterRule {
    includes: BTreeSet<UrnId>,
    excludes: BTreeSet<UrnId>,
    custom_includes: Option<Expression>,
    custom_excludes: Option<Expression>,
}

/// Which side of a rule an explicitly named id appears on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterAction {
    /// The id is named in the static include set.
    Import,
    /// The id is named in the static exclude set.
    Exclude,
}

impl fmt::Display for FilterAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Import => f.write_str("import"),
            Self::Exclude => f.write_str("exclude"),
        }
    }
}

impl FilterRule {
    /// Build a rule, compiling the custom expressions.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if either custom expression is malformed.
    pub fn compile(
        includes: impl IntoIterator<Item = UrnId>,
        excludes: impl IntoIterator<Item = UrnId>,
        custom_includes: Option<&str>,
        custom_excludes: Option<&str>,
    ) -> Result<Self, ParseError> {
        Ok(Self {
            includes: includes.into_iter().collect(),
            excludes: excludes.into_iter().collect(),
            custom_includes: custom_includes.map(Expression::parse).transpose()?,
            custom_excludes: custom_excludes.map(Expression::parse).transpose()?,
        })
    }

    /// A rule that keeps only the named ids.
    #[must_use]
    pub fn including(ids: impl IntoIterator<Item = UrnId>) -> Self {
        Self {
            includes: ids.into_iter().collect(),
            ..Self::default()
        }
    }

    /// A rule that drops the named ids.
    #[must_use]
    pub fn excluding(ids: impl IntoIterator<Item = UrnId>) -> Self {
        Self {
            excludes: ids.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Whether the rule carries any exclude criterion.
    #[must_use]
    pub fn has_excludes(&self) -> bool {
        !self.excludes.is_empty() || self.custom_excludes.is_some()
    }

    /// Whether the rule carries any include criterion.
    #[must_use]
    pub fn has_includes(&self) -> bool {
        !self.includes.is_empty() || self.custom_includes.is_some()
    }

    /// Whether `candidate` is filtered out by this rule.
    ///
    /// `urn` is the module the rule targets; bare literals in custom
    /// expressions resolve against it.
    pub fn filters_out<C: Identified + ?Sized>(&self, urn: &str, candidate: &C) -> bool {
        let id = candidate.urn_id();
        if self.has_excludes() {
            self.excludes.contains(id)
                || self
                    .custom_excludes
                    .as_ref()
                    .is_some_and(|expression| expression.evaluate(urn, candidate))
        } else if self.has_includes() {
            !(self.includes.contains(id)
                || self
                    .custom_includes
                    .as_ref()
                    .is_some_and(|expression| expression.evaluate(urn, candidate)))
        } else {
            false
        }
    }

    /// The explicitly named ids that are not among `accessible`.
    ///
    /// Only the side that takes effect is checked: includes when present,
    /// otherwise excludes.
    pub fn unresolved<'a>(
        &'a self,
        accessible: &'a BTreeSet<UrnId>,
    ) -> impl Iterator<Item = (FilterAction, &'a UrnId)> + 'a {
        let (action, named) = if self.includes.is_empty() {
            (FilterAction::Exclude, &self.excludes)
        } else {
            (FilterAction::Import, &self.includes)
        };
        named
            .iter()
            .filter(move |id| !accessible.contains(*id))
            .map(move |id| (action, id))
    }
}

impl fmt::Display for FilterRule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let join = |ids: &BTreeSet<UrnId>| {
            ids.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        let mut parts = Vec::new();
        if !self.includes.is_empty() {
            parts.push(format!("includes [{}]", join(&self.includes)));
        }
        if !self.excludes.is_empty() {
            parts.push(format!("excludes [{}]", join(&self.excludes)));
        }
        if let Some(expression) = &self.custom_includes {
            parts.push(format!("custom includes `{expression}`"));
        }
        if let Some(expression) = &self.custom_excludes {
            parts.push(format!("custom excludes `{expression}`"));
        }
        if parts.is_empty() {
            f.write_str("no criteria")
        } else {
            f.write_str(&parts.join("; "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RequirementData, SvcData};

    const URN: &str = "ext-001";

    fn req_a() -> RequirementData {
        RequirementData::new(UrnId::new(URN, "REQ_A"), "A")
    }

    fn req_b() -> RequirementData {
        RequirementData::new(UrnId::new(URN, "REQ_B"), "B")
    }

    fn filtered_out(rule: &FilterRule, candidates: &[RequirementData]) -> Vec<String> {
        candidates
            .iter()
            .filter(|candidate| rule.filters_out(URN, *candidate))
            .map(|candidate| candidate.id.id().to_string())
            .collect()
    }

    #[test]
    fn no_criteria_keeps_everything() {
        let rule = FilterRule::default();
        assert!(filtered_out(&rule, &[req_a(), req_b()]).is_empty());
    }

    #[test]
    fn static_excludes_remove_matching() {
        let rule = FilterRule::excluding([req_a().id]);
        assert_eq!(filtered_out(&rule, &[req_a(), req_b()]), vec!["REQ_A"]);
    }

    #[test]
    fn static_includes_keep_only_matching() {
        let rule = FilterRule::including([req_a().id]);
        assert_eq!(filtered_out(&rule, &[req_a(), req_b()]), vec!["REQ_B"]);
    }

    #[test]
    fn custom_excludes_remove_matching() {
        let rule = FilterRule::compile([], [], None, Some(r#"ids == "ext-001:REQ_A""#)).unwrap();
        assert_eq!(filtered_out(&rule, &[req_a(), req_b()]), vec!["REQ_A"]);
    }

    #[test]
    fn custom_includes_keep_only_matching() {
        let rule = FilterRule::compile([], [], Some(r#"ids == "REQ_A""#), None).unwrap();
        assert_eq!(filtered_out(&rule, &[req_a(), req_b()]), vec!["REQ_B"]);
    }

    #[test]
    fn static_and_custom_excludes_combine() {
        let rule = FilterRule::compile([], [req_a().id], None, Some(r#"ids == "REQ_B""#)).unwrap();
        assert_eq!(
            filtered_out(&rule, &[req_a(), req_b()]),
            vec!["REQ_A", "REQ_B"]
        );
    }

    #[test]
    fn static_and_custom_includes_combine() {
        let req_c = RequirementData::new(UrnId::new(URN, "REQ_C"), "C");
        let rule = FilterRule::compile([req_a().id], [], Some(r#"ids == "REQ_B""#), None).unwrap();
        assert_eq!(filtered_out(&rule, &[req_a(), req_b(), req_c]), vec!["REQ_C"]);
    }

    #[test]
    fn excludes_take_precedence_over_includes() {
        let rule = FilterRule::compile([req_a().id], [req_b().id], None, None).unwrap();
        assert_eq!(filtered_out(&rule, &[req_a(), req_b()]), vec!["REQ_B"]);
    }

    #[test]
    fn svc_candidates() {
        let svc = |id: &str| {
            SvcData::new(
                UrnId::new(URN, id),
                id,
                nonempty::nonempty![UrnId::new(URN, "REQ_A")],
            )
        };
        let rule = FilterRule::excluding([UrnId::new(URN, "SVC_A")]);
        assert!(rule.filters_out(URN, &svc("SVC_A")));
        assert!(!rule.filters_out(URN, &svc("SVC_B")));
    }

    #[test]
    fn malformed_expression_fails_construction() {
        let error = FilterRule::compile([], [], None, Some("ids = \"REQ_A\"")).unwrap_err();
        assert_eq!(error.expression(), "ids = \"REQ_A\"");
    }

    #[test]
    fn unresolved_reports_the_effective_side() {
        let accessible = BTreeSet::from([req_a().id]);

        let rule = FilterRule::including([req_a().id, UrnId::new(URN, "REQ_X")]);
        let unresolved: Vec<_> = rule.unresolved(&accessible).collect();
        assert_eq!(
            unresolved,
            vec![(FilterAction::Import, &UrnId::new(URN, "REQ_X"))]
        );

        let rule = FilterRule::excluding([UrnId::new(URN, "REQ_Y")]);
        let unresolved: Vec<_> = rule.unresolved(&accessible).collect();
        assert_eq!(
            unresolved,
            vec![(FilterAction::Exclude, &UrnId::new(URN, "REQ_Y"))]
        );
    }
}
