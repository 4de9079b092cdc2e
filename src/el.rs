//! Filter expression language.
//!
//! Custom include/exclude filters match candidates by pattern instead of by
//! enumerating ids:
//!
//! ```text
//! ids == "REQ_001", "sys-001:REQ_002"
//! ids != /REQ_0\d{2}/
//! not (ids == "REQ_001" or ids == /^ext-001:/) and ids != "REQ_999"
//! ```
//!
//! A literal is a bare local id (qualified by the urn the filter targets) or a
//! fully-qualified `urn:id`. A `/regex/` is matched against the candidate's
//! full `urn:id` text. `and`, `or` and `not` combine comparisons; mixing `and`
//! with `or` requires parentheses.
//!
//! An [`Expression`] is parsed once and evaluated many times.

use std::{fmt, str::FromStr};

use regex::Regex;

use crate::domain::{RequirementData, SvcData, UrnId};

mod lexer;
mod parser;

/// Anything a filter expression can be evaluated against.
pub trait Identified {
    /// The globally addressable identifier of the item.
    fn urn_id(&self) -> &UrnId;
}

impl Identified for UrnId {
    fn urn_id(&self) -> &UrnId {
        self
    }
}

impl Identified for RequirementData {
    fn urn_id(&self) -> &UrnId {
        &self.id
    }
}

impl Identified for SvcData {
    fn urn_id(&self) -> &UrnId {
        &self.id
    }
}

/// A compiled filter expression.
#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    root: Expr,
}

impl Expression {
    /// Compile an expression.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] identifying the expression text if it is empty,
    /// malformed, uses an unsupported operator, has unbalanced parentheses,
    /// mixes `and` and `or` without grouping, or contains an invalid regex.
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        let root = parser::Parser::parse(source)?;
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    /// The source text the expression was compiled from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The root of the compiled syntax tree.
    #[must_use]
    pub const fn root(&self) -> &Expr {
        &self.root
    }

    /// Evaluate the expression for `candidate`, resolving bare literals
    /// against `urn`.
    pub fn evaluate<C: Identified + ?Sized>(&self, urn: &str, candidate: &C) -> bool {
        self.root.evaluate(urn, candidate.urn_id())
    }
}

impl FromStr for Expression {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// A node of the compiled syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `ids == operands` (or `!=` when `negated`).
    Comparison {
        /// Whether the operator is `!=`.
        negated: bool,
        /// The comma-separated operand list; never empty.
        operands: Vec<Operand>,
    },
    /// All sub-expressions hold.
    And(Vec<Expr>),
    /// At least one sub-expression holds.
    Or(Vec<Expr>),
    /// The sub-expression does not hold.
    Not(Box<Expr>),
}

impl Expr {
    fn evaluate(&self, urn: &str, candidate: &UrnId) -> bool {
        match self {
            Self::Comparison { negated, operands } => {
                let mut rendered: Option<String> = None;
                let matched = operands.iter().any(|operand| match operand {
                    Operand::Literal(literal) => candidate.matches_literal(urn, literal),
                    Operand::Pattern(regex) => regex
                        .is_match(rendered.get_or_insert_with(|| candidate.to_string()).as_str()),
                });
                matched != *negated
            }
            Self::And(exprs) => exprs.iter().all(|expr| expr.evaluate(urn, candidate)),
            Self::Or(exprs) => exprs.iter().any(|expr| expr.evaluate(urn, candidate)),
            Self::Not(expr) => !expr.evaluate(urn, candidate),
        }
    }
}

/// A comparison operand.
#[derive(Debug, Clone)]
pub enum Operand {
    /// A quoted id, bare or fully qualified.
    Literal(String),
    /// A `/regex/` matched against the full `urn:id` text.
    Pattern(Regex),
}

impl PartialEq for Operand {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Literal(a), Self::Literal(b)) => a == b,
            (Self::Pattern(a), Self::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

/// An expression could not be compiled.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("invalid filter expression '{expression}' at offset {offset}: {kind}")]
pub struct ParseError {
    expression: String,
    offset: usize,
    kind: ParseErrorKind,
}

impl ParseError {
    fn new(expression: &str, offset: usize, kind: ParseErrorKind) -> Self {
        Self {
            expression: expression.to_string(),
            offset,
            kind,
        }
    }

    /// The offending expression text.
    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Byte offset of the error within the expression.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// What went wrong.
    #[must_use]
    pub const fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }
}

/// The reason an expression could not be compiled.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The expression contains no tokens.
    #[error("empty expression")]
    Empty,
    /// A character that starts no token (including unsupported operators).
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    /// A `"` literal is not closed.
    #[error("unterminated string literal")]
    UnterminatedString,
    /// A `/` pattern is not closed.
    #[error("unterminated regex")]
    UnterminatedRegex,
    /// A `/` pattern is not a valid regular expression.
    #[error("invalid regex: {0}")]
    InvalidRegex(String),
    /// A token that does not fit the grammar at this position.
    #[error("expected {expected}, found {found}")]
    UnexpectedToken {
        /// What the grammar allows here.
        expected: &'static str,
        /// What was found instead.
        found: String,
    },
    /// Comparisons are only supported on `ids`.
    #[error("unknown field '{0}', expected 'ids'")]
    UnknownField(String),
    /// `and` and `or` at the same level without parentheses.
    #[error("'and' and 'or' cannot be mixed without parentheses")]
    MixedConnectives,
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use test_case::test_case;

    use super::*;

    fn eval(source: &str, candidate: &str) -> bool {
        let expression = Expression::parse(source).unwrap();
        let candidate: UrnId = candidate.parse().unwrap();
        expression.evaluate("urn", &candidate)
    }

    #[test_case(r#"ids == "REQ_001""#, "urn:REQ_001", true; "bare literal")]
    #[test_case(r#"ids == "REQ_001""#, "urn:REQ_101", false; "bare literal mismatch")]
    #[test_case(r#"ids == "REQ_001", "urn:REQ_101""#, "urn:REQ_101", true; "qualified literal in list")]
    #[test_case(r#"ids == "REQ_001", "REQ_101""#, "urn:REQ_999", false; "no literal in list")]
    #[test_case(r#"ids == "REQ_001""#, "other:REQ_001", false; "bare literal is urn scoped")]
    #[test_case(r#"ids == "other:REQ_001""#, "other:REQ_001", true; "qualified literal other urn")]
    #[test_case(r#"ids != "REQ_001""#, "urn:REQ_001", false; "not equals match")]
    #[test_case(r#"ids != "REQ_001""#, "urn:REQ_101", true; "not equals mismatch")]
    fn comparison(source: &str, candidate: &str, expected: bool) {
        assert_eq!(eval(source, candidate), expected);
    }

    #[test_case("urn:123", false)]
    #[test_case("urn:REQ_", false)]
    #[test_case("urn:REQ_1", false)]
    #[test_case("urn:REQ_01", true)]
    #[test_case("urn:REQ_101", true)]
    #[test_case("urn:REQ_1234", false)]
    #[test_case("urn:REQ_123", true)]
    fn regex(candidate: &str, expected: bool) {
        assert_eq!(
            eval(r"ids == /urn\:REQ_(\d{2,3}|123)$/", candidate),
            expected
        );
    }

    #[test]
    fn regex_and_literal_operands_mix() {
        let source = r#"ids == "REQ_001", /^urn:SVC_/"#;
        assert!(eval(source, "urn:REQ_001"));
        assert!(eval(source, "urn:SVC_7"));
        assert!(!eval(source, "urn:REQ_002"));
    }

    #[test]
    fn and() {
        assert!(eval(r#"ids == "REQ_001" and ids == "REQ_001""#, "urn:REQ_001"));
        assert!(!eval(r#"ids == "REQ_001" and ids == "REQ_001""#, "urn:REQ_101"));
        assert!(!eval(r#"ids == "REQ_001" and ids == "REQ_101""#, "urn:REQ_001"));
        assert!(!eval(r#"ids == "REQ_001" and ids == "REQ_101""#, "urn:REQ_101"));
    }

    #[test]
    fn or() {
        assert!(eval(r#"ids == "REQ_001" or ids == "REQ_001""#, "urn:REQ_001"));
        assert!(!eval(r#"ids == "REQ_001" or ids == "REQ_001""#, "urn:REQ_101"));
        assert!(eval(r#"ids == "REQ_001" or ids == "REQ_101""#, "urn:REQ_001"));
        assert!(eval(r#"ids == "REQ_001" or ids == "REQ_101""#, "urn:REQ_101"));
    }

    #[test]
    fn not() {
        assert!(eval(r#"ids == "REQ_001""#, "urn:REQ_001"));
        assert!(!eval(r#"not ids == "REQ_001""#, "urn:REQ_001"));
        assert!(eval(r#"not not ids == "REQ_001""#, "urn:REQ_001"));
    }

    #[test]
    fn grouping() {
        let source = r#"(ids == "A" or ids == "B") and not (ids == "B")"#;
        assert!(eval(source, "urn:A"));
        assert!(!eval(source, "urn:B"));
        assert!(!eval(source, "urn:C"));
    }

    #[test]
    fn evaluates_against_records() {
        let expression = Expression::parse(r#"ids == "REQ_001""#).unwrap();
        let requirement = RequirementData::new(UrnId::new("ms-001", "REQ_001"), "title");
        assert!(expression.evaluate("ms-001", &requirement));
        assert!(!expression.evaluate("sys-001", &requirement));
    }

    #[test_case(r#"ids > "REQ_001""#; "unsupported operator")]
    #[test_case(r#"(ids == "REQ_001""#; "unbalanced parentheses")]
    #[test_case(""; "empty")]
    #[test_case("not a valid expression !!!"; "garbage")]
    #[test_case(r#"ids == "A" and ids == "B" or ids == "C""#; "mixed connectives")]
    fn parse_errors(source: &str) {
        let error = Expression::parse(source).unwrap_err();
        assert_eq!(error.expression(), source);
        assert!(error.to_string().contains(source));
    }

    #[test]
    fn display_round_trips_source() {
        let source = r#"ids != "REQ_001""#;
        let expression: Expression = source.parse().unwrap();
        assert_eq!(expression.to_string(), source);
        assert_eq!(expression.source(), source);
    }

    proptest! {
        #[test]
        fn equals_matches_listed_ids_and_not_equals_the_complement(
            listed in prop::collection::btree_set("[A-Z]{1,3}_[0-9]{1,2}", 1..4),
            candidate in "[A-Z]{1,3}_[0-9]{1,2}",
        ) {
            let operands = listed
                .iter()
                .map(|id| format!("\"{id}\""))
                .collect::<Vec<_>>()
                .join(", ");
            let equals = Expression::parse(&format!("ids == {operands}")).unwrap();
            let not_equals = Expression::parse(&format!("ids != {operands}")).unwrap();
            let candidate = UrnId::new("urn", candidate);

            let expected = listed.contains(candidate.id());
            prop_assert_eq!(equals.evaluate("urn", &candidate), expected);
            prop_assert_eq!(not_equals.evaluate("urn", &candidate), !expected);
        }
    }
}
