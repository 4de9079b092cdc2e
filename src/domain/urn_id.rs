use std::{fmt, str::FromStr};

/// Separator between the urn and the local id in the textual form.
pub const SEPARATOR: char = ':';

/// A globally addressable identifier for a requirement, SVC, MVR or test.
///
/// Format: `{URN}:{ID}`, where:
/// - `URN` names the module (system or microservice) owning the entity
/// - `ID` is the entity's local identifier within that module
///
/// Identifiers are ordered by urn, then by local id.
///
/// Examples: `ms-001:REQ_010`, `sys-001:SVC_sys001_A`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UrnId {
    urn: String,
    id: String,
}

impl UrnId {
    /// Create an identifier from its two components.
    ///
    /// This is an infallible constructor; use [`str::parse`] to validate
    /// untrusted text.
    #[must_use]
    pub fn new(urn: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            urn: urn.into(),
            id: id.into(),
        }
    }

    /// Resolve `id` against the module `urn`.
    ///
    /// A bare local id is qualified with `urn`; an id that already carries a
    /// urn (`other:REQ_001`) keeps its own.
    ///
    /// # Errors
    ///
    /// Returns an error if either resolved component is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use reqtrace::UrnId;
    ///
    /// let bare = UrnId::assure("ms-001", "REQ_001").unwrap();
    /// assert_eq!(bare.to_string(), "ms-001:REQ_001");
    ///
    /// let qualified = UrnId::assure("ms-001", "sys-001:REQ_042").unwrap();
    /// assert_eq!(qualified.urn(), "sys-001");
    /// ```
    pub fn assure(urn: &str, id: &str) -> Result<Self, Error> {
        if id.contains(SEPARATOR) {
            id.parse()
        } else {
            Self::checked(urn, id, id)
        }
    }

    /// Returns the urn of the owning module.
    #[must_use]
    pub fn urn(&self) -> &str {
        &self.urn
    }

    /// Returns the local id within the owning module.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether this identifier equals `literal` once `literal` is resolved
    /// against `urn`.
    ///
    /// Equivalent to comparing with [`UrnId::assure`] without allocating.
    #[must_use]
    pub fn matches_literal(&self, urn: &str, literal: &str) -> bool {
        match literal.split_once(SEPARATOR) {
            Some((literal_urn, literal_id)) => self.urn == literal_urn && self.id == literal_id,
            None => self.urn == urn && self.id == literal,
        }
    }

    fn checked(urn: &str, id: &str, input: &str) -> Result<Self, Error> {
        if urn.is_empty() {
            return Err(Error::EmptyUrn(input.to_string()));
        }
        if id.is_empty() {
            return Err(Error::EmptyId(input.to_string()));
        }
        Ok(Self::new(urn, id))
    }
}

impl fmt::Display for UrnId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{SEPARATOR}{}", self.urn, self.id)
    }
}

/// Errors that can occur when parsing an identifier.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// The text has no `:` separating urn and id.
    #[error("Invalid identifier '{0}': expected the form 'urn:id'")]
    MissingSeparator(String),

    /// The urn component is empty.
    #[error("Invalid identifier '{0}': urn cannot be empty")]
    EmptyUrn(String),

    /// The id component is empty.
    #[error("Invalid identifier '{0}': id cannot be empty")]
    EmptyId(String),
}

impl FromStr for UrnId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // the id may itself contain separators, the urn may not
        let (urn, id) = s
            .split_once(SEPARATOR)
            .ok_or_else(|| Error::MissingSeparator(s.to_string()))?;
        Self::checked(urn, id, s)
    }
}

impl TryFrom<&str> for UrnId {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::from_str(value)
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn display_joins_with_separator() {
        let urn_id = UrnId::new("ms-001", "REQ_001");
        assert_eq!(urn_id.to_string(), "ms-001:REQ_001");
    }

    #[test_case("ms-001:REQ_001", "ms-001", "REQ_001"; "simple")]
    #[test_case("sys-001:REQ:with:colons", "sys-001", "REQ:with:colons"; "id keeps later separators")]
    fn parse_valid(input: &str, urn: &str, id: &str) {
        let urn_id: UrnId = input.parse().unwrap();
        assert_eq!(urn_id.urn(), urn);
        assert_eq!(urn_id.id(), id);
    }

    #[test]
    fn parse_without_separator_fails() {
        assert_eq!(
            UrnId::try_from("REQ_001"),
            Err(Error::MissingSeparator("REQ_001".to_string()))
        );
    }

    #[test]
    fn parse_empty_components_fail() {
        assert!(matches!(UrnId::try_from(":REQ_001"), Err(Error::EmptyUrn(_))));
        assert!(matches!(UrnId::try_from("ms-001:"), Err(Error::EmptyId(_))));
    }

    #[test]
    fn assure_bare_id_uses_context_urn() {
        let urn_id = UrnId::assure("ms-001", "REQ_001").unwrap();
        assert_eq!(urn_id, UrnId::new("ms-001", "REQ_001"));
    }

    #[test]
    fn assure_qualified_id_uses_embedded_urn() {
        let urn_id = UrnId::assure("ms-001", "other-urn:REQ_999").unwrap();
        assert_eq!(urn_id, UrnId::new("other-urn", "REQ_999"));

        let same = UrnId::assure("ms-001", "ms-001:REQ_042").unwrap();
        assert_eq!(same, UrnId::new("ms-001", "REQ_042"));
    }

    #[test]
    fn assure_empty_fails() {
        assert!(matches!(UrnId::assure("ms-001", ""), Err(Error::EmptyId(_))));
        assert!(matches!(UrnId::assure("", "REQ_001"), Err(Error::EmptyUrn(_))));
    }

    #[test]
    fn ordering_is_by_urn_then_id() {
        let mut ids = vec![
            UrnId::new("sys-001", "A"),
            UrnId::new("ms-001", "B"),
            UrnId::new("ms-001", "A"),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![
                UrnId::new("ms-001", "A"),
                UrnId::new("ms-001", "B"),
                UrnId::new("sys-001", "A"),
            ]
        );
    }

    #[test_case("REQ_001", true; "bare literal resolved against urn")]
    #[test_case("ms-001:REQ_001", true; "qualified literal")]
    #[test_case("sys-001:REQ_001", false; "other urn")]
    #[test_case("REQ_002", false; "other id")]
    fn matches_literal(literal: &str, expected: bool) {
        let urn_id = UrnId::new("ms-001", "REQ_001");
        assert_eq!(urn_id.matches_literal("ms-001", literal), expected);
    }

    #[test]
    fn error_display() {
        let error = Error::MissingSeparator("bad".to_string());
        assert_eq!(
            error.to_string(),
            "Invalid identifier 'bad': expected the form 'urn:id'"
        );
    }
}
