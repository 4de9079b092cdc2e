use nonempty::NonEmpty;

use crate::domain::UrnId;

/// A manual verification result (MVR).
///
/// Leaf of the dependency chain requirement → SVC → MVR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MvrData {
    /// Globally addressable identifier.
    pub id: UrnId,
    /// SVCs this result reports against.
    pub svc_ids: NonEmpty<UrnId>,
    /// Whether the manual verification passed.
    pub passed: bool,
    /// Free-text comment from the person verifying.
    pub comment: Option<String>,
}

impl MvrData {
    /// Create a passing result for the given SVCs.
    #[must_use]
    pub const fn new(id: UrnId, svc_ids: NonEmpty<UrnId>) -> Self {
        Self {
            id,
            svc_ids,
            passed: true,
            comment: None,
        }
    }
}
