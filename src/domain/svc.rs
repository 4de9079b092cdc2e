use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};

use crate::domain::UrnId;

/// How a verification case is carried out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerificationKind {
    /// Verified by an automated test.
    #[default]
    AutomatedTest,
    /// Verified by a person following instructions.
    ManualTest,
    /// Verified by review.
    Review,
    /// Verified by the platform.
    Platform,
    /// Any other kind of verification.
    Other,
}

/// A software verification case (SVC).
///
/// An SVC verifies one or more requirements, possibly defined in other
/// modules. The list of verified requirements is never empty: an SVC that
/// verifies nothing does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvcData {
    /// Globally addressable identifier.
    pub id: UrnId,
    /// Short title.
    pub title: String,
    /// Full description.
    pub description: Option<String>,
    /// How the case is verified.
    pub verification: VerificationKind,
    /// Instructions for manual verification.
    pub instructions: Option<String>,
    /// Revision the case was last changed in.
    pub revision: String,
    /// Requirements verified by this case.
    pub requirement_ids: NonEmpty<UrnId>,
}

impl SvcData {
    /// Create an automated-test SVC verifying the given requirements.
    #[must_use]
    pub fn new(id: UrnId, title: impl Into<String>, requirement_ids: NonEmpty<UrnId>) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            verification: VerificationKind::default(),
            instructions: None,
            revision: String::new(),
            requirement_ids,
        }
    }
}
