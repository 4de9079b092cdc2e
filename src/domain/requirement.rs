use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};

use crate::domain::UrnId;

/// How binding a requirement is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Significance {
    /// Mandatory.
    #[default]
    Shall,
    /// Recommended.
    Should,
    /// Optional.
    May,
}

/// Whether a requirement is expected to be implemented in code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Implementation {
    /// Implementation annotations are expected in the source code.
    #[default]
    #[serde(rename = "in-code")]
    InCode,
    /// The requirement is not implemented in code (process, documentation, ...).
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl fmt::Display for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InCode => write!(f, "in-code"),
            Self::NotApplicable => write!(f, "N/A"),
        }
    }
}

/// A requirement defined by exactly one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementData {
    /// Globally addressable identifier.
    pub id: UrnId,
    /// Short title.
    pub title: String,
    /// How binding the requirement is.
    pub significance: Significance,
    /// Full description.
    pub description: String,
    /// Why the requirement exists.
    pub rationale: Option<String>,
    /// Quality categories (e.g. `functional-suitability`).
    pub categories: BTreeSet<String>,
    /// Revision the requirement was last changed in.
    pub revision: String,
    /// Whether the requirement is implemented in code.
    pub implementation: Implementation,
}

impl RequirementData {
    /// Create a requirement with the given id and title and default
    /// attributes.
    #[must_use]
    pub fn new(id: UrnId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            significance: Significance::default(),
            description: String::new(),
            rationale: None,
            categories: BTreeSet::new(),
            revision: String::new(),
            implementation: Implementation::default(),
        }
    }
}
