//! Domain models for requirements traceability.
//!
//! This module contains the identifier type, the entity records (requirements,
//! verification cases, manual results, annotations and test results), the raw
//! per-module document graph, filter rules, and configuration.

use nonempty::NonEmpty;

/// Globally addressable `urn:id` identifiers.
pub mod urn_id;
pub use urn_id::{Error as UrnIdError, UrnId};

mod requirement;
pub use requirement::{Implementation, RequirementData, Significance};

mod svc;
pub use svc::{SvcData, VerificationKind};

mod mvr;
pub use mvr::MvrData;

mod annotation;
pub use annotation::{AnnotationData, ElementKind};

mod test_result;
pub use test_result::{TestData, TestStatus};

mod filter;
pub use filter::{FilterAction, FilterRule};

pub mod raw;
pub use raw::{CombinedRawDataset, RawDataset, Variant};

mod config;
pub use config::Config;

/// Keep only the ids for which `keep` holds, preserving order.
///
/// Returns `None` when nothing is left, since reference lists are never empty.
pub(crate) fn retain_ids(
    ids: &NonEmpty<UrnId>,
    mut keep: impl FnMut(&UrnId) -> bool,
) -> Option<NonEmpty<UrnId>> {
    NonEmpty::from_vec(ids.iter().filter(|id| keep(id)).cloned().collect())
}
