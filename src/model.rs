//! The indexed traceability model.
//!
//! [`generate`] merges a [`CombinedRawDataset`](crate::domain::CombinedRawDataset)
//! into one [`IndexedDataset`] and, when asked to, filters it down to what
//! the root module is permitted to see. Deleting a requirement cascades to
//! the verification cases left verifying nothing, and from there to the
//! manual results left reporting on nothing.

mod dataset;
pub use dataset::{FilterWarning, Inconsistency, IndexedDataset};

mod filter_processor;

mod generator;
pub use generator::{Error as GenerateError, generate};

#[cfg(test)]
pub(crate) mod fixtures;
