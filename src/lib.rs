//! Requirements traceability across interlinked modules
//!
//! Systems, microservices and external modules each publish requirements,
//! software verification cases (SVCs) and manual verification results (MVRs),
//! and import one another. This crate merges a module graph into one indexed
//! model and narrows it to what the root module is permitted to see.

pub mod domain;
pub use domain::{CombinedRawDataset, Config, FilterRule, UrnId};

pub mod el;
pub use el::Expression;

pub mod model;
pub use model::{GenerateError, IndexedDataset, generate};

pub mod storage;
pub use storage::{LoadError, load};
