//! Reading module graphs from the filesystem.
//!
//! Each module is a directory holding a requirements document and, optionally,
//! verification cases, manual verification results, code annotations and
//! automated test results. Modules import one another by relative path.

mod documents;
mod loader;

pub use documents::DocumentError;
pub use loader::{LoadError, load};
