use serde::{Deserialize, Serialize};

/// The kind of code element an annotation is attached to.
///
/// Class-level test annotations are resolved against every test inside the
/// class; all other kinds name exactly one test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ElementKind {
    /// A class (or test suite).
    Class,
    /// An interface.
    Interface,
    /// An enumeration.
    Enum,
    /// A record type.
    Record,
    /// A method on a class.
    Method,
    /// A field on a class.
    Field,
    /// A free function.
    Function,
}

/// A link from a requirement to implementing code, or from an SVC to a test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationData {
    /// What kind of element carries the annotation.
    pub element_kind: ElementKind,
    /// Fully-qualified name of the annotated element.
    pub fully_qualified_name: String,
}

impl AnnotationData {
    /// Create an annotation.
    #[must_use]
    pub fn new(element_kind: ElementKind, fully_qualified_name: impl Into<String>) -> Self {
        Self {
            element_kind,
            fully_qualified_name: fully_qualified_name.into(),
        }
    }
}
