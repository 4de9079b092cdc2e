//! The raw document graph: one set of typed documents per module, plus the
//! import edges between modules.
//!
//! Raw documents are immutable input to model generation. They are produced
//! by a loader (see [`crate::storage`]) or assembled directly in memory.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{
    AnnotationData, FilterRule, MvrData, RequirementData, SvcData, TestData, UrnId,
};

/// The kind of module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// A system, whose requirements may be reused by importers.
    #[default]
    System,
    /// A microservice: a traceability leaf whose own requirements are only
    /// visible when it is the processing root.
    Microservice,
    /// An external requirement library.
    External,
}

impl Variant {
    /// Whether this is the microservice variant.
    #[must_use]
    pub const fn is_microservice(self) -> bool {
        matches!(self, Self::Microservice)
    }
}

/// Identity of a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// Unique module name.
    pub urn: String,
    /// The kind of module.
    pub variant: Variant,
    /// Human-readable title.
    pub title: String,
}

impl Metadata {
    /// Create module metadata.
    #[must_use]
    pub fn new(urn: impl Into<String>, variant: Variant, title: impl Into<String>) -> Self {
        Self {
            urn: urn.into(),
            variant,
            title: title.into(),
        }
    }
}

/// A module's requirement definitions and requirement filters.
#[derive(Debug, Clone)]
pub struct RequirementsDocument {
    /// Identity of the owning module.
    pub metadata: Metadata,
    /// Requirements defined by the module.
    pub requirements: BTreeMap<UrnId, RequirementData>,
    /// Requirement filter rules keyed by the imported urn they narrow.
    pub filters: BTreeMap<String, FilterRule>,
}

impl RequirementsDocument {
    /// A document with no requirements and no filters.
    #[must_use]
    pub const fn new(metadata: Metadata) -> Self {
        Self {
            metadata,
            requirements: BTreeMap::new(),
            filters: BTreeMap::new(),
        }
    }
}

/// A module's verification cases and SVC filters.
#[derive(Debug, Clone, Default)]
pub struct SvcsDocument {
    /// Verification cases defined by the module.
    pub cases: BTreeMap<UrnId, SvcData>,
    /// SVC filter rules keyed by the imported urn they narrow.
    pub filters: BTreeMap<String, FilterRule>,
}

/// A module's manual verification results.
#[derive(Debug, Clone, Default)]
pub struct MvrsDocument {
    /// Results recorded by the module.
    pub results: BTreeMap<UrnId, MvrData>,
}

/// A module's code annotations.
#[derive(Debug, Clone, Default)]
pub struct AnnotationsDocument {
    /// Implementation annotations keyed by the requirement they implement.
    pub implementations: BTreeMap<UrnId, Vec<AnnotationData>>,
    /// Test annotations keyed by the SVC they exercise.
    pub tests: BTreeMap<UrnId, Vec<AnnotationData>>,
}

/// A module's recorded automated test run.
#[derive(Debug, Clone, Default)]
pub struct AutomatedTests {
    /// Results keyed by `(module urn, fully-qualified test name)`.
    pub tests: BTreeMap<UrnId, TestData>,
}

impl AutomatedTests {
    /// Record a result for a test run by the module `urn`.
    pub fn record(&mut self, urn: &str, test: TestData) {
        self.tests
            .insert(UrnId::new(urn, test.fully_qualified_name.clone()), test);
    }
}

/// Every document of one module.
#[derive(Debug, Clone)]
pub struct RawDataset {
    /// Requirements and requirement filters. Always present.
    pub requirements: RequirementsDocument,
    /// Verification cases, if the module declares any.
    pub svcs: Option<SvcsDocument>,
    /// Manual verification results, if the module records any.
    pub mvrs: Option<MvrsDocument>,
    /// Code annotations, if the module has any.
    pub annotations: Option<AnnotationsDocument>,
    /// Automated test results, if the module recorded a run.
    pub automated_tests: Option<AutomatedTests>,
}

impl RawDataset {
    /// A module with only a requirements document.
    #[must_use]
    pub const fn new(requirements: RequirementsDocument) -> Self {
        Self {
            requirements,
            svcs: None,
            mvrs: None,
            annotations: None,
            automated_tests: None,
        }
    }

    /// The module's urn.
    #[must_use]
    pub fn urn(&self) -> &str {
        &self.requirements.metadata.urn
    }

    /// The module's variant.
    #[must_use]
    pub const fn variant(&self) -> Variant {
        self.requirements.metadata.variant
    }
}

/// The complete raw document graph for one processing root.
#[derive(Debug, Clone)]
pub struct CombinedRawDataset {
    /// The processing root.
    pub initial_urn: String,
    /// Module urns in the order they were read.
    pub urn_parsing_order: Vec<String>,
    /// Documents keyed by module urn.
    pub raw_datasets: BTreeMap<String, RawDataset>,
    /// Import adjacency list: module urn to the urns it imports, in
    /// declaration order.
    pub parsing_graph: BTreeMap<String, Vec<String>>,
}

impl CombinedRawDataset {
    /// An empty graph rooted at `initial_urn`.
    #[must_use]
    pub fn new(initial_urn: impl Into<String>) -> Self {
        Self {
            initial_urn: initial_urn.into(),
            urn_parsing_order: Vec::new(),
            raw_datasets: BTreeMap::new(),
            parsing_graph: BTreeMap::new(),
        }
    }

    /// Add a module and its import edges.
    ///
    /// Returns the previous documents if a module with the same urn was
    /// already present.
    pub fn insert(
        &mut self,
        dataset: RawDataset,
        imports: impl IntoIterator<Item = String>,
    ) -> Option<RawDataset> {
        let urn = dataset.urn().to_string();
        self.parsing_graph
            .insert(urn.clone(), imports.into_iter().collect());
        let previous = self.raw_datasets.insert(urn.clone(), dataset);
        if previous.is_none() {
            self.urn_parsing_order.push(urn);
        }
        previous
    }

    /// The documents of module `urn`.
    #[must_use]
    pub fn get(&self, urn: &str) -> Option<&RawDataset> {
        self.raw_datasets.get(urn)
    }

    /// The urns imported by module `urn`.
    #[must_use]
    pub fn imports(&self, urn: &str) -> &[String] {
        self.parsing_graph.get(urn).map_or(&[], Vec::as_slice)
    }

    /// Whether module `urn` is a microservice.
    #[must_use]
    pub fn is_microservice(&self, urn: &str) -> bool {
        self.get(urn)
            .is_some_and(|dataset| dataset.variant().is_microservice())
    }
}
