//! Builders for raw module graphs used across the model tests.

use nonempty::NonEmpty;

use crate::domain::{
    AnnotationData, CombinedRawDataset, ElementKind, FilterRule, MvrData, RawDataset,
    RequirementData, SvcData, TestData, TestStatus, UrnId, Variant,
    raw::{
        AnnotationsDocument, AutomatedTests, Metadata, MvrsDocument, RequirementsDocument,
        SvcsDocument,
    },
};

/// Parse `urn:id`, or qualify a bare id with `urn`.
pub fn qualify(urn: &str, id: &str) -> UrnId {
    UrnId::assure(urn, id).unwrap()
}

fn qualify_all(urn: &str, ids: &[&str]) -> NonEmpty<UrnId> {
    NonEmpty::from_vec(ids.iter().map(|id| qualify(urn, id)).collect())
        .expect("reference list must not be empty")
}

pub struct GraphBuilder {
    crd: CombinedRawDataset,
}

impl GraphBuilder {
    pub fn new(root: &str) -> Self {
        Self {
            crd: CombinedRawDataset::new(root),
        }
    }

    pub fn module(
        mut self,
        urn: &str,
        variant: Variant,
        imports: &[&str],
        build: impl FnOnce(ModuleBuilder) -> ModuleBuilder,
    ) -> Self {
        let module = build(ModuleBuilder::new(urn, variant));
        self.crd.insert(
            module.dataset,
            imports.iter().map(|import| (*import).to_string()),
        );
        self
    }

    pub fn build(self) -> CombinedRawDataset {
        self.crd
    }
}

pub struct ModuleBuilder {
    urn: String,
    dataset: RawDataset,
}

impl ModuleBuilder {
    fn new(urn: &str, variant: Variant) -> Self {
        Self {
            urn: urn.to_string(),
            dataset: RawDataset::new(RequirementsDocument::new(Metadata::new(
                urn,
                variant,
                format!("{urn} title"),
            ))),
        }
    }

    pub fn requirements(mut self, ids: &[&str]) -> Self {
        for id in ids {
            let id = qualify(&self.urn, id);
            self.dataset
                .requirements
                .requirements
                .insert(id.clone(), RequirementData::new(id, "title"));
        }
        self
    }

    pub fn svc(mut self, id: &str, requirements: &[&str]) -> Self {
        let id = qualify(&self.urn, id);
        let svc = SvcData::new(id.clone(), "title", qualify_all(&self.urn, requirements));
        self.svcs().cases.insert(id, svc);
        self
    }

    pub fn mvr(mut self, id: &str, svcs: &[&str]) -> Self {
        let id = qualify(&self.urn, id);
        let mvr = MvrData::new(id.clone(), qualify_all(&self.urn, svcs));
        self.dataset
            .mvrs
            .get_or_insert_with(MvrsDocument::default)
            .results
            .insert(id, mvr);
        self
    }

    pub fn requirement_filter(mut self, target: &str, rule: FilterRule) -> Self {
        self.dataset
            .requirements
            .filters
            .insert(target.to_string(), rule);
        self
    }

    pub fn svc_filter(mut self, target: &str, rule: FilterRule) -> Self {
        self.svcs().filters.insert(target.to_string(), rule);
        self
    }

    pub fn impl_annotation(mut self, requirement: &str, kind: ElementKind, fqn: &str) -> Self {
        let requirement = qualify(&self.urn, requirement);
        self.annotations()
            .implementations
            .entry(requirement)
            .or_default()
            .push(AnnotationData::new(kind, fqn));
        self
    }

    pub fn test_annotation(mut self, svc: &str, kind: ElementKind, fqn: &str) -> Self {
        let svc = qualify(&self.urn, svc);
        self.annotations()
            .tests
            .entry(svc)
            .or_default()
            .push(AnnotationData::new(kind, fqn));
        self
    }

    pub fn test_result(mut self, fqn: &str, status: TestStatus) -> Self {
        self.dataset
            .automated_tests
            .get_or_insert_with(AutomatedTests::default)
            .record(&self.urn, TestData::new(fqn, status));
        self
    }

    fn svcs(&mut self) -> &mut SvcsDocument {
        self.dataset.svcs.get_or_insert_with(SvcsDocument::default)
    }

    fn annotations(&mut self) -> &mut AnnotationsDocument {
        self.dataset
            .annotations
            .get_or_insert_with(AnnotationsDocument::default)
    }
}

/// `ms-001` (root) imports `sys-001`, which imports `ext-001`.
///
/// - `ext-001` defines `REQ_E1` and `REQ_E2`
/// - `sys-001` defines `REQ_S1`, `REQ_S2` and verifies `REQ_E1` with
///   `SVC_S1`
/// - `ms-001` defines `REQ_M1`, verifies `REQ_S1` with `SVC_M1`, both
///   `REQ_S2` and `REQ_M1` with `SVC_M2`, and records `MVR_M1` against
///   `SVC_M1` and `SVC_M2`
pub fn three_tier(
    ms: impl FnOnce(ModuleBuilder) -> ModuleBuilder,
    sys: impl FnOnce(ModuleBuilder) -> ModuleBuilder,
) -> CombinedRawDataset {
    GraphBuilder::new("ms-001")
        .module("ms-001", Variant::Microservice, &["sys-001"], |module| {
            ms(module
                .requirements(&["REQ_M1"])
                .svc("SVC_M1", &["sys-001:REQ_S1"])
                .svc("SVC_M2", &["sys-001:REQ_S2", "REQ_M1"])
                .mvr("MVR_M1", &["SVC_M1", "SVC_M2"]))
        })
        .module("sys-001", Variant::System, &["ext-001"], |module| {
            sys(module
                .requirements(&["REQ_S1", "REQ_S2"])
                .svc("SVC_S1", &["ext-001:REQ_E1"]))
        })
        .module("ext-001", Variant::External, &[], |module| {
            module.requirements(&["REQ_E1", "REQ_E2"])
        })
        .build()
}
