use std::collections::{BTreeMap, BTreeSet};

use petgraph::{
    algo::{tarjan_scc, toposort},
    graphmap::DiGraphMap,
};
use thiserror::Error;
use tracing::{debug, instrument};

use super::{IndexedDataset, filter_processor::FilterProcessor};
use crate::domain::{
    AnnotationData, CombinedRawDataset, ElementKind, MvrData, RawDataset, SvcData, TestData,
    TestStatus, UrnId, retain_ids,
};

/// Errors that abort model generation.
///
/// Each signals raw input that should have been rejected before generation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The root module has no documents.
    #[error("root module '{0}' is not part of the dataset")]
    UnknownRoot(String),

    /// The import graph lists a module that has no documents.
    #[error("module '{module}' imports unknown module '{import}'")]
    UnknownImport {
        /// The importing module.
        module: String,
        /// The missing import.
        import: String,
    },

    /// Modules import each other in a cycle.
    #[error("import cycle between modules: {}", .0.join(", "))]
    CyclicImports(Vec<String>),

    /// Two requirements share an identifier.
    #[error("duplicate requirement {0}")]
    DuplicateRequirement(UrnId),

    /// Two verification cases share an identifier.
    #[error("duplicate SVC {0}")]
    DuplicateSvc(UrnId),

    /// Two manual verification results share an identifier.
    #[error("duplicate MVR {0}")]
    DuplicateMvr(UrnId),
}

/// Merge the raw document graph into one indexed model.
///
/// When `filter` is set, the model is then shrunk to what the root module is
/// permitted to see.
///
/// # Errors
///
/// Returns an error if the root or an import is unknown, the import graph is
/// cyclic, or an identifier is defined twice.
#[instrument(skip(crd), fields(root = %crd.initial_urn))]
pub fn generate(crd: &CombinedRawDataset, filter: bool) -> Result<IndexedDataset, Error> {
    let accessible_nodes = accessible_nodes(crd)?;
    let mut dataset = Generator::new(crd, accessible_nodes).build()?;

    if filter {
        FilterProcessor::new(crd, &mut dataset).run();
    }

    debug!(
        requirements = dataset.requirements.len(),
        svcs = dataset.svcs.len(),
        mvrs = dataset.mvrs.len(),
        filtered = dataset.filtered,
        "Generated indexed dataset"
    );
    Ok(dataset)
}

/// For every module, the set of modules it transitively imports.
fn accessible_nodes(
    crd: &CombinedRawDataset,
) -> Result<BTreeMap<String, BTreeSet<String>>, Error> {
    if !crd.raw_datasets.contains_key(&crd.initial_urn) {
        return Err(Error::UnknownRoot(crd.initial_urn.clone()));
    }

    let mut graph = DiGraphMap::<&str, ()>::new();
    for urn in crd.raw_datasets.keys() {
        graph.add_node(urn.as_str());
    }
    for (urn, imports) in &crd.parsing_graph {
        for import in imports {
            if !crd.raw_datasets.contains_key(import) || !crd.raw_datasets.contains_key(urn) {
                return Err(Error::UnknownImport {
                    module: urn.clone(),
                    import: import.clone(),
                });
            }
            graph.add_edge(urn.as_str(), import.as_str(), ());
        }
    }

    if let Some(cycle) = cycles(&graph).into_iter().next() {
        return Err(Error::CyclicImports(cycle));
    }
    let order = toposort(&graph, None)
        .map_err(|cycle| Error::CyclicImports(vec![cycle.node_id().to_string()]))?;

    // imports come after their importers in topological order
    let mut closure: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for urn in order.into_iter().rev() {
        let mut reachable = BTreeSet::new();
        for import in graph.neighbors(urn) {
            reachable.insert(import.to_string());
            if let Some(transitive) = closure.get(import) {
                reachable.extend(transitive.iter().cloned());
            }
        }
        closure.insert(urn.to_string(), reachable);
    }
    Ok(closure)
}

/// Every set of modules importing each other in a cycle, sorted.
fn cycles(graph: &DiGraphMap<&str, ()>) -> Vec<Vec<String>> {
    let mut cycles = Vec::new();

    for component in tarjan_scc(graph) {
        let is_cycle = match component.as_slice() {
            [node] => graph.contains_edge(*node, *node),
            _ => true,
        };
        if is_cycle {
            let mut members: Vec<String> = component.iter().map(|urn| (*urn).to_string()).collect();
            members.sort();
            cycles.push(members);
        }
    }

    cycles.sort();
    cycles
}

struct Generator<'a> {
    crd: &'a CombinedRawDataset,
    /// The root plus every non-microservice module it can reach.
    visible: BTreeSet<&'a str>,
    dataset: IndexedDataset,
}

impl<'a> Generator<'a> {
    fn new(crd: &'a CombinedRawDataset, accessible_nodes: BTreeMap<String, BTreeSet<String>>) -> Self {
        let mut visible = BTreeSet::from([crd.initial_urn.as_str()]);
        if let Some(accessible) = accessible_nodes.get(&crd.initial_urn) {
            for urn in accessible {
                if let Some((urn, _)) = crd
                    .raw_datasets
                    .get_key_value(urn)
                    .filter(|(_, raw)| !raw.variant().is_microservice())
                {
                    visible.insert(urn.as_str());
                }
            }
        }

        let dataset = IndexedDataset {
            initial_urn: crd.initial_urn.clone(),
            urn_parsing_order: crd.urn_parsing_order.clone(),
            accessible_nodes,
            ..IndexedDataset::default()
        };

        Self {
            crd,
            visible,
            dataset,
        }
    }

    fn build(mut self) -> Result<IndexedDataset, Error> {
        self.process_requirements()?;
        self.process_svcs()?;
        self.process_mvrs()?;
        self.process_annotations();
        self.process_automated_test_results();
        Ok(self.dataset)
    }

    fn process_requirements(&mut self) -> Result<(), Error> {
        let crd = self.crd;
        for (urn, raw) in &crd.raw_datasets {
            if raw.variant().is_microservice() && *urn != crd.initial_urn {
                debug!("Skipping requirements of imported microservice {urn}");
                continue;
            }

            self.dataset.reqs_from_urn.entry(urn.clone()).or_default();
            for requirement in raw.requirements.requirements.values() {
                let id = &requirement.id;
                if self.dataset.requirements.contains_key(id) {
                    return Err(Error::DuplicateRequirement(id.clone()));
                }
                self.dataset
                    .reqs_from_urn
                    .entry(id.urn().to_string())
                    .or_default()
                    .insert(id.clone());
                self.dataset
                    .requirements
                    .insert(id.clone(), requirement.clone());
            }
        }
        Ok(())
    }

    fn process_svcs(&mut self) -> Result<(), Error> {
        let crd = self.crd;
        for raw in crd.raw_datasets.values() {
            let Some(document) = &raw.svcs else {
                continue;
            };
            for svc in document.cases.values() {
                if self.dataset.svcs.contains_key(&svc.id) {
                    return Err(Error::DuplicateSvc(svc.id.clone()));
                }

                let Some(requirement_ids) = retain_ids(&svc.requirement_ids, |requirement| {
                    self.visible.contains(requirement.urn())
                        && self.dataset.requirements.contains_key(requirement)
                }) else {
                    debug!("Dropping svc {}: no visible requirements", svc.id);
                    continue;
                };
                if requirement_ids.len() < svc.requirement_ids.len() {
                    debug!(
                        "Stripped {} requirement references from svc {}",
                        svc.requirement_ids.len() - requirement_ids.len(),
                        svc.id
                    );
                }

                self.insert_svc(SvcData {
                    requirement_ids,
                    ..svc.clone()
                });
            }
        }
        Ok(())
    }

    fn insert_svc(&mut self, svc: SvcData) {
        let id = svc.id.clone();
        for requirement in &svc.requirement_ids {
            self.dataset
                .svcs_from_req
                .entry(requirement.clone())
                .or_default()
                .insert(id.clone());
        }
        self.dataset
            .svcs_from_urn
            .entry(id.urn().to_string())
            .or_default()
            .insert(id.clone());
        self.dataset.svcs.insert(id, svc);
    }

    fn process_mvrs(&mut self) -> Result<(), Error> {
        let crd = self.crd;
        for (urn, raw) in &crd.raw_datasets {
            let Some(document) = &raw.mvrs else {
                continue;
            };
            for mvr in document.results.values() {
                if self.dataset.mvrs.contains_key(&mvr.id) {
                    return Err(Error::DuplicateMvr(mvr.id.clone()));
                }

                // a module may always report on its own cases
                let Some(svc_ids) = retain_ids(&mvr.svc_ids, |svc| {
                    (svc.urn() == urn.as_str() || self.visible.contains(svc.urn()))
                        && self.dataset.svcs.contains_key(svc)
                }) else {
                    debug!("Dropping mvr {}: no visible svcs", mvr.id);
                    continue;
                };
                if svc_ids.len() < mvr.svc_ids.len() {
                    debug!(
                        "Stripped {} svc references from mvr {}",
                        mvr.svc_ids.len() - svc_ids.len(),
                        mvr.id
                    );
                }

                self.insert_mvr(MvrData {
                    svc_ids,
                    ..mvr.clone()
                });
            }
        }
        Ok(())
    }

    fn insert_mvr(&mut self, mvr: MvrData) {
        let id = mvr.id.clone();
        for svc in &mvr.svc_ids {
            self.dataset
                .mvrs_from_svc
                .entry(svc.clone())
                .or_default()
                .insert(id.clone());
        }
        self.dataset
            .mvrs_from_urn
            .entry(id.urn().to_string())
            .or_default()
            .insert(id.clone());
        self.dataset.mvrs.insert(id, mvr);
    }

    fn process_annotations(&mut self) {
        let crd = self.crd;
        for raw in crd.raw_datasets.values() {
            let Some(annotations) = &raw.annotations else {
                continue;
            };
            for (requirement, implementations) in &annotations.implementations {
                self.dataset
                    .annotations_impls
                    .entry(requirement.clone())
                    .or_default()
                    .extend(implementations.iter().cloned());
            }
            for (svc, tests) in &annotations.tests {
                self.dataset
                    .annotations_tests
                    .entry(svc.clone())
                    .or_default()
                    .extend(tests.iter().cloned());
            }
        }
    }

    fn process_automated_test_results(&mut self) {
        let crd = self.crd;
        for (urn, raw) in &crd.raw_datasets {
            let Some(annotations) = &raw.annotations else {
                continue;
            };
            for (svc, tests) in &annotations.tests {
                for annotation in tests {
                    let key = UrnId::new(svc.urn(), annotation.fully_qualified_name.clone());
                    let result = resolve_test(urn, raw, annotation);
                    self.dataset
                        .automated_test_results
                        .entry(key)
                        .or_default()
                        .push(result);
                }
            }
        }
    }
}

/// Look up the recorded result for one test annotation of module `urn`.
fn resolve_test(urn: &str, raw: &RawDataset, annotation: &AnnotationData) -> TestData {
    let fqn = annotation.fully_qualified_name.as_str();
    let recorded = raw.automated_tests.as_ref().map(|run| &run.tests);

    match annotation.element_kind {
        ElementKind::Class => {
            let members = recorded
                .into_iter()
                .flatten()
                .filter(|(id, _)| id.id().contains(fqn))
                .map(|(_, test)| test.status);
            TestData::new(fqn, TestStatus::aggregate(members))
        }
        ElementKind::Interface
        | ElementKind::Enum
        | ElementKind::Record
        | ElementKind::Method
        | ElementKind::Field
        | ElementKind::Function => recorded
            .and_then(|tests| tests.get(&UrnId::new(urn, fqn)))
            .cloned()
            .unwrap_or_else(|| {
                debug!("No recorded result for {urn}:{fqn}, marking it missing");
                TestData::new(fqn, TestStatus::Missing)
            }),
    }
}
