use std::{
    borrow::Borrow,
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use tracing::debug;

use crate::domain::{
    AnnotationData, FilterAction, MvrData, RequirementData, SvcData, TestData, UrnId, retain_ids,
};

/// A filter rule named an id that is not among the candidates it applies to.
///
/// The name is inert: it neither keeps nor removes anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterWarning {
    /// The module declaring the filter.
    pub module: String,
    /// Whether the id was named for import or for exclusion.
    pub action: FilterAction,
    /// The unresolved id.
    pub id: UrnId,
}

impl fmt::Display for FilterWarning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Cannot {}: {} does not exist or is not accessible",
            self.action, self.id
        )
    }
}

/// A broken cross-reference found by [`IndexedDataset::inconsistencies`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inconsistency {
    /// An SVC references a requirement that is not in the model.
    DanglingRequirement {
        /// The referencing SVC.
        svc: UrnId,
        /// The missing requirement.
        requirement: UrnId,
    },
    /// An MVR references an SVC that is not in the model.
    DanglingSvc {
        /// The referencing MVR.
        mvr: UrnId,
        /// The missing SVC.
        svc: UrnId,
    },
    /// An index lacks an entry its entities imply.
    MissingIndexEntry {
        /// Name of the index.
        index: &'static str,
        /// The index key, rendered.
        key: String,
        /// The id that should be listed under `key`.
        id: UrnId,
    },
    /// An index lists an entry no entity implies.
    StaleIndexEntry {
        /// Name of the index.
        index: &'static str,
        /// The index key, rendered.
        key: String,
        /// The id listed under `key`.
        id: UrnId,
    },
}

impl fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::DanglingRequirement { svc, requirement } => {
                write!(f, "SVC {svc} references missing requirement {requirement}")
            }
            Self::DanglingSvc { mvr, svc } => {
                write!(f, "MVR {mvr} references missing SVC {svc}")
            }
            Self::MissingIndexEntry { index, key, id } => {
                write!(f, "index {index}[{key}] is missing {id}")
            }
            Self::StaleIndexEntry { index, key, id } => {
                write!(f, "index {index}[{key}] lists stale entry {id}")
            }
        }
    }
}

/// The merged model of every module visible from one root.
///
/// Entities are keyed by [`UrnId`]. Forward indices map a module urn to the
/// entities it defines; reverse indices map a requirement to the SVCs that
/// verify it and an SVC to the MVRs that report on it.
///
/// Built by [`generate`](super::generate) and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexedDataset {
    pub(crate) initial_urn: String,
    pub(crate) urn_parsing_order: Vec<String>,
    pub(crate) accessible_nodes: BTreeMap<String, BTreeSet<String>>,
    pub(crate) visited_urns: Vec<String>,
    pub(crate) filtered: bool,

    pub(crate) requirements: BTreeMap<UrnId, RequirementData>,
    pub(crate) svcs: BTreeMap<UrnId, SvcData>,
    pub(crate) mvrs: BTreeMap<UrnId, MvrData>,

    // annotations have no id of their own
    pub(crate) annotations_impls: BTreeMap<UrnId, Vec<AnnotationData>>,
    pub(crate) annotations_tests: BTreeMap<UrnId, Vec<AnnotationData>>,
    pub(crate) automated_test_results: BTreeMap<UrnId, Vec<TestData>>,

    pub(crate) reqs_from_urn: BTreeMap<String, BTreeSet<UrnId>>,
    pub(crate) svcs_from_urn: BTreeMap<String, BTreeSet<UrnId>>,
    pub(crate) svcs_from_req: BTreeMap<UrnId, BTreeSet<UrnId>>,
    pub(crate) mvrs_from_urn: BTreeMap<String, BTreeSet<UrnId>>,
    pub(crate) mvrs_from_svc: BTreeMap<UrnId, BTreeSet<UrnId>>,

    pub(crate) warnings: Vec<FilterWarning>,
}

impl IndexedDataset {
    /// The processing root.
    #[must_use]
    pub fn initial_urn(&self) -> &str {
        &self.initial_urn
    }

    /// Module urns in the order they were read.
    #[must_use]
    pub fn urn_parsing_order(&self) -> &[String] {
        &self.urn_parsing_order
    }

    /// The modules transitively imported by `urn`.
    #[must_use]
    pub fn accessible_urns(&self, urn: &str) -> Option<&BTreeSet<String>> {
        self.accessible_nodes.get(urn)
    }

    /// The modules transitively imported by the root.
    #[must_use]
    pub fn root_accessible_urns(&self) -> Option<&BTreeSet<String>> {
        self.accessible_urns(&self.initial_urn)
    }

    /// Modules visited while filtering, in post-order (imports before
    /// importers). Empty when the model is unfiltered.
    #[must_use]
    pub fn visited_urns(&self) -> &[String] {
        &self.visited_urns
    }

    /// Whether the model was filtered to the root's permitted scope.
    #[must_use]
    pub const fn is_filtered(&self) -> bool {
        self.filtered
    }

    /// Every requirement in the model.
    #[must_use]
    pub const fn requirements(&self) -> &BTreeMap<UrnId, RequirementData> {
        &self.requirements
    }

    /// Every verification case in the model.
    #[must_use]
    pub const fn svcs(&self) -> &BTreeMap<UrnId, SvcData> {
        &self.svcs
    }

    /// Every manual verification result in the model.
    #[must_use]
    pub const fn mvrs(&self) -> &BTreeMap<UrnId, MvrData> {
        &self.mvrs
    }

    /// Implementation annotations keyed by requirement.
    #[must_use]
    pub const fn annotations_impls(&self) -> &BTreeMap<UrnId, Vec<AnnotationData>> {
        &self.annotations_impls
    }

    /// Test annotations keyed by SVC.
    #[must_use]
    pub const fn annotations_tests(&self) -> &BTreeMap<UrnId, Vec<AnnotationData>> {
        &self.annotations_tests
    }

    /// Automated test results keyed by `(svc urn, fully-qualified name)`.
    #[must_use]
    pub const fn automated_test_results(&self) -> &BTreeMap<UrnId, Vec<TestData>> {
        &self.automated_test_results
    }

    /// Requirements defined by each module.
    #[must_use]
    pub const fn reqs_from_urn(&self) -> &BTreeMap<String, BTreeSet<UrnId>> {
        &self.reqs_from_urn
    }

    /// SVCs defined by each module.
    #[must_use]
    pub const fn svcs_from_urn(&self) -> &BTreeMap<String, BTreeSet<UrnId>> {
        &self.svcs_from_urn
    }

    /// SVCs verifying each requirement.
    #[must_use]
    pub const fn svcs_from_req(&self) -> &BTreeMap<UrnId, BTreeSet<UrnId>> {
        &self.svcs_from_req
    }

    /// MVRs recorded by each module.
    #[must_use]
    pub const fn mvrs_from_urn(&self) -> &BTreeMap<String, BTreeSet<UrnId>> {
        &self.mvrs_from_urn
    }

    /// MVRs reporting on each SVC.
    #[must_use]
    pub const fn mvrs_from_svc(&self) -> &BTreeMap<UrnId, BTreeSet<UrnId>> {
        &self.mvrs_from_svc
    }

    /// Filter names that did not resolve during the last filtering run.
    #[must_use]
    pub fn warnings(&self) -> &[FilterWarning] {
        &self.warnings
    }

    /// Remove a requirement, then every SVC left verifying nothing.
    ///
    /// Removing an absent requirement is a no-op.
    pub(crate) fn delete_requirement(&mut self, id: &UrnId) {
        if self.requirements.remove(id).is_none() {
            return;
        }
        debug!("Deleting requirement: {id}");

        unindex(&mut self.reqs_from_urn, id.urn(), id);

        for svc_id in self.svcs_from_req.remove(id).unwrap_or_default() {
            let Some(svc) = self.svcs.get(&svc_id) else {
                continue;
            };
            match retain_ids(&svc.requirement_ids, |requirement| requirement != id) {
                Some(remaining) => {
                    if let Some(svc) = self.svcs.get_mut(&svc_id) {
                        svc.requirement_ids = remaining;
                    }
                }
                None => self.delete_svc(&svc_id),
            }
        }
    }

    /// Remove an SVC, then every MVR left reporting on nothing.
    ///
    /// Removing an absent SVC is a no-op.
    pub(crate) fn delete_svc(&mut self, id: &UrnId) {
        let Some(svc) = self.svcs.remove(id) else {
            return;
        };
        debug!("Deleting svc: {id}");

        unindex(&mut self.svcs_from_urn, id.urn(), id);
        for requirement in &svc.requirement_ids {
            unindex_pruning(&mut self.svcs_from_req, requirement, id);
        }

        for mvr_id in self.mvrs_from_svc.remove(id).unwrap_or_default() {
            let Some(mvr) = self.mvrs.get(&mvr_id) else {
                continue;
            };
            match retain_ids(&mvr.svc_ids, |svc| svc != id) {
                Some(remaining) => {
                    if let Some(mvr) = self.mvrs.get_mut(&mvr_id) {
                        mvr.svc_ids = remaining;
                    }
                }
                None => self.delete_mvr(&mvr_id),
            }
        }
    }

    /// Remove an MVR. Never cascades.
    ///
    /// Removing an absent MVR is a no-op.
    pub(crate) fn delete_mvr(&mut self, id: &UrnId) {
        let Some(mvr) = self.mvrs.remove(id) else {
            return;
        };
        debug!("Deleting mvr: {id}");

        unindex(&mut self.mvrs_from_urn, id.urn(), id);
        for svc in &mvr.svc_ids {
            unindex_pruning(&mut self.mvrs_from_svc, svc, id);
        }
    }

    /// Check that every reference resolves and every index agrees with the
    /// entities it indexes.
    ///
    /// A model produced by [`generate`](super::generate) has none.
    #[must_use]
    pub fn inconsistencies(&self) -> Vec<Inconsistency> {
        let mut found = Vec::new();

        for svc in self.svcs.values() {
            for requirement in &svc.requirement_ids {
                if !self.requirements.contains_key(requirement) {
                    found.push(Inconsistency::DanglingRequirement {
                        svc: svc.id.clone(),
                        requirement: requirement.clone(),
                    });
                }
            }
        }

        for mvr in self.mvrs.values() {
            for svc in &mvr.svc_ids {
                if !self.svcs.contains_key(svc) {
                    found.push(Inconsistency::DanglingSvc {
                        mvr: mvr.id.clone(),
                        svc: svc.clone(),
                    });
                }
            }
        }

        compare_index(
            "reqs_from_urn",
            &self.reqs_from_urn,
            self.requirements.keys().map(|id| (id.urn(), id)),
            &mut found,
        );
        compare_index(
            "svcs_from_urn",
            &self.svcs_from_urn,
            self.svcs.keys().map(|id| (id.urn(), id)),
            &mut found,
        );
        compare_index(
            "mvrs_from_urn",
            &self.mvrs_from_urn,
            self.mvrs.keys().map(|id| (id.urn(), id)),
            &mut found,
        );
        compare_index(
            "svcs_from_req",
            &self.svcs_from_req,
            self.svcs.values().flat_map(|svc| {
                svc.requirement_ids
                    .iter()
                    .map(move |requirement| (requirement, &svc.id))
            }),
            &mut found,
        );
        compare_index(
            "mvrs_from_svc",
            &self.mvrs_from_svc,
            self.mvrs
                .values()
                .flat_map(|mvr| mvr.svc_ids.iter().map(move |svc| (svc, &mvr.id))),
            &mut found,
        );

        found
    }
}

/// Remove `id` from `index[key]`, keeping the key.
fn unindex<K, Q>(index: &mut BTreeMap<K, BTreeSet<UrnId>>, key: &Q, id: &UrnId)
where
    K: Ord + Borrow<Q>,
    Q: Ord + ?Sized,
{
    if let Some(ids) = index.get_mut(key) {
        ids.remove(id);
    }
}

/// Remove `id` from `index[key]`, dropping the key once nothing is left.
fn unindex_pruning<K, Q>(index: &mut BTreeMap<K, BTreeSet<UrnId>>, key: &Q, id: &UrnId)
where
    K: Ord + Borrow<Q>,
    Q: Ord + ?Sized,
{
    if let Some(ids) = index.get_mut(key) {
        ids.remove(id);
        if ids.is_empty() {
            index.remove(key);
        }
    }
}

/// Diff an index against the `(key, id)` pairs its entities imply.
fn compare_index<'a, K, Q>(
    name: &'static str,
    index: &BTreeMap<K, BTreeSet<UrnId>>,
    implied: impl IntoIterator<Item = (&'a Q, &'a UrnId)>,
    found: &mut Vec<Inconsistency>,
) where
    K: Ord + Borrow<Q> + fmt::Display,
    Q: Ord + fmt::Display + ?Sized + 'a,
{
    let mut expected: BTreeSet<(String, &UrnId)> = BTreeSet::new();
    for (key, id) in implied {
        let listed = index.get(key).is_some_and(|ids| ids.contains(id));
        if !listed {
            found.push(Inconsistency::MissingIndexEntry {
                index: name,
                key: key.to_string(),
                id: id.clone(),
            });
        }
        expected.insert((key.to_string(), id));
    }

    for (key, ids) in index {
        let key = key.to_string();
        for id in ids {
            if !expected.contains(&(key.clone(), id)) {
                found.push(Inconsistency::StaleIndexEntry {
                    index: name,
                    key: key.clone(),
                    id: id.clone(),
                });
            }
        }
    }
}
