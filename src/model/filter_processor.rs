use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, instrument, warn};

use super::{FilterWarning, IndexedDataset};
use crate::domain::{CombinedRawDataset, FilterRule, RawDataset, UrnId};

/// Which entity kind a filtering pass narrows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Requirements,
    Svcs,
}

impl Pass {
    const fn label(self) -> &'static str {
        match self {
            Self::Requirements => "requirements",
            Self::Svcs => "svcs",
        }
    }

    /// The module's filter rules for this pass, keyed by target urn.
    fn rules(self, raw: &RawDataset) -> Option<&BTreeMap<String, FilterRule>> {
        match self {
            Self::Requirements => Some(&raw.requirements.filters),
            Self::Svcs => raw.svcs.as_ref().map(|document| &document.filters),
        }
    }

    /// The entities module `urn` defines itself.
    fn own<'d>(self, dataset: &'d IndexedDataset, urn: &str) -> Option<&'d BTreeSet<UrnId>> {
        match self {
            Self::Requirements => dataset.reqs_from_urn.get(urn),
            Self::Svcs => dataset.svcs_from_urn.get(urn),
        }
    }

    /// Whether `rule` filters out the entity `id`. Entities no longer in the
    /// model are never filtered out.
    fn filters_out(
        self,
        dataset: &IndexedDataset,
        target: &str,
        rule: &FilterRule,
        id: &UrnId,
    ) -> bool {
        match self {
            Self::Requirements => dataset
                .requirements
                .get(id)
                .is_some_and(|requirement| rule.filters_out(target, requirement)),
            Self::Svcs => dataset
                .svcs
                .get(id)
                .is_some_and(|svc| rule.filters_out(target, svc)),
        }
    }
}

/// What one module keeps and what it, or anything it imports, filtered out.
#[derive(Debug, Default)]
struct Scope {
    kept: BTreeSet<UrnId>,
    filtered_out: BTreeSet<UrnId>,
}

/// Shrinks an indexed model to what its root module is permitted to see.
///
/// Holds the only mutable borrow of the model while filtering.
pub(super) struct FilterProcessor<'a> {
    crd: &'a CombinedRawDataset,
    dataset: &'a mut IndexedDataset,
}

impl<'a> FilterProcessor<'a> {
    pub(super) const fn new(crd: &'a CombinedRawDataset, dataset: &'a mut IndexedDataset) -> Self {
        Self { crd, dataset }
    }

    #[instrument(skip(self), fields(root = %self.crd.initial_urn))]
    pub(super) fn run(mut self) {
        let crd = self.crd;
        let root = crd.initial_urn.as_str();
        self.dataset.visited_urns.clear();
        self.dataset.warnings.clear();

        debug!("Starting filtering of requirements from {root}");
        let scope = self.scope(Pass::Requirements, root);
        let removed: Vec<UrnId> = self
            .dataset
            .requirements
            .keys()
            .filter(|id| !scope.kept.contains(*id))
            .cloned()
            .collect();
        debug!("Deleting {} requirements", removed.len());
        for id in &removed {
            self.dataset.delete_requirement(id);
        }
        debug!(
            "Requirements left after filtering: {}",
            self.dataset.requirements.len()
        );

        // microservice cases are never traversed, so only what was explicitly
        // filtered out is removed
        debug!("Starting filtering of svcs from {root}");
        let scope = self.scope(Pass::Svcs, root);
        debug!("Deleting {} svcs", scope.filtered_out.len());
        for id in &scope.filtered_out {
            self.dataset.delete_svc(id);
        }
        debug!("SVCs left after filtering: {}", self.dataset.svcs.len());

        self.dataset.filtered = true;
    }

    /// Post-order walk of the imports of `urn`, skipping microservices.
    fn scope(&mut self, pass: Pass, urn: &str) -> Scope {
        let crd = self.crd;

        let mut inherited = Scope::default();
        for import in crd.imports(urn) {
            if crd.is_microservice(import) {
                continue;
            }
            debug!("Applying {} filters for import urn {import}", pass.label());
            let scope = self.scope(pass, import);
            inherited.kept.extend(scope.kept);
            inherited.filtered_out.extend(scope.filtered_out);
        }

        let mut filtered_out = BTreeSet::new();
        for (target, rule) in crd.get(urn).and_then(|raw| pass.rules(raw)).into_iter().flatten() {
            let accessible: BTreeSet<UrnId> = inherited
                .kept
                .iter()
                .filter(|id| id.urn() == target.as_str())
                .cloned()
                .collect();
            debug!(
                "Applying filter for urn {target} on {} accessible {}: {rule}",
                accessible.len(),
                pass.label()
            );

            self.check_unresolved(urn, rule, &accessible);

            for id in accessible {
                if pass.filters_out(self.dataset, target, rule, &id) {
                    debug!("Filtering out {}: {id}", pass.label());
                    filtered_out.insert(id);
                }
            }
        }

        let mut kept: BTreeSet<UrnId> = inherited.kept.difference(&filtered_out).cloned().collect();
        if let Some(own) = pass.own(self.dataset, urn) {
            kept.extend(own.iter().cloned());
        }
        debug!(
            "URN {urn} kept {} {}, filtered out {}",
            kept.len(),
            pass.label(),
            filtered_out.len()
        );

        filtered_out.extend(inherited.filtered_out);

        if pass == Pass::Requirements {
            self.dataset.visited_urns.push(urn.to_string());
        }

        Scope { kept, filtered_out }
    }

    /// Warn about ids a rule names that are not among its candidates.
    fn check_unresolved(&mut self, module: &str, rule: &FilterRule, accessible: &BTreeSet<UrnId>) {
        for (action, id) in rule.unresolved(accessible) {
            let warning = FilterWarning {
                module: module.to_string(),
                action,
                id: id.clone(),
            };
            warn!("{warning}");
            self.dataset.warnings.push(warning);
        }
    }
}
