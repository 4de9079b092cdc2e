//! Serialized YAML forms of the per-module documents.
//!
//! Ids in documents may be bare (`REQ_001`) or qualified (`sys-001:REQ_001`).
//! Bare ids resolve against the owning module, except in filters, where they
//! resolve against the module the filter narrows.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::PathBuf,
};

use nonempty::NonEmpty;
use serde::Deserialize;

use crate::{
    domain::{
        AnnotationData, ElementKind, FilterRule, Implementation, MvrData, RequirementData,
        Significance, SvcData, TestData, TestStatus, UrnId, UrnIdError, Variant, VerificationKind,
        raw::{
            AnnotationsDocument, AutomatedTests, Metadata, MvrsDocument, RequirementsDocument,
            SvcsDocument,
        },
    },
    el::ParseError,
};

/// A document whose content is well-formed YAML but not a valid model.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// An id is malformed.
    #[error(transparent)]
    Id(#[from] UrnIdError),

    /// A case or result references nothing.
    #[error("{0} has an empty reference list")]
    EmptyReferences(UrnId),

    /// The same id is defined twice in one document.
    #[error("{0} is defined more than once")]
    DuplicateId(UrnId),

    /// A custom filter expression does not parse.
    #[error(transparent)]
    Expression(#[from] ParseError),
}

#[derive(Debug, Deserialize)]
pub(super) struct RequirementsFile {
    metadata: MetadataEntry,
    #[serde(default)]
    imports: Vec<PathBuf>,
    #[serde(default)]
    implementations: Vec<PathBuf>,
    #[serde(default)]
    filters: BTreeMap<String, FilterEntry>,
    #[serde(default)]
    requirements: Vec<RequirementEntry>,
}

#[derive(Debug, Deserialize)]
struct MetadataEntry {
    urn: String,
    #[serde(default)]
    variant: Variant,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct RequirementEntry {
    id: String,
    title: String,
    #[serde(default)]
    significance: Significance,
    #[serde(default)]
    description: String,
    rationale: Option<String>,
    #[serde(default)]
    categories: BTreeSet<String>,
    #[serde(default)]
    revision: String,
    #[serde(default)]
    implementation: Implementation,
}

#[derive(Debug, Default, Deserialize)]
struct FilterEntry {
    #[serde(default, alias = "requirement_ids", alias = "svc_ids")]
    ids: IdSets,
    #[serde(default)]
    custom: CustomSets,
}

#[derive(Debug, Default, Deserialize)]
struct IdSets {
    #[serde(default)]
    includes: Vec<String>,
    #[serde(default)]
    excludes: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CustomSets {
    includes: Option<String>,
    excludes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SvcsFile {
    #[serde(default)]
    filters: BTreeMap<String, FilterEntry>,
    #[serde(default)]
    cases: Vec<SvcEntry>,
}

#[derive(Debug, Deserialize)]
struct SvcEntry {
    id: String,
    title: String,
    description: Option<String>,
    #[serde(default)]
    verification: VerificationKind,
    instructions: Option<String>,
    #[serde(default)]
    revision: String,
    requirement_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct MvrsFile {
    #[serde(default)]
    results: Vec<MvrEntry>,
}

#[derive(Debug, Deserialize)]
struct MvrEntry {
    id: String,
    svc_ids: Vec<String>,
    #[serde(default = "default_pass")]
    pass: bool,
    comment: Option<String>,
}

const fn default_pass() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub(super) struct AnnotationsFile {
    #[serde(default)]
    requirement_annotations: AnnotationGroups,
}

#[derive(Debug, Default, Deserialize)]
struct AnnotationGroups {
    #[serde(default)]
    implementations: BTreeMap<String, Vec<AnnotationEntry>>,
    #[serde(default)]
    tests: BTreeMap<String, Vec<AnnotationEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotationEntry {
    element_kind: ElementKind,
    fully_qualified_name: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct TestResultsFile {
    #[serde(default)]
    tests: Vec<TestEntry>,
}

#[derive(Debug, Deserialize)]
struct TestEntry {
    fully_qualified_name: String,
    status: TestStatus,
}

impl RequirementsFile {
    pub(super) fn urn(&self) -> &str {
        &self.metadata.urn
    }

    /// Converts into the domain document, plus the paths of every imported
    /// module (systems first, then implementations).
    pub(super) fn into_document(self) -> Result<(RequirementsDocument, Vec<PathBuf>), DocumentError> {
        let urn = self.metadata.urn;
        let mut document = RequirementsDocument::new(Metadata::new(
            urn.as_str(),
            self.metadata.variant,
            self.metadata.title,
        ));

        for entry in self.requirements {
            let id = UrnId::assure(&urn, &entry.id)?;
            let requirement = RequirementData {
                id: id.clone(),
                title: entry.title,
                significance: entry.significance,
                description: entry.description,
                rationale: entry.rationale,
                categories: entry.categories,
                revision: entry.revision,
                implementation: entry.implementation,
            };
            if document.requirements.insert(id.clone(), requirement).is_some() {
                return Err(DocumentError::DuplicateId(id));
            }
        }
        document.filters = filter_rules(self.filters)?;

        let mut paths = self.imports;
        paths.extend(self.implementations);
        Ok((document, paths))
    }
}

impl SvcsFile {
    pub(super) fn into_document(self, urn: &str) -> Result<SvcsDocument, DocumentError> {
        let mut document = SvcsDocument {
            filters: filter_rules(self.filters)?,
            ..SvcsDocument::default()
        };
        for entry in self.cases {
            let id = UrnId::assure(urn, &entry.id)?;
            let svc = SvcData {
                id: id.clone(),
                title: entry.title,
                description: entry.description,
                verification: entry.verification,
                instructions: entry.instructions,
                revision: entry.revision,
                requirement_ids: references(urn, &id, &entry.requirement_ids)?,
            };
            if document.cases.insert(id.clone(), svc).is_some() {
                return Err(DocumentError::DuplicateId(id));
            }
        }
        Ok(document)
    }
}

impl MvrsFile {
    pub(super) fn into_document(self, urn: &str) -> Result<MvrsDocument, DocumentError> {
        let mut document = MvrsDocument::default();
        for entry in self.results {
            let id = UrnId::assure(urn, &entry.id)?;
            let mvr = MvrData {
                id: id.clone(),
                svc_ids: references(urn, &id, &entry.svc_ids)?,
                passed: entry.pass,
                comment: entry.comment,
            };
            if document.results.insert(id.clone(), mvr).is_some() {
                return Err(DocumentError::DuplicateId(id));
            }
        }
        Ok(document)
    }
}

impl AnnotationsFile {
    pub(super) fn into_document(self, urn: &str) -> Result<AnnotationsDocument, DocumentError> {
        let AnnotationGroups {
            implementations,
            tests,
        } = self.requirement_annotations;
        Ok(AnnotationsDocument {
            implementations: annotations(urn, implementations)?,
            tests: annotations(urn, tests)?,
        })
    }
}

impl TestResultsFile {
    pub(super) fn into_tests(self, urn: &str) -> AutomatedTests {
        let mut tests = AutomatedTests::default();
        for entry in self.tests {
            tests.record(urn, TestData::new(entry.fully_qualified_name, entry.status));
        }
        tests
    }
}

fn filter_rules(
    filters: BTreeMap<String, FilterEntry>,
) -> Result<BTreeMap<String, FilterRule>, DocumentError> {
    filters
        .into_iter()
        .map(|(target, entry)| -> Result<_, DocumentError> {
            let qualify = |ids: &[String]| {
                ids.iter()
                    .map(|id| UrnId::assure(&target, id))
                    .collect::<Result<Vec<_>, _>>()
            };
            let rule = FilterRule::compile(
                qualify(&entry.ids.includes)?,
                qualify(&entry.ids.excludes)?,
                entry.custom.includes.as_deref(),
                entry.custom.excludes.as_deref(),
            )?;
            Ok((target, rule))
        })
        .collect()
}

fn references(urn: &str, owner: &UrnId, ids: &[String]) -> Result<NonEmpty<UrnId>, DocumentError> {
    let ids = ids
        .iter()
        .map(|id| UrnId::assure(urn, id))
        .collect::<Result<Vec<_>, _>>()?;
    NonEmpty::from_vec(ids).ok_or_else(|| DocumentError::EmptyReferences(owner.clone()))
}

fn annotations(
    urn: &str,
    groups: BTreeMap<String, Vec<AnnotationEntry>>,
) -> Result<BTreeMap<UrnId, Vec<AnnotationData>>, DocumentError> {
    let mut annotations: BTreeMap<UrnId, Vec<AnnotationData>> = BTreeMap::new();
    for (id, entries) in groups {
        annotations
            .entry(UrnId::assure(urn, &id)?)
            .or_default()
            .extend(entries.into_iter().map(|entry| {
                AnnotationData::new(entry.element_kind, entry.fully_qualified_name)
            }));
    }
    Ok(annotations)
}
