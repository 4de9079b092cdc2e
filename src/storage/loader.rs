use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::documents::{
    AnnotationsFile, DocumentError, MvrsFile, RequirementsFile, SvcsFile, TestResultsFile,
};
use crate::domain::{CombinedRawDataset, Config, RawDataset};

/// A module graph could not be read from disk.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// A file or directory could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// The path that failed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// A document is not valid YAML for its kind.
    #[error("failed to parse {}: {source}", path.display())]
    Yaml {
        /// The document that failed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: serde_yaml::Error,
    },

    /// A document parsed but its content is invalid.
    #[error("invalid document {}: {source}", path.display())]
    Document {
        /// The document that failed.
        path: PathBuf,
        /// What is wrong with it.
        #[source]
        source: DocumentError,
    },

    /// Two different directories declare the same module urn.
    #[error("module '{urn}' is declared in both {} and {}", first.display(), second.display())]
    DuplicateUrn {
        /// The urn declared twice.
        urn: String,
        /// The directory read first.
        first: PathBuf,
        /// The directory read second.
        second: PathBuf,
    },
}

/// Reads the module in `root` and every module it imports, transitively.
///
/// Modules are read depth-first in declaration order, so the parsing order
/// starts with the root. A directory reached twice is read once. Import
/// cycles are recorded as edges and left for the generator to reject.
///
/// Only the requirements document is mandatory; the other documents are
/// read when present, under the file names given by `config`.
///
/// # Errors
///
/// Returns an error if a mandatory file cannot be read, a document is
/// malformed, or two directories declare the same urn.
#[instrument(skip(config))]
pub fn load(root: &Path, config: &Config) -> Result<CombinedRawDataset, LoadError> {
    let mut loader = Loader {
        config,
        urns: BTreeMap::new(),
        modules: Vec::new(),
    };
    let initial_urn = loader.load_module(root)?;

    let mut crd = CombinedRawDataset::new(initial_urn);
    for (dataset, imports) in loader.modules {
        crd.insert(dataset, imports);
    }
    debug!("Loaded {} modules", crd.urn_parsing_order.len());
    Ok(crd)
}

struct Loader<'a> {
    config: &'a Config,
    /// Canonical module directory to urn.
    urns: BTreeMap<PathBuf, String>,
    /// Modules with their import urns, in parsing order.
    modules: Vec<(RawDataset, Vec<String>)>,
}

impl Loader<'_> {
    fn load_module(&mut self, dir: &Path) -> Result<String, LoadError> {
        let dir = fs::canonicalize(dir).map_err(|source| LoadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        if let Some(urn) = self.urns.get(&dir) {
            return Ok(urn.clone());
        }

        let path = dir.join(self.config.requirements_file());
        let file: RequirementsFile = read_yaml(&path)?;
        let urn = file.urn().to_string();
        if let Some((first, _)) = self.urns.iter().find(|(_, known)| **known == urn) {
            return Err(LoadError::DuplicateUrn {
                urn,
                first: first.clone(),
                second: dir,
            });
        }
        self.urns.insert(dir.clone(), urn.clone());

        let (requirements, import_paths) = file
            .into_document()
            .map_err(|source| LoadError::Document { path, source })?;
        let mut dataset = RawDataset::new(requirements);
        dataset.svcs = read_optional(&dir.join(self.config.svcs_file()), |file: SvcsFile| {
            file.into_document(&urn)
        })?;
        dataset.mvrs = read_optional(&dir.join(self.config.mvrs_file()), |file: MvrsFile| {
            file.into_document(&urn)
        })?;
        dataset.annotations = read_optional(
            &dir.join(self.config.annotations_file()),
            |file: AnnotationsFile| file.into_document(&urn),
        )?;
        dataset.automated_tests = read_optional(
            &dir.join(self.config.test_results_file()),
            |file: TestResultsFile| Ok(file.into_tests(&urn)),
        )?;
        debug!("Read module {urn} from {}", dir.display());

        let index = self.modules.len();
        self.modules.push((dataset, Vec::new()));
        let mut imports = Vec::with_capacity(import_paths.len());
        for import in import_paths {
            imports.push(self.load_module(&dir.join(import))?);
        }
        self.modules[index].1 = imports;

        Ok(urn)
    }
}

fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| LoadError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

fn read_optional<F, T>(
    path: &Path,
    convert: impl FnOnce(F) -> Result<T, DocumentError>,
) -> Result<Option<T>, LoadError>
where
    F: DeserializeOwned,
{
    if !path.is_file() {
        return Ok(None);
    }
    let file = read_yaml(path)?;
    convert(file).map(Some).map_err(|source| LoadError::Document {
        path: path.to_path_buf(),
        source,
    })
}
