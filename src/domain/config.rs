use std::path::Path;

use serde::{Deserialize, Serialize};

/// File name of the configuration, looked up in the root module's directory.
pub const FILE_NAME: &str = "reqtrace.toml";

/// Configuration for building the traceability model.
///
/// Controls whether the merged model is filtered down to the root module's
/// permitted scope, and which file names hold each module's documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Whether filtering runs after the merged model is generated.
    pub filter: bool,

    requirements_file: String,
    svcs_file: String,
    mvrs_file: String,
    annotations_file: String,
    test_results_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            filter: true,
            requirements_file: default_requirements_file(),
            svcs_file: default_svcs_file(),
            mvrs_file: default_mvrs_file(),
            annotations_file: default_annotations_file(),
            test_results_file: default_test_results_file(),
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Loads `reqtrace.toml` from `dir`, falling back to defaults when it is
    /// absent or unreadable.
    #[must_use]
    pub fn load_or_default(dir: &Path) -> Self {
        let path = dir.join(FILE_NAME);
        Self::load(&path).unwrap_or_else(|e| {
            tracing::debug!("Using default configuration ({}): {e}", path.display());
            Self::default()
        })
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// File name of each module's requirements document.
    #[must_use]
    pub fn requirements_file(&self) -> &str {
        &self.requirements_file
    }

    /// File name of each module's verification cases document.
    #[must_use]
    pub fn svcs_file(&self) -> &str {
        &self.svcs_file
    }

    /// File name of each module's manual verification results document.
    #[must_use]
    pub fn mvrs_file(&self) -> &str {
        &self.mvrs_file
    }

    /// File name of each module's code annotations document.
    #[must_use]
    pub fn annotations_file(&self) -> &str {
        &self.annotations_file
    }

    /// File name of each module's automated test results document.
    #[must_use]
    pub fn test_results_file(&self) -> &str {
        &self.test_results_file
    }
}

fn default_requirements_file() -> String {
    "requirements.yml".to_string()
}

fn default_svcs_file() -> String {
    "software_verification_cases.yml".to_string()
}

fn default_mvrs_file() -> String {
    "manual_verification_results.yml".to_string()
}

fn default_annotations_file() -> String {
    "annotations.yml".to_string()
}

fn default_test_results_file() -> String {
    "test_results.yml".to_string()
}

const fn default_filter() -> bool {
    true
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_filter")]
        filter: bool,

        #[serde(default = "default_requirements_file")]
        requirements_file: String,

        #[serde(default = "default_svcs_file")]
        svcs_file: String,

        #[serde(default = "default_mvrs_file")]
        mvrs_file: String,

        #[serde(default = "default_annotations_file")]
        annotations_file: String,

        #[serde(default = "default_test_results_file")]
        test_results_file: String,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                filter,
                requirements_file,
                svcs_file,
                mvrs_file,
                annotations_file,
                test_results_file,
            } => Self {
                filter,
                requirements_file,
                svcs_file,
                mvrs_file,
                annotations_file,
                test_results_file,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            filter: config.filter,
            requirements_file: config.requirements_file,
            svcs_file: config.svcs_file,
            mvrs_file: config.mvrs_file,
            annotations_file: config.annotations_file,
            test_results_file: config.test_results_file,
        }
    }
}
