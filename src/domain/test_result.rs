use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of an automated test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    /// The test ran and passed.
    Passed,
    /// The test ran and failed.
    Failed,
    /// The test was skipped.
    Skipped,
    /// The test is annotated but no result was recorded.
    Missing,
}

impl TestStatus {
    /// Aggregate the results of every test in an annotated class.
    ///
    /// No results at all is [`TestStatus::Missing`]; all passed is
    /// [`TestStatus::Passed`]; anything else (including skipped tests) is
    /// [`TestStatus::Failed`].
    pub fn aggregate(statuses: impl IntoIterator<Item = Self>) -> Self {
        let mut statuses = statuses.into_iter().peekable();
        if statuses.peek().is_none() {
            Self::Missing
        } else if statuses.all(|status| status == Self::Passed) {
            Self::Passed
        } else {
            Self::Failed
        }
    }

    /// Returns the lowercase name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Missing => "missing",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The recorded result of one automated test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestData {
    /// Fully-qualified name of the test (or annotated class).
    pub fully_qualified_name: String,
    /// Outcome of the test.
    pub status: TestStatus,
}

impl TestData {
    /// Create a test result.
    #[must_use]
    pub fn new(fully_qualified_name: impl Into<String>, status: TestStatus) -> Self {
        Self {
            fully_qualified_name: fully_qualified_name.into(),
            status,
        }
    }
}
