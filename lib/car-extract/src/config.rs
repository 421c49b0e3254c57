use serde::{Deserialize, Serialize};

/// Default number of sibling blocks fetched concurrently while exporting.
pub const DEFAULT_FETCH_CONCURRENCY: usize = 8;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ExtractConfig {
    /// Upper bound on in-flight fetches for the children of a single node. Values below one are
    /// treated as one.
    pub fetch_concurrency: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
        }
    }
}
