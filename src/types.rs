/// One API resource type as reported by `kubectl api-resources`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub name: String,
    pub short_names: Option<String>,
    pub api_version: String,
    pub namespaced: bool,
    pub kind: String,
}

/// Outcome of fetching one resource type into its log file.
#[derive(Debug, Clone)]
pub struct FetchOutput {
    pub resource_name: String,
    pub command_log: String,
    /// Human readable failure, `None` when the fetch succeeded.
    pub error: Option<String>,
}

impl FetchOutput {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct DumpReport {
    pub outputs: Vec<FetchOutput>,
    pub combined_log: std::path::PathBuf,
}

impl DumpReport {
    pub fn failed(&self) -> usize {
        self.outputs.iter().filter(|o| !o.is_success()).count()
    }
}
