use crate::provenance::ProvenanceMode;

/// Environment variable selecting the provenance strategy
/// (`ddmin` or `explain`).
pub const PROVENANCE_ENV: &str = "SYMLOG_PROVENANCE";
/// Environment variable setting the number of executor worker threads.
pub const JOBS_ENV: &str = "SYMLOG_JOBS";

/// Configuration for the symbolic executor.
#[derive(Debug, Clone)]
pub struct SymexConfig {
    /// How dependent-fact sets are computed.
    pub provenance: ProvenanceMode,
    /// Worker threads for independent assignment groups. 1 runs inline.
    pub jobs: usize,
}

impl Default for SymexConfig {
    fn default() -> Self {
        Self {
            provenance: ProvenanceMode::DeltaDebugging,
            jobs: 1,
        }
    }
}

impl SymexConfig {
    /// Defaults overridden by `SYMLOG_PROVENANCE` and `SYMLOG_JOBS`.
    /// Unrecognised values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(mode) = std::env::var(PROVENANCE_ENV) {
            match mode.trim().to_ascii_lowercase().as_str() {
                "explain" => config.provenance = ProvenanceMode::Explain,
                "ddmin" | "delta" => config.provenance = ProvenanceMode::DeltaDebugging,
                _ => {}
            }
        }
        if let Some(jobs) = std::env::var(JOBS_ENV)
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
        {
            config.jobs = jobs.max(1);
        }
        config
    }

    pub fn with_provenance(mut self, provenance: ProvenanceMode) -> Self {
        self.provenance = provenance;
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }
}
