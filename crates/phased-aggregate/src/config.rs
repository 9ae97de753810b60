//! Aggregation settings, loaded from YAML or JSON.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::phenotype::{PhenotypeEncoder, ReferenceProfiles, CANONICAL_TASKS};

pub const DEFAULT_RUN_IDENTIFIER: &str = "RUN_";
/// Known-bad runs left out of every aggregate.
pub const DEFAULT_SKIP_RUNS: [&str; 1] = ["RUN_2596"];
pub const DEFAULT_PHASE_BOUNDARY_UPDATE: &str = "200000";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strictness {
    /// Any failing run aborts the whole aggregate.
    #[default]
    Strict,
    /// A failing run is logged and left out. Header mismatches still abort.
    Lenient,
}

impl Strictness {
    pub fn as_str(self) -> &'static str {
        match self {
            Strictness::Strict => "strict",
            Strictness::Lenient => "lenient",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AggregateConfig {
    pub run_identifier: String,
    pub skip_runs: Vec<String>,
    pub phase_boundary_update: String,
    pub tasks: Vec<String>,
    pub profiles: ReferenceProfiles,
    pub strictness: Strictness,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            run_identifier: DEFAULT_RUN_IDENTIFIER.to_string(),
            skip_runs: DEFAULT_SKIP_RUNS.iter().map(|s| s.to_string()).collect(),
            phase_boundary_update: DEFAULT_PHASE_BOUNDARY_UPDATE.to_string(),
            tasks: CANONICAL_TASKS.iter().map(|t| t.to_string()).collect(),
            profiles: ReferenceProfiles::default(),
            strictness: Strictness::default(),
        }
    }
}

impl AggregateConfig {
    /// Load from YAML (`.yaml`/`.yml`) or JSON, filling unset keys with
    /// defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let config: AggregateConfig = if is_yaml {
            serde_yaml::from_str(&raw)
                .with_context(|| format!("invalid YAML config {}", path.display()))?
        } else {
            serde_json::from_str(&raw)
                .with_context(|| format!("invalid JSON config {}", path.display()))?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.run_identifier.is_empty() {
            return Err(anyhow!("run_identifier cannot be empty"));
        }
        if self.tasks.is_empty() {
            return Err(anyhow!("tasks cannot be empty"));
        }
        let width = self.tasks.len();
        for (name, profile) in [
            ("even", &self.profiles.even),
            ("odd", &self.profiles.odd),
            ("all", &self.profiles.all),
        ] {
            if profile.chars().count() != width {
                return Err(anyhow!(
                    "{} profile '{}' has {} positions but {} tasks are configured",
                    name,
                    profile,
                    profile.chars().count(),
                    width
                ));
            }
        }
        Ok(())
    }

    pub fn encoder(&self) -> PhenotypeEncoder {
        PhenotypeEncoder::new(self.tasks.clone(), self.profiles.clone())
    }

    pub fn is_skipped(&self, run_name: &str) -> bool {
        self.skip_runs.iter().any(|s| run_name.contains(s.as_str()))
    }
}
