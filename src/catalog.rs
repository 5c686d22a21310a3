// Expert catalog - immutable snapshots loaded from TOML configuration

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Availability of an expert in the catalog
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExpertStatus {
    Active,
    Inactive,
    Degraded,
}

/// Rule-based routing configuration for one expert
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RoutingRules {
    /// Keywords matched case-insensitively as substrings of the query
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Regex patterns matched case-insensitively against the query
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Higher priority experts are considered first and score higher on ties
    #[serde(default)]
    pub priority: i32,
}

/// A registered expert service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpertRecord {
    pub name: String,
    pub url: String,
    pub description: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub routing: RoutingRules,

    #[serde(default = "default_owner")]
    pub owner: String,

    #[serde(default = "default_status")]
    pub status: ExpertStatus,
}

fn default_owner() -> String {
    "platform".to_string()
}

fn default_status() -> ExpertStatus {
    ExpertStatus::Active
}

fn default_fallback() -> String {
    "general-assistant".to_string()
}

/// On-disk catalog file shape
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default = "default_fallback")]
    fallback: String,

    #[serde(default)]
    experts: Vec<ExpertRecord>,
}

/// How validation failures during a load are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Reject the whole load on the first invalid entry
    Strict,
    /// Skip invalid entries with a warning and keep the rest
    Lenient,
}

/// One immutable view of the catalog. Readers hold an `Arc` to it; a reload
/// never mutates an existing snapshot.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    experts: Vec<ExpertRecord>,
    fallback: String,
}

impl CatalogSnapshot {
    pub fn new(experts: Vec<ExpertRecord>, fallback: impl Into<String>) -> Self {
        Self {
            experts,
            fallback: fallback.into(),
        }
    }

    pub fn empty(fallback: impl Into<String>) -> Self {
        Self::new(Vec::new(), fallback)
    }

    /// Name of the expert used when no rule matches
    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn get(&self, name: &str) -> Option<&ExpertRecord> {
        self.experts.iter().find(|e| e.name == name)
    }

    /// Experts in catalog order
    pub fn experts(&self) -> &[ExpertRecord] {
        &self.experts
    }

    /// Active experts in catalog order
    pub fn active(&self) -> impl Iterator<Item = &ExpertRecord> {
        self.experts
            .iter()
            .filter(|e| e.status == ExpertStatus::Active)
    }

    pub fn len(&self) -> usize {
        self.experts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.experts.is_empty()
    }
}

/// Shared catalog handle. Reload builds a fresh snapshot and swaps the
/// pointer, so concurrent readers see either the old catalog in full or the
/// new one in full.
pub struct Catalog {
    inner: RwLock<Arc<CatalogSnapshot>>,
}

impl Catalog {
    pub fn new(snapshot: CatalogSnapshot) -> Self {
        Self {
            inner: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn empty(fallback: impl Into<String>) -> Self {
        Self::new(CatalogSnapshot::empty(fallback))
    }

    /// Load a catalog from a TOML file. A missing file yields an empty
    /// catalog (always-fallback behavior), not an error.
    pub fn load<P: AsRef<Path>>(path: P, mode: ValidationMode) -> Result<Self, CatalogError> {
        Ok(Self::new(load_snapshot(path, mode)?))
    }

    /// Current snapshot. Cheap to call; the returned `Arc` stays valid
    /// across reloads.
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Swap in a snapshot identical to the current one except for the
    /// fallback expert name. Used for the command-line override.
    pub fn override_fallback(&self, fallback: impl Into<String>) {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(CatalogSnapshot::new(guard.experts.clone(), fallback));
    }

    /// Replace the current snapshot with one freshly loaded from `path`.
    /// Returns the number of experts in the new snapshot.
    pub fn reload<P: AsRef<Path>>(
        &self,
        path: P,
        mode: ValidationMode,
    ) -> Result<usize, CatalogError> {
        let snapshot = Arc::new(load_snapshot(path, mode)?);
        let count = snapshot.len();
        *self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = snapshot;
        tracing::info!(experts = count, "catalog reloaded");
        Ok(count)
    }
}

/// Load and validate a snapshot from a TOML file
pub fn load_snapshot<P: AsRef<Path>>(
    path: P,
    mode: ValidationMode,
) -> Result<CatalogSnapshot, CatalogError> {
    let path = path.as_ref();

    if !path.exists() {
        tracing::warn!(path = %path.display(), "catalog file not found, starting empty");
        return Ok(CatalogSnapshot::empty(default_fallback()));
    }

    let contents = std::fs::read_to_string(path)?;
    let snapshot = parse_catalog(&contents, mode)?;
    tracing::info!(
        path = %path.display(),
        experts = snapshot.len(),
        fallback = snapshot.fallback(),
        "catalog loaded"
    );
    Ok(snapshot)
}

/// Parse and validate catalog TOML
pub fn parse_catalog(contents: &str, mode: ValidationMode) -> Result<CatalogSnapshot, CatalogError> {
    let file: CatalogFile = toml::from_str(contents)?;
    let name_re = Regex::new(r"^[a-z][a-z0-9-]*$").expect("valid name pattern");

    let mut experts: Vec<ExpertRecord> = Vec::with_capacity(file.experts.len());
    for record in file.experts {
        if let Err(reason) = validate_record(&record, &name_re) {
            match mode {
                ValidationMode::Strict => {
                    return Err(CatalogError::InvalidExpert {
                        name: record.name,
                        reason,
                    });
                }
                ValidationMode::Lenient => {
                    tracing::warn!(name = %record.name, %reason, "skipping invalid expert entry");
                    continue;
                }
            }
        }

        if experts.iter().any(|e| e.name == record.name) {
            match mode {
                ValidationMode::Strict => {
                    return Err(CatalogError::InvalidExpert {
                        name: record.name,
                        reason: "duplicate expert name".to_string(),
                    });
                }
                ValidationMode::Lenient => {
                    tracing::warn!(name = %record.name, "skipping duplicate expert entry");
                    continue;
                }
            }
        }

        experts.push(record);
    }

    Ok(CatalogSnapshot::new(experts, file.fallback))
}

fn validate_record(record: &ExpertRecord, name_re: &Regex) -> Result<(), String> {
    if !name_re.is_match(&record.name) {
        return Err(format!(
            "name '{}' must match ^[a-z][a-z0-9-]*$",
            record.name
        ));
    }
    if record.url.is_empty() {
        return Err("url must not be empty".to_string());
    }
    if record.description.is_empty() {
        return Err("description must not be empty".to_string());
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalog parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid expert '{name}': {reason}")]
    InvalidExpert { name: String, reason: String },
}
