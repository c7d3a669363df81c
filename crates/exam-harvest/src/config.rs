//! Scraper configuration loading and resolution.
//!
//! Precedence, lowest to highest: built-in defaults, an optional JSON config
//! file, `HARVEST_*` environment variables, then whatever the caller sets
//! explicitly afterwards (CLI flags).

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::ExamCatalog;
use crate::extract::ExtractionProfile;
use crate::types::{HarvestError, HarvestResult};

pub const DEFAULT_DELAY_MS: u64 = 2000;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Runtime knobs for fetching, extraction, checkpointing, and admission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Base delay: applied after every successful fetch and scaled for backoff.
    pub delay_ms: u64,
    /// Total attempts per page, including the first.
    pub max_retries: u32,
    /// Per-attempt request timeout.
    pub timeout_secs: u64,
    /// Checkpoint cadence; `None` uses the profile's default.
    pub checkpoint_every: Option<usize>,
    /// Where checkpoint snapshots go; `None` uses `~/.exam-harvest/checkpoints`.
    pub checkpoint_dir: Option<PathBuf>,
    pub profile: ExtractionProfile,
    /// Cap on concurrently running jobs; `None` means unlimited.
    pub max_concurrent_jobs: Option<usize>,
    /// Categories and exams offered to clients.
    pub catalog: ExamCatalog,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            delay_ms: DEFAULT_DELAY_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            checkpoint_every: None,
            checkpoint_dir: None,
            profile: ExtractionProfile::default(),
            max_concurrent_jobs: None,
            catalog: ExamCatalog::default(),
        }
    }
}

impl ScraperConfig {
    /// Load from an optional JSON file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> HarvestResult<Self> {
        let base = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p).map_err(|e| {
                    HarvestError::Config(format!("failed to read {}: {e}", p.display()))
                })?;
                serde_json::from_str(&raw).map_err(|e| {
                    HarvestError::Config(format!("invalid config {}: {e}", p.display()))
                })?
            }
            None => Self::default(),
        };
        base.apply_env()
    }

    /// Apply `HARVEST_*` environment variables.
    pub fn apply_env(self) -> HarvestResult<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> HarvestResult<Self> {
        if let Some(v) = parse_var(&lookup, "HARVEST_DELAY_MS")? {
            self.delay_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "HARVEST_MAX_RETRIES")? {
            self.max_retries = v;
        }
        if let Some(v) = parse_var(&lookup, "HARVEST_TIMEOUT_SECS")? {
            self.timeout_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "HARVEST_CHECKPOINT_EVERY")? {
            self.checkpoint_every = Some(v);
        }
        if let Some(v) = lookup("HARVEST_CHECKPOINT_DIR") {
            self.checkpoint_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = parse_var(&lookup, "HARVEST_PROFILE")? {
            self.profile = v;
        }
        if let Some(v) = parse_var(&lookup, "HARVEST_MAX_JOBS")? {
            self.max_concurrent_jobs = Some(v);
        }
        Ok(self)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Effective checkpoint cadence, never zero.
    pub fn checkpoint_interval(&self) -> usize {
        self.checkpoint_every
            .unwrap_or_else(|| self.profile.default_checkpoint_every())
            .max(1)
    }

    pub fn resolved_checkpoint_dir(&self) -> PathBuf {
        self.checkpoint_dir
            .clone()
            .unwrap_or_else(default_checkpoint_dir)
    }
}

/// `~/.exam-harvest/checkpoints`, or under `/tmp` when there is no home.
pub fn default_checkpoint_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".exam-harvest")
        .join("checkpoints")
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> HarvestResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| HarvestError::Config(format!("{key}={raw:?}: {e}"))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = ScraperConfig::default();
        assert_eq!(cfg.delay(), Duration::from_secs(2));
        assert_eq!(cfg.max_retries, 3);
        assert_eq!(cfg.timeout(), Duration::from_secs(30));
        assert_eq!(cfg.checkpoint_interval(), 5);
    }

    #[test]
    fn test_basic_profile_checkpoints_every_ten() {
        let cfg = ScraperConfig {
            profile: ExtractionProfile::Basic,
            ..Default::default()
        };
        assert_eq!(cfg.checkpoint_interval(), 10);
    }

    #[test]
    fn test_zero_checkpoint_interval_is_clamped() {
        let cfg = ScraperConfig {
            checkpoint_every: Some(0),
            ..Default::default()
        };
        assert_eq!(cfg.checkpoint_interval(), 1);
    }

    #[test]
    fn test_overrides_applied() {
        let cfg = ScraperConfig::default()
            .apply_overrides(lookup(&[
                ("HARVEST_DELAY_MS", "250"),
                ("HARVEST_MAX_RETRIES", "2"),
                ("HARVEST_PROFILE", "basic"),
                ("HARVEST_CHECKPOINT_DIR", "/var/tmp/ckpt"),
                ("HARVEST_MAX_JOBS", "4"),
            ]))
            .unwrap();
        assert_eq!(cfg.delay_ms, 250);
        assert_eq!(cfg.max_retries, 2);
        assert_eq!(cfg.profile, ExtractionProfile::Basic);
        assert_eq!(cfg.resolved_checkpoint_dir(), PathBuf::from("/var/tmp/ckpt"));
        assert_eq!(cfg.max_concurrent_jobs, Some(4));
    }

    #[test]
    fn test_bad_override_is_config_error() {
        let err = ScraperConfig::default()
            .apply_overrides(lookup(&[("HARVEST_MAX_RETRIES", "lots")]))
            .unwrap_err();
        assert!(matches!(err, HarvestError::Config(_)));
        assert!(err.to_string().contains("HARVEST_MAX_RETRIES"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harvest.json");
        std::fs::write(&path, r#"{ "delay_ms": 10, "profile": "basic" }"#).unwrap();

        let cfg = ScraperConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.delay_ms, 10);
        assert_eq!(cfg.profile, ExtractionProfile::Basic);
        assert_eq!(cfg.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(cfg.catalog, ExamCatalog::default());
    }

    #[test]
    fn test_catalog_replaced_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harvest.json");
        std::fs::write(
            &path,
            r#"{ "catalog": { "k8s": { "name": "Kubernetes", "exams": ["CKA"] } } }"#,
        )
        .unwrap();

        let cfg = ScraperConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.catalog.exams("k8s"), ["CKA"]);
        assert!(cfg.catalog.exams("aws").is_empty());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = ScraperConfig::load(Some(&dir.path().join("nope.json"))).unwrap_err();
        assert!(matches!(err, HarvestError::Config(_)));
    }
}
