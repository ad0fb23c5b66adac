use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tally_sync::FailurePolicy;

use crate::state::ensure_tally_home;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub fetch: FetchSection,
    pub sync: SyncSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchSection {
    /// Per-download timeout; arbitrary URLs must not hang a batch.
    pub timeout_secs: u64,
    pub max_concurrency: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSection {
    pub interval_secs: u64,
    /// "placeholder" | "skip" | "flag-for-review"
    pub on_extraction_failure: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch: FetchSection {
                timeout_secs: 30,
                max_concurrency: 8,
            },
            sync: SyncSection {
                interval_secs: 15,
                on_extraction_failure: "placeholder".to_string(),
            },
        }
    }
}

impl Config {
    pub fn failure_policy(&self) -> Result<FailurePolicy> {
        match self.sync.on_extraction_failure.as_str() {
            "placeholder" => Ok(FailurePolicy::Placeholder),
            "skip" => Ok(FailurePolicy::Skip),
            "flag-for-review" => Ok(FailurePolicy::FlagForReview),
            other => bail!(
                "unknown on_extraction_failure \"{other}\" (expected placeholder, skip, or flag-for-review)"
            ),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_tally_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    Ok(toml::from_str(&s).context("parse config.toml")?)
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_policy_parsing() {
        let mut cfg = Config::default();
        assert_eq!(cfg.failure_policy().unwrap(), FailurePolicy::Placeholder);
        cfg.sync.on_extraction_failure = "skip".to_string();
        assert_eq!(cfg.failure_policy().unwrap(), FailurePolicy::Skip);
        cfg.sync.on_extraction_failure = "flag-for-review".to_string();
        assert_eq!(cfg.failure_policy().unwrap(), FailurePolicy::FlagForReview);
        cfg.sync.on_extraction_failure = "yolo".to_string();
        assert!(cfg.failure_policy().is_err());
    }

    #[test]
    fn test_default_round_trips_through_toml() {
        let cfg = Config::default();
        let s = toml::to_string_pretty(&cfg).unwrap();
        let back: Config = toml::from_str(&s).unwrap();
        assert_eq!(back.fetch.timeout_secs, 30);
        assert_eq!(back.sync.on_extraction_failure, "placeholder");
    }
}
