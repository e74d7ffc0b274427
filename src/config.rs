//! Run configuration.
//!
//! The compiled-in defaults mirror the standing production code lists; a
//! YAML file can override any field. Absent datasets (empty code lists) are
//! skipped by the orchestrator.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// SQLite file all datasets are written into.
    pub db_path: PathBuf,
    /// Directory the listings crawler archives page fragments under.
    pub archive_dir: PathBuf,
    pub exchange_rate_codes: Vec<String>,
    pub oil_price_codes: Vec<String>,
    pub stock_price_codes: Vec<String>,
    pub listing_codes: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("external_data.db"),
            archive_dir: PathBuf::from("temp"),
            exchange_rate_codes: to_strings(&["FX_USDKRW", "FX_JPYKRW", "FX_CNYKRW"]),
            oil_price_codes: to_strings(&["OIL_CL", "OIL_DU", "OIL_BRT"]),
            stock_price_codes: to_strings(&["005830", "005930", "105560"]),
            listing_codes: to_strings(&["benz", "ev", "bmw"]),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config `{}`", path.display()))?;
        serde_yaml::from_str(&raw).with_context(|| format!("parsing config `{}`", path.display()))
    }
}

fn to_strings(codes: &[&str]) -> Vec<String> {
    codes.iter().map(|c| c.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_cover_every_dataset() {
        let config = Config::default();
        assert!(!config.exchange_rate_codes.is_empty());
        assert!(!config.oil_price_codes.is_empty());
        assert!(!config.stock_price_codes.is_empty());
        assert!(!config.listing_codes.is_empty());
    }

    #[test]
    fn partial_yaml_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "db_path: /tmp/other.db\nexchange_rate_codes: [FX_USDKRW]").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/other.db"));
        assert_eq!(config.exchange_rate_codes, vec!["FX_USDKRW".to_string()]);
        // Untouched fields fall back to the defaults.
        assert_eq!(config.oil_price_codes.len(), 3);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "db_pathh: typo.db").unwrap();
        assert!(Config::load(file.path()).is_err());
    }
}
