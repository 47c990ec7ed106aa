//! Engine configuration
//!
//! Config is loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/tally/config/engine.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Missing keys in an override file keep their default values.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../config/engine.toml");

/// Threshold alert settings
#[derive(Debug, Clone, PartialEq)]
pub struct AlertConfig {
    /// Fraction of the budget amount at or below which the low-balance alert fires
    pub ten_percent_ratio: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            ten_percent_ratio: 0.10,
        }
    }
}

/// OCR statement import settings
#[derive(Debug, Clone, PartialEq)]
pub struct OcrConfig {
    pub default_category: String,
    pub currency_symbols: Vec<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            default_category: "Uncategorized".to_string(),
            currency_symbols: ["₹", "Rs.", "Rs", "INR", "$", "USD", "€", "£"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Full engine configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineConfig {
    pub alerts: AlertConfig,
    pub ocr: OcrConfig,
}

impl EngineConfig {
    /// Load from the default override location, else the embedded defaults
    pub fn load() -> Result<Self> {
        load_config(default_config_path().as_deref())
    }

    /// Load from an explicit override file (embedded defaults if it doesn't exist)
    pub fn from_path(path: &Path) -> Result<Self> {
        load_config(Some(path))
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("tally").join("config").join("engine.toml"))
}

fn load_config(override_path: Option<&Path>) -> Result<EngineConfig> {
    let content = match override_path {
        Some(path) if path.exists() => fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?,
        _ => DEFAULT_CONFIG.to_string(),
    };

    parse_config(&content)
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    alerts: Option<RawAlerts>,
    ocr: Option<RawOcr>,
}

#[derive(Debug, Deserialize)]
struct RawAlerts {
    ten_percent_ratio: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawOcr {
    default_category: Option<String>,
    currency_symbols: Option<Vec<String>>,
}

/// Parse config from TOML content
fn parse_config(content: &str) -> Result<EngineConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let mut config = EngineConfig::default();

    if let Some(alerts) = raw.alerts {
        if let Some(ratio) = alerts.ten_percent_ratio {
            if !(ratio > 0.0 && ratio < 1.0) {
                return Err(Error::Config(format!(
                    "alerts.ten_percent_ratio must be between 0 and 1, got {}",
                    ratio
                )));
            }
            config.alerts.ten_percent_ratio = ratio;
        }
    }

    if let Some(ocr) = raw.ocr {
        if let Some(category) = ocr.default_category.filter(|c| !c.trim().is_empty()) {
            config.ocr.default_category = category;
        }
        if let Some(symbols) = ocr.currency_symbols {
            config.ocr.currency_symbols = symbols;
        }
    }

    Ok(config)
}
