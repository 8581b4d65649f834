// Configuration Storage Service
// Handles config file read/write, validation and version backup

use crate::error::{Error, Result};
use crate::services::detection::aggregation::DEFAULT_HISTOGRAM_BUCKETS;
use crate::services::detection::detector::DEFAULT_SHORT_SAMPLE_WORDS;
use crate::services::detection::features::DEFAULT_MIN_WORD_COUNT;
use crate::services::detection::scoring::{DEFAULT_MATERIALITY_THRESHOLD, DEFAULT_UNCERTAIN_MARGIN};
use crate::services::detection::weights::WeightTable;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const CONFIG_VERSION: &str = "1";
const MAX_BACKUPS: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub weights: WeightTable,
    /// Replaces the built-in stop-word list when set.
    #[serde(default)]
    pub stopwords_path: Option<PathBuf>,
    #[serde(default)]
    pub cloud: CloudConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            detection: DetectionConfig::default(),
            weights: WeightTable::default(),
            stopwords_path: None,
            cloud: CloudConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;
        self.detection.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectionConfig {
    /// Half-width of the Uncertain band around 0.5.
    #[serde(default = "default_uncertain_margin")]
    pub uncertain_margin: f64,
    /// Minimum |contribution| for a feature to produce a note.
    #[serde(default = "default_materiality")]
    pub materiality_threshold: f64,
    #[serde(default = "default_min_word_count")]
    pub min_word_count: usize,
    /// Scored texts below this many words get a caution note; 0 disables it.
    #[serde(default = "default_short_sample_words")]
    pub short_sample_words: usize,
    #[serde(default = "default_histogram_buckets")]
    pub histogram_buckets: usize,
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            uncertain_margin: DEFAULT_UNCERTAIN_MARGIN,
            materiality_threshold: DEFAULT_MATERIALITY_THRESHOLD,
            min_word_count: DEFAULT_MIN_WORD_COUNT,
            short_sample_words: DEFAULT_SHORT_SAMPLE_WORDS,
            histogram_buckets: DEFAULT_HISTOGRAM_BUCKETS,
            batch_concurrency: default_batch_concurrency(),
        }
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..0.5).contains(&self.uncertain_margin) {
            return Err(Error::Config(format!(
                "uncertainMargin {} must be in [0, 0.5)",
                self.uncertain_margin
            )));
        }
        if !self.materiality_threshold.is_finite() || self.materiality_threshold < 0.0 {
            return Err(Error::Config("materialityThreshold must be >= 0".to_string()));
        }
        if self.min_word_count == 0 {
            return Err(Error::Config("minWordCount must be at least 1".to_string()));
        }
        if self.histogram_buckets == 0 {
            return Err(Error::Config("histogramBuckets must be at least 1".to_string()));
        }
        if self.batch_concurrency == 0 {
            return Err(Error::Config("batchConcurrency must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudConfig {
    #[serde(default)]
    pub enabled: bool,
    /// `name[:model]`, e.g. `openai:gpt-4o-mini`.
    #[serde(default = "default_cloud_provider")]
    pub provider: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_cloud_timeout")]
    pub timeout_secs: u64,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_cloud_provider(),
            base_url: None,
            api_key: None,
            timeout_secs: default_cloud_timeout(),
        }
    }
}

fn default_version() -> String { CONFIG_VERSION.to_string() }
fn default_uncertain_margin() -> f64 { DEFAULT_UNCERTAIN_MARGIN }
fn default_materiality() -> f64 { DEFAULT_MATERIALITY_THRESHOLD }
fn default_min_word_count() -> usize { DEFAULT_MIN_WORD_COUNT }
fn default_short_sample_words() -> usize { DEFAULT_SHORT_SAMPLE_WORDS }
fn default_histogram_buckets() -> usize { DEFAULT_HISTOGRAM_BUCKETS }
fn default_batch_concurrency() -> usize { 4 }
fn default_cloud_provider() -> String { "openai".to_string() }
fn default_cloud_timeout() -> u64 { 30 }

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_dir, config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("styloscope"))
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Ensure config directory exists
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.config_dir)?;
        Ok(())
    }

    /// Load and validate configuration. A missing file yields the defaults.
    pub fn load(&self) -> Result<AppConfig> {
        if !self.config_file.exists() {
            return Ok(AppConfig::default());
        }
        Self::load_file(&self.config_file)
    }

    /// Load and validate an explicit config file
    pub fn load_file(path: &Path) -> Result<AppConfig> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.validate()?;
        info!(path = %path.display(), weights = %config.weights.version, "config.loaded");
        Ok(config)
    }

    /// Save configuration, backing up the previous file first
    pub fn save(&self, config: &AppConfig) -> Result<()> {
        config.validate()?;
        self.ensure_dir()?;

        if self.config_file.exists() {
            self.create_backup()?;
        }

        let content = serde_json::to_string_pretty(config)?;
        fs::write(&self.config_file, content)?;
        Ok(())
    }

    fn backup_dir(&self) -> PathBuf {
        self.config_dir.join("backups")
    }

    /// Create a backup of current config
    fn create_backup(&self) -> Result<()> {
        let backup_dir = self.backup_dir();
        fs::create_dir_all(&backup_dir)?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S%.3f");
        let backup_file = backup_dir.join(format!("config_{}.json", timestamp));
        fs::copy(&self.config_file, &backup_file)?;

        self.cleanup_old_backups(&backup_dir, MAX_BACKUPS)
    }

    /// Remove old backups, keeping only the most recent N
    fn cleanup_old_backups(&self, backup_dir: &Path, keep: usize) -> Result<()> {
        let mut entries: Vec<_> = fs::read_dir(backup_dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
            .collect();

        if entries.len() <= keep {
            return Ok(());
        }

        // Timestamped names sort oldest first
        entries.sort_by_key(|e| e.file_name());

        for entry in entries.iter().take(entries.len() - keep) {
            if let Err(e) = fs::remove_file(entry.path()) {
                warn!(path = %entry.path().display(), error = %e, "config.backup_cleanup_failed");
            }
        }

        Ok(())
    }
}
