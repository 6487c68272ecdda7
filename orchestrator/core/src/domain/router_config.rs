// Copyright (c) 2026 Switchyard Contributors
// SPDX-License-Identifier: AGPL-3.0

// Router Configuration Types
//
// Kubernetes-style manifest (apiVersion/kind/metadata/spec) for a router
// instance:
// - Cognitive memory windows and thresholds
// - Decision engine tunables
// - Agent behaviour (attempt timeout, prefetch, prediction TTL)
// - Learning loop and health monitor schedules
// - Self-healing wrapper settings
// - Static source descriptors (used by the simulator)
// - Logging settings

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use switchyard_cortex::MemoryConfig;

use super::source::SourceDescriptor;

pub const API_VERSION: &str = "switchyard.dev/v1";
pub const KIND: &str = "RouterConfig";
pub const CONFIG_PATH_ENV: &str = "SWITCHYARD_CONFIG_PATH";

/// Top-level router configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfigManifest {
    /// API version (must be "switchyard.dev/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "RouterConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: RouterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

/// Router configuration (content under spec:)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub decision: DecisionConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub learning: LearningConfig,

    #[serde(default)]
    pub health_monitor: HealthMonitorConfig,

    #[serde(default)]
    pub self_healing: SelfHealingConfig,

    #[serde(default)]
    pub sources: Vec<StaticSourceConfig>,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionConfig {
    /// Latency (ms) that scores zero on performance when no candidate is slower
    #[serde(default = "default_latency_ceiling")]
    pub latency_ceiling_ms: f64,

    /// High-priority queries halve the performance of sources slower than this
    #[serde(default = "default_slow_latency")]
    pub slow_latency_ms: f64,

    /// Cost per query that scores zero on cost
    #[serde(default = "default_max_cost")]
    pub max_cost_per_query: f64,

    /// Reliability lost per recent failure
    #[serde(default = "default_failure_penalty")]
    pub recent_failure_penalty: f64,

    #[serde(default = "default_max_failure_penalty")]
    pub max_recent_failure_penalty: f64,

    /// Fraction of the score removed while a failure is recurring
    #[serde(default = "default_recurring_penalty")]
    pub recurring_penalty: f64,

    /// Success rate assumed for a source with no history
    #[serde(default = "default_neutral_prior")]
    pub neutral_prior: f64,

    /// Score gap between first and second that maps to full confidence
    #[serde(default = "default_confidence_margin")]
    pub confidence_margin: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Per-attempt executor timeout; unset means wait indefinitely
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub attempt_timeout: Option<Duration>,

    /// Minimum hourly frequency before a widget's source is prefetched
    #[serde(default = "default_prefetch_threshold")]
    pub prefetch_confidence_threshold: u64,

    #[serde(default = "default_prediction_ttl", with = "humantime_serde")]
    pub prediction_ttl: Duration,

    /// Sources below this recent success rate are reported as degraded
    #[serde(default = "default_degraded_success_rate")]
    pub degraded_success_rate: f64,

    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_learning_interval", with = "humantime_serde")]
    pub interval: Duration,

    #[serde(default = "default_warmup_delay", with = "humantime_serde")]
    pub warmup_delay: Duration,

    /// Memory older than this is purged after each cycle; unset keeps everything
    #[serde(default = "default_retention_days", skip_serializing_if = "Option::is_none")]
    pub retention_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthMonitorConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_health_interval", with = "humantime_serde")]
    pub interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfHealingConfig {
    /// Wrap every registered source in a circuit breaker with retries
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    #[serde(default = "default_reset_timeout", with = "humantime_serde")]
    pub reset_timeout: Duration,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_base_backoff", with = "humantime_serde")]
    pub base_backoff: Duration,

    #[serde(default = "default_max_backoff", with = "humantime_serde")]
    pub max_backoff: Duration,
}

/// A source declared in the manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticSourceConfig {
    #[serde(flatten)]
    pub descriptor: SourceDescriptor,

    /// Probability that a simulated query fails
    #[serde(default)]
    pub failure_rate: f64,

    #[serde(default = "default_true")]
    pub healthy: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Output format ("compact" or "json")
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

/// Errors loading or validating a manifest
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_latency_ceiling() -> f64 {
    500.0
}

fn default_slow_latency() -> f64 {
    200.0
}

fn default_max_cost() -> f64 {
    0.10
}

fn default_failure_penalty() -> f64 {
    0.05
}

fn default_max_failure_penalty() -> f64 {
    0.3
}

fn default_recurring_penalty() -> f64 {
    0.5
}

fn default_neutral_prior() -> f64 {
    0.5
}

fn default_confidence_margin() -> f64 {
    0.3
}

fn default_prefetch_threshold() -> u64 {
    5
}

fn default_prediction_ttl() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_degraded_success_rate() -> f64 {
    0.5
}

fn default_event_bus_capacity() -> usize {
    1000
}

fn default_learning_interval() -> Duration {
    Duration::from_secs(300)
}

fn default_warmup_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_retention_days() -> Option<u32> {
    Some(30)
}

fn default_health_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_reset_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_backoff() -> Duration {
    Duration::from_secs(1)
}

fn default_max_backoff() -> Duration {
    Duration::from_secs(10)
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            latency_ceiling_ms: default_latency_ceiling(),
            slow_latency_ms: default_slow_latency(),
            max_cost_per_query: default_max_cost(),
            recent_failure_penalty: default_failure_penalty(),
            max_recent_failure_penalty: default_max_failure_penalty(),
            recurring_penalty: default_recurring_penalty(),
            neutral_prior: default_neutral_prior(),
            confidence_margin: default_confidence_margin(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            attempt_timeout: None,
            prefetch_confidence_threshold: default_prefetch_threshold(),
            prediction_ttl: default_prediction_ttl(),
            degraded_success_rate: default_degraded_success_rate(),
            event_bus_capacity: default_event_bus_capacity(),
        }
    }
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: default_learning_interval(),
            warmup_delay: default_warmup_delay(),
            retention_days: default_retention_days(),
        }
    }
}

impl Default for HealthMonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: default_health_interval(),
        }
    }
}

impl Default for SelfHealingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            failure_threshold: default_failure_threshold(),
            reset_timeout: default_reset_timeout(),
            max_retries: default_max_retries(),
            base_backoff: default_base_backoff(),
            max_backoff: default_max_backoff(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl Default for RouterConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "switchyard".to_string(),
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: RouterConfig::default(),
        }
    }
}

impl RouterConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_yaml_string()?).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Discover configuration file using precedence order
    /// 1. SWITCHYARD_CONFIG_PATH environment variable
    /// 2. ./switchyard.yaml (working directory)
    /// 3. ~/.switchyard/config.yaml (user home)
    /// 4. /etc/switchyard/config.yaml (system, Unix)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./switchyard.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".switchyard").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        {
            let system_config = PathBuf::from("/etc/switchyard/config.yaml");
            if system_config.exists() {
                return Some(system_config);
            }
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // An explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        let mut config = match Self::discover_config() {
            Some(config_path) => {
                tracing::info!("Loading configuration from discovered path: {:?}", config_path);
                Self::from_yaml_file(config_path)?
            }
            None => {
                tracing::warn!("No configuration file found in standard locations. Using defaults.");
                Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("SWITCHYARD_LOG_LEVEL") {
            if !level.trim().is_empty() {
                tracing::info!("Environment override: SWITCHYARD_LOG_LEVEL={}", level);
                self.spec.observability.log_level = level.trim().to_string();
            }
        }

        if let Some(enabled) = env_flag("SWITCHYARD_LEARNING_ENABLED") {
            self.spec.learning.enabled = enabled;
        }

        if let Some(enabled) = env_flag("SWITCHYARD_HEALTH_MONITOR_ENABLED") {
            self.spec.health_monitor.enabled = enabled;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.api_version != API_VERSION {
            return invalid(format!(
                "apiVersion '{}' must be '{}'",
                self.api_version, API_VERSION
            ));
        }
        if self.kind != KIND {
            return invalid(format!("kind '{}' must be '{}'", self.kind, KIND));
        }
        if self.metadata.name.is_empty() {
            return invalid("metadata.name cannot be empty".to_string());
        }

        self.spec
            .memory
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let decision = &self.spec.decision;
        if decision.latency_ceiling_ms <= 0.0 {
            return invalid("decision.latency_ceiling_ms must be positive".to_string());
        }
        if decision.max_cost_per_query <= 0.0 {
            return invalid("decision.max_cost_per_query must be positive".to_string());
        }
        if decision.confidence_margin <= 0.0 {
            return invalid("decision.confidence_margin must be positive".to_string());
        }
        for (field, value) in [
            ("decision.recurring_penalty", decision.recurring_penalty),
            ("decision.neutral_prior", decision.neutral_prior),
            ("decision.recent_failure_penalty", decision.recent_failure_penalty),
            ("decision.max_recent_failure_penalty", decision.max_recent_failure_penalty),
            ("agent.degraded_success_rate", self.spec.agent.degraded_success_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return invalid(format!("{field} must be within [0, 1]"));
            }
        }

        if self.spec.agent.event_bus_capacity == 0 {
            return invalid("agent.event_bus_capacity must be at least 1".to_string());
        }
        if self.spec.agent.attempt_timeout == Some(Duration::ZERO) {
            return invalid("agent.attempt_timeout cannot be zero".to_string());
        }
        if self.spec.learning.interval.is_zero() {
            return invalid("learning.interval cannot be zero".to_string());
        }
        if self.spec.health_monitor.interval.is_zero() {
            return invalid("health_monitor.interval cannot be zero".to_string());
        }
        if self.spec.self_healing.failure_threshold == 0 {
            return invalid("self_healing.failure_threshold must be at least 1".to_string());
        }

        let mut seen = std::collections::HashSet::new();
        for source in &self.spec.sources {
            let name = &source.descriptor.name;
            if name.is_empty() {
                return invalid("source name cannot be empty".to_string());
            }
            if !seen.insert(name.as_str()) {
                return invalid(format!("duplicate source name: {name}"));
            }
            if source.descriptor.capabilities.is_empty() {
                return invalid(format!("source '{name}' must declare at least one capability"));
            }
            if !(0.0..=1.0).contains(&source.failure_rate) {
                return invalid(format!("source '{name}' failure_rate must be within [0, 1]"));
            }
        }

        match self.spec.observability.log_format.as_str() {
            "compact" | "json" => Ok(()),
            other => invalid(format!("observability.log_format '{other}' must be 'compact' or 'json'")),
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let val = std::env::var(name).ok()?;
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => {
            tracing::info!("Environment override: {}=true", name);
            Some(true)
        }
        "false" | "0" | "no" | "off" => {
            tracing::info!("Environment override: {}=false", name);
            Some(false)
        }
        _ => {
            tracing::warn!(
                "Invalid value for {}: '{}'. Expected true/false. Ignoring.",
                name,
                val
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::source::{Capability, SourceType};

    fn source(name: &str) -> StaticSourceConfig {
        StaticSourceConfig {
            descriptor: SourceDescriptor {
                name: name.to_string(),
                source_type: SourceType::Database,
                capabilities: vec![Capability::parse("agents.*")],
                estimated_latency_ms: 20,
                cost_per_query: 0.0,
            },
            failure_rate: 0.1,
            healthy: true,
        }
    }

    #[test]
    fn test_default_manifest_is_valid() {
        let manifest = RouterConfigManifest::default();
        assert_eq!(manifest.api_version, API_VERSION);
        assert_eq!(manifest.kind, KIND);
        assert!(manifest.validate().is_ok());
        assert_eq!(manifest.spec.learning.interval, Duration::from_secs(300));
        assert_eq!(manifest.spec.health_monitor.interval, Duration::from_secs(30));
    }

    #[test]
    fn test_yaml_roundtrip_through_file() {
        let mut manifest = RouterConfigManifest::default();
        manifest.spec.agent.attempt_timeout = Some(Duration::from_millis(750));
        manifest.spec.sources.push(source("postgres"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("switchyard.yaml");
        manifest.to_yaml_file(&path).unwrap();
        let parsed = RouterConfigManifest::from_yaml_file(&path).unwrap();

        assert_eq!(parsed.spec.agent, manifest.spec.agent);
        assert_eq!(parsed.spec.sources, manifest.spec.sources);
        assert_eq!(parsed.spec.memory, manifest.spec.memory);
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_sparse_manifest_uses_defaults() {
        let yaml = r#"
apiVersion: switchyard.dev/v1
kind: RouterConfig
metadata:
  name: edge
spec:
  memory:
    recurring_window: 30m
  learning:
    interval: 2m
  sources:
    - name: metrics-api
      type: api
      capabilities: ["system.*", "*"]
      estimated_latency_ms: 80
      cost_per_query: 0.01
"#;
        let manifest = RouterConfigManifest::from_yaml_str(yaml).unwrap();
        assert_eq!(manifest.spec.memory.recurring_window, Duration::from_secs(30 * 60));
        assert_eq!(manifest.spec.memory.recurring_threshold, 3);
        assert_eq!(manifest.spec.learning.interval, Duration::from_secs(120));
        assert_eq!(manifest.spec.learning.warmup_delay, Duration::from_secs(10));
        assert_eq!(manifest.spec.sources[0].descriptor.capabilities[1], Capability::Any);
        assert!(manifest.spec.sources[0].healthy);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let mut manifest = RouterConfigManifest::default();

        manifest.api_version = "wrong/v1".to_string();
        assert!(manifest.validate().is_err());
        manifest.api_version = API_VERSION.to_string();

        manifest.kind = "NodeConfig".to_string();
        assert!(manifest.validate().is_err());
        manifest.kind = KIND.to_string();

        manifest.spec.decision.recurring_penalty = 1.5;
        assert!(manifest.validate().is_err());
        manifest.spec.decision.recurring_penalty = 0.5;

        manifest.spec.sources = vec![source("db"), source("db")];
        assert!(matches!(manifest.validate(), Err(ConfigError::Invalid(msg)) if msg.contains("duplicate")));
        manifest.spec.sources.pop();

        manifest.spec.memory.recurring_threshold = 0;
        assert!(manifest.validate().is_err());
        manifest.spec.memory.recurring_threshold = 3;

        manifest.spec.observability.log_format = "xml".to_string();
        assert!(manifest.validate().is_err());
        manifest.spec.observability.log_format = "json".to_string();

        assert!(manifest.validate().is_ok());
    }
}
