use crate::aggregate::AggregateOptions;
use crate::errors::ConfigError;
use crate::normalize::NormalizeDefaults;
use crate::storage::{IdStrategy, StoreBackend};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;
pub const DEFAULT_CONFIG_FILE: &str = "evalboard.yaml";

const DEFAULT_SQLITE_PATH: &str = ".evalboard/evalboard.db";
const DEFAULT_JSON_DIR: &str = ".evalboard/runs";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalboardConfig {
    pub version: u32,
    pub store: StoreSettings,
    pub aggregate: AggregateOptions,
    pub defaults: NormalizeDefaults,
    pub io_timeout_ms: u64,
    pub log_level: String,
    /// Keys present in the file that no field consumed. Empty unless loaded leniently.
    #[serde(skip)]
    pub unknown_keys: Vec<String>,
}

impl Default for EvalboardConfig {
    fn default() -> Self {
        Self {
            version: SUPPORTED_CONFIG_VERSION,
            store: StoreSettings::default(),
            aggregate: AggregateOptions::default(),
            defaults: NormalizeDefaults::default(),
            io_timeout_ms: 10_000,
            log_level: "info".to_string(),
            unknown_keys: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    /// Database file (sqlite) or directory (json_dir). Defaults per backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub id_strategy: IdStrategy,
}

impl StoreSettings {
    pub fn path(&self) -> PathBuf {
        match (&self.path, self.backend) {
            (Some(p), _) => p.clone(),
            (None, StoreBackend::Sqlite) => PathBuf::from(DEFAULT_SQLITE_PATH),
            (None, StoreBackend::JsonDir) => PathBuf::from(DEFAULT_JSON_DIR),
        }
    }
}

pub fn load_config(path: &Path, strict: bool) -> Result<EvalboardConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;

    let mut ignored_keys = std::collections::BTreeSet::new();
    let deserializer = serde_yaml::Deserializer::from_str(&raw);
    let mut cfg: EvalboardConfig = serde_ignored::deserialize(deserializer, |path| {
        ignored_keys.insert(path.to_string());
    })
    .map_err(|e| ConfigError(format!("failed to parse YAML {}: {}", path.display(), e)))?;

    // `x-` and `_` prefixed keys are reserved for YAML anchors.
    let unknown: Vec<String> = ignored_keys
        .into_iter()
        .filter(|k| !k.starts_with('_') && !k.starts_with("x-"))
        .collect();
    if strict && !unknown.is_empty() {
        return Err(ConfigError(format!(
            "Unknown fields detected in strict mode: {:?} (file: {})",
            unknown,
            path.display()
        )));
    }
    cfg.unknown_keys = unknown;

    resolve_store_path(&mut cfg, path);
    cfg.validate()?;
    Ok(cfg)
}

/// `explicit` must exist. Without it, `evalboard.yaml` in the working
/// directory is used when present, else built-in defaults.
pub fn discover(explicit: Option<&Path>, strict: bool) -> Result<EvalboardConfig, ConfigError> {
    match explicit {
        Some(p) => load_config(p, strict),
        None => {
            let p = Path::new(DEFAULT_CONFIG_FILE);
            if p.is_file() {
                load_config(p, strict)
            } else {
                Ok(EvalboardConfig::default())
            }
        }
    }
}

/// Relative store paths in a config file are relative to that file.
fn resolve_store_path(cfg: &mut EvalboardConfig, config_path: &Path) {
    let Some(p) = cfg.store.path.as_ref().filter(|p| p.is_relative()) else {
        return;
    };
    if let Some(dir) = config_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        cfg.store.path = Some(dir.join(p));
    }
}

impl EvalboardConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != SUPPORTED_CONFIG_VERSION {
            return Err(ConfigError(format!(
                "unsupported config version {} (supported: {})",
                self.version, SUPPORTED_CONFIG_VERSION
            )));
        }
        let t = self.aggregate.pass_threshold;
        if !(t > 0.0 && t <= 1.0) {
            return Err(ConfigError(format!(
                "aggregate.pass_threshold must be within (0, 1], got {}",
                t
            )));
        }
        if self.aggregate.default_total_ram_gb <= 0.0 {
            return Err(ConfigError(
                "aggregate.default_total_ram_gb must be positive".into(),
            ));
        }
        Ok(())
    }

    /// `EVALBOARD_DB`, `EVALBOARD_BACKEND`, `EVALBOARD_PASS_THRESHOLD`, `EVALBOARD_LOG`.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    pub fn apply_env_from<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = var("EVALBOARD_BACKEND") {
            self.store.backend = v
                .parse()
                .map_err(|e: String| ConfigError(format!("EVALBOARD_BACKEND: {}", e)))?;
        }
        if let Some(v) = var("EVALBOARD_DB") {
            self.store.path = Some(PathBuf::from(v));
        }
        if let Some(v) = var("EVALBOARD_PASS_THRESHOLD") {
            self.aggregate.pass_threshold = v.trim().parse().map_err(|_| {
                ConfigError(format!("EVALBOARD_PASS_THRESHOLD is not a number: {}", v))
            })?;
        }
        if let Some(v) = var("EVALBOARD_LOG") {
            self.log_level = v;
        }
        self.validate()
    }

    pub fn warn_unknown_keys(&self) {
        if !self.unknown_keys.is_empty() {
            tracing::warn!(
                event = "evalboard.config.unknown_keys",
                keys = ?self.unknown_keys,
                "ignored unknown config fields"
            );
        }
    }
}

pub fn write_sample_config(path: &Path) -> Result<(), ConfigError> {
    std::fs::write(
        path,
        r#"version: 1
store:
  backend: sqlite          # sqlite | json_dir
  path: .evalboard/evalboard.db
  id_strategy: monotonic   # monotonic | wall_clock
aggregate:
  pass_threshold: 0.6
  default_total_ram_gb: 16.0
defaults:
  nested_agent: "llama3.2:1b"
  nested_judge: gemini
  flat_agent: "llama3.2:1b"
  flat_judge: gemini
  batch_agent: "qwen3:4b (Thinking)"
  batch_judge: "Gemini 2.5 Flash"
io_timeout_ms: 10000
log_level: info
"#,
    )
    .map_err(|e| ConfigError(format!("failed to write sample config: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn write(dir: &Path, body: &str) -> PathBuf {
        let p = dir.join("evalboard.yaml");
        std::fs::write(&p, body).unwrap();
        p
    }

    #[test]
    fn sample_config_loads_strictly() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("evalboard.yaml");
        write_sample_config(&p).unwrap();
        let cfg = load_config(&p, true).unwrap();
        assert_eq!(cfg.store.backend, StoreBackend::Sqlite);
        assert_eq!(cfg.store.path(), tmp.path().join(".evalboard/evalboard.db"));
        assert_eq!(cfg.defaults, NormalizeDefaults::default());
        assert_eq!(cfg.aggregate, AggregateOptions::default());
    }

    #[test]
    fn strict_rejects_unknown_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let p = write(tmp.path(), "version: 1\nstore:\n  backend: sqlite\n  engine: x\n");
        let err = load_config(&p, true).unwrap_err();
        assert!(err.0.contains("store.engine"), "{}", err);

        let cfg = load_config(&p, false).unwrap();
        assert_eq!(cfg.unknown_keys, vec!["store.engine".to_string()]);
    }

    #[test]
    fn anchors_are_not_unknown() {
        let tmp = tempfile::tempdir().unwrap();
        let p = write(tmp.path(), "version: 1\nx-common: &c 1\n");
        assert!(load_config(&p, true).is_ok());
    }

    #[test]
    fn rejects_bad_version_and_threshold() {
        let tmp = tempfile::tempdir().unwrap();
        let p = write(tmp.path(), "version: 2\n");
        assert!(load_config(&p, false).unwrap_err().0.contains("version"));

        let p = write(tmp.path(), "aggregate:\n  pass_threshold: 1.5\n");
        assert!(load_config(&p, false).unwrap_err().0.contains("pass_threshold"));
        let p = write(tmp.path(), "aggregate:\n  pass_threshold: 0.0\n");
        assert!(load_config(&p, false).unwrap_err().0.contains("pass_threshold"));
    }

    #[test]
    fn env_overrides() {
        let env: HashMap<&str, &str> = [
            ("EVALBOARD_BACKEND", "json_dir"),
            ("EVALBOARD_PASS_THRESHOLD", "0.75"),
            ("EVALBOARD_LOG", "debug"),
        ]
        .into_iter()
        .collect();
        let mut cfg = EvalboardConfig::default();
        cfg.apply_env_from(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.store.backend, StoreBackend::JsonDir);
        assert_eq!(cfg.store.path(), PathBuf::from(".evalboard/runs"));
        assert_eq!(cfg.aggregate.pass_threshold, 0.75);
        assert_eq!(cfg.log_level, "debug");

        let mut cfg = EvalboardConfig::default();
        assert!(cfg
            .apply_env_from(|k| (k == "EVALBOARD_PASS_THRESHOLD").then(|| "high".to_string()))
            .is_err());
    }
}
