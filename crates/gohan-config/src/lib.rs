//! Layered YAML configuration loader.
//!
//! Later files in the list override earlier ones via deep-merge, the same
//! policy every operator-facing tool in this lineage uses. Produces a
//! canonicalized (stable key order) JSON value plus typed accessors for the
//! handful of settings the synchronization core needs.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::fs;

/// Compiled-in defaults for §6's tunables. A loaded [`Config`] may override
/// any of these; absent an override the compiled default applies.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_BATCH_LIMIT: i64 = 10_000;
pub const DEFAULT_LOCK_RETRY_DELAY_SECS: u64 = 5;

pub const ENV_DB_URL: &str = "GOHAN_DATABASE_URL";

/// Load + merge YAML files in order, returning the canonicalized result.
pub fn load_layered_yaml(paths: &[&str]) -> Result<Value> {
    let mut merged = Value::Object(Default::default());

    for p in paths {
        let s = fs::read_to_string(p).with_context(|| format!("read config: {p}"))?;
        let yaml_val: serde_yaml::Value =
            serde_yaml::from_str(&s).with_context(|| format!("parse yaml: {p}"))?;
        let json_val = serde_json::to_value(yaml_val).context("yaml->json conversion failed")?;
        deep_merge(&mut merged, json_val);
    }

    Ok(sort_keys(&merged))
}

fn deep_merge(dst: &mut Value, src: Value) {
    match (dst, src) {
        (Value::Object(dst_map), Value::Object(src_map)) => {
            for (k, v) in src_map {
                match dst_map.get_mut(&k) {
                    Some(existing) => deep_merge(existing, v),
                    None => {
                        dst_map.insert(k, v);
                    }
                }
            }
        }
        (dst_slot, src_val) => {
            *dst_slot = src_val;
        }
    }
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

/// One `(watch_prefix, event_name)` binding: the watch supervisor (C7) watches
/// `watch_prefix`, and the extension dispatcher (C8) binds matching events to
/// an environment named `sync.<event_name>`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ExtensionBinding {
    pub prefix: String,
    pub event: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct TunablesRaw {
    poll_interval_secs: Option<u64>,
    batch_limit: Option<i64>,
    lock_retry_delay_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseRaw {
    url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SyncBackendRaw {
    endpoint: String,
}

#[derive(Debug, Clone, Deserialize)]
struct WatchRaw {
    #[serde(default)]
    extensions: Vec<ExtensionBinding>,
}

#[derive(Debug, Clone, Deserialize)]
struct ConfigRaw {
    database: Option<DatabaseRaw>,
    sync_backend: SyncBackendRaw,
    #[serde(default)]
    watch: WatchRaw,
    #[serde(default)]
    tunables: TunablesRaw,
}

/// Fully resolved configuration: the database URL (env override applied),
/// the sync-backend endpoint, extension bindings, and tunables (compiled
/// defaults unless overridden).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub sync_backend_endpoint: String,
    pub extension_bindings: Vec<ExtensionBinding>,
    pub poll_interval_secs: u64,
    pub batch_limit: i64,
    pub lock_retry_delay_secs: u64,
}

impl Config {
    /// Load and merge `paths`, then resolve with the `GOHAN_DATABASE_URL`
    /// environment variable taking precedence over `database.url` in config.
    pub fn load(paths: &[&str]) -> Result<Self> {
        let merged = load_layered_yaml(paths)?;
        let env_db_url = std::env::var(ENV_DB_URL).ok();
        Self::from_merged(merged, env_db_url.as_deref())
    }

    /// Pure resolution step, split out of [`Config::load`] so tests can
    /// supply an explicit env-var override instead of mutating process env
    /// (which races under parallel test execution).
    fn from_merged(merged: Value, env_db_url: Option<&str>) -> Result<Self> {
        let raw: ConfigRaw =
            serde_json::from_value(merged).context("config did not match expected shape")?;

        let database_url = env_db_url
            .map(str::to_string)
            .or_else(|| raw.database.and_then(|d| d.url))
            .context("no database url: set GOHAN_DATABASE_URL or config.database.url")?;

        Ok(Config {
            database_url,
            sync_backend_endpoint: raw.sync_backend.endpoint,
            extension_bindings: raw.watch.extensions,
            poll_interval_secs: raw
                .tunables
                .poll_interval_secs
                .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
            batch_limit: raw.tunables.batch_limit.unwrap_or(DEFAULT_BATCH_LIMIT),
            lock_retry_delay_secs: raw
                .tunables
                .lock_retry_delay_secs
                .unwrap_or(DEFAULT_LOCK_RETRY_DELAY_SECS),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn later_file_overrides_earlier() {
        let base = write_tmp("sync_backend:\n  endpoint: http://base:2379\ntunables:\n  batch_limit: 100\n");
        let override_f = write_tmp("sync_backend:\n  endpoint: http://override:2379\n");

        let base_path = base.path().to_str().unwrap();
        let override_path = override_f.path().to_str().unwrap();

        let merged = load_layered_yaml(&[base_path, override_path]).unwrap();
        let cfg = Config::from_merged(merged, Some("postgres://test")).unwrap();

        assert_eq!(cfg.sync_backend_endpoint, "http://override:2379");
        assert_eq!(cfg.batch_limit, 100);
    }

    #[test]
    fn env_var_overrides_config_db_url() {
        let f = write_tmp(
            "database:\n  url: postgres://from-config\nsync_backend:\n  endpoint: http://x:1\n",
        );
        let path = f.path().to_str().unwrap();

        let merged = load_layered_yaml(&[path]).unwrap();
        let cfg = Config::from_merged(merged, Some("postgres://from-env")).unwrap();

        assert_eq!(cfg.database_url, "postgres://from-env");
    }

    #[test]
    fn config_db_url_used_when_no_env_override() {
        let f = write_tmp(
            "database:\n  url: postgres://from-config\nsync_backend:\n  endpoint: http://x:1\n",
        );
        let path = f.path().to_str().unwrap();

        let merged = load_layered_yaml(&[path]).unwrap();
        let cfg = Config::from_merged(merged, None).unwrap();

        assert_eq!(cfg.database_url, "postgres://from-config");
    }

    #[test]
    fn missing_db_url_is_an_error() {
        let f = write_tmp("sync_backend:\n  endpoint: http://x:1\n");
        let path = f.path().to_str().unwrap();

        let merged = load_layered_yaml(&[path]).unwrap();
        assert!(Config::from_merged(merged, None).is_err());
    }

    #[test]
    fn defaults_apply_when_tunables_absent() {
        let f = write_tmp("sync_backend:\n  endpoint: http://x:1\n");
        let path = f.path().to_str().unwrap();

        let merged = load_layered_yaml(&[path]).unwrap();
        let cfg = Config::from_merged(merged, Some("postgres://test")).unwrap();

        assert_eq!(cfg.poll_interval_secs, DEFAULT_POLL_INTERVAL_SECS);
        assert_eq!(cfg.batch_limit, DEFAULT_BATCH_LIMIT);
        assert_eq!(cfg.lock_retry_delay_secs, DEFAULT_LOCK_RETRY_DELAY_SECS);
    }

    #[test]
    fn extension_bindings_parsed() {
        let f = write_tmp(
            r#"
sync_backend:
  endpoint: http://x:1
watch:
  extensions:
    - prefix: /v1.0/networks
      event: network_notify
"#,
        );
        let path = f.path().to_str().unwrap();
        let merged = load_layered_yaml(&[path]).unwrap();
        let cfg = Config::from_merged(merged, Some("postgres://test")).unwrap();

        assert_eq!(
            cfg.extension_bindings,
            vec![ExtensionBinding {
                prefix: "/v1.0/networks".to_string(),
                event: "network_notify".to_string(),
            }]
        );
    }
}
