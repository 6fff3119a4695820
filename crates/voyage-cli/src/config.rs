//! Configuration file management for voyage.
//!
//! Provides a TOML-based config file at `~/.config/voyage/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use voyage_core::{DispatchOptions, ModelConfig};
use voyage_core::model::gemini::DEFAULT_GEMINI_API;
use voyage_store::StoreConfig;
use voyage_store::blob::DEFAULT_BLOB_API;

/// Bind address when none is configured.
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Port when none is configured.
pub const DEFAULT_PORT: u16 = 3000;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub model: ModelSection,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub server: ServerSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ModelSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub materialize_via_stream: Option<bool>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StoreSection {
    /// Directory holding `plans.json` for the file backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// Presence selects the blob backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_api_url: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the voyage config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/voyage` or `~/.config/voyage`,
/// on every platform.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("voyage");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("voyage")
}

/// Return the path to the voyage config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix since it may hold API keys.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Values given on the command line; `None` falls through the chain.
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub bind: Option<String>,
    pub port: Option<u16>,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct VoyageConfig {
    pub model: ModelConfig,
    pub store: StoreConfig,
    pub options: DispatchOptions,
    pub bind: String,
    pub port: u16,
}

impl VoyageConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - API key: `GEMINI_API_KEY` > `model.api_key` > none
    /// - Model: `GENERATIVE_MODEL` > `model.model` > `gemini-2.5-flash`
    /// - Store: `BLOB_READ_WRITE_TOKEN` > `store.blob_token` selects the blob
    ///   backend; otherwise `VOYAGE_DATA_DIR` > `store.data_dir` > `local-data`
    /// - Server: `--bind`/`--port` > `VOYAGE_BIND`/`VOYAGE_PORT` > `[server]` > default
    pub fn resolve(cli: &CliOverrides) -> Result<Self> {
        let file = load_config().ok();
        Self::resolve_with(cli, file.as_ref(), |key| std::env::var(key).ok())
    }

    /// [`Self::resolve`] with the config file and environment supplied.
    pub fn resolve_with(
        cli: &CliOverrides,
        file: Option<&ConfigFile>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let env = |key: &str| env(key).filter(|v| !v.is_empty());
        let empty = ConfigFile::default();
        let file = file.unwrap_or(&empty);

        let model = ModelConfig {
            api_key: env("GEMINI_API_KEY").or_else(|| file.model.api_key.clone()),
            model: env("GENERATIVE_MODEL")
                .or_else(|| file.model.model.clone())
                .unwrap_or_else(|| ModelConfig::DEFAULT_MODEL.to_owned()),
            base_url: env("VOYAGE_GEMINI_API_URL")
                .or_else(|| file.model.base_url.clone())
                .unwrap_or_else(|| DEFAULT_GEMINI_API.to_owned()),
        };

        let materialize_via_stream = match env("VOYAGE_MATERIALIZE_VIA_STREAM") {
            Some(v) => parse_bool(&v)
                .with_context(|| format!("VOYAGE_MATERIALIZE_VIA_STREAM is not a boolean: {v}"))?,
            None => file
                .model
                .materialize_via_stream
                .unwrap_or(DispatchOptions::default().materialize_via_stream),
        };

        let store = match env("BLOB_READ_WRITE_TOKEN").or_else(|| file.store.blob_token.clone()) {
            Some(token) => StoreConfig::Blob {
                base_url: env("VOYAGE_BLOB_API_URL")
                    .or_else(|| file.store.blob_api_url.clone())
                    .unwrap_or_else(|| DEFAULT_BLOB_API.to_owned()),
                token,
            },
            None => StoreConfig::file_in(
                env("VOYAGE_DATA_DIR")
                    .or_else(|| file.store.data_dir.clone())
                    .unwrap_or_else(|| StoreConfig::DEFAULT_DATA_DIR.to_owned()),
            ),
        };

        let bind = cli
            .bind
            .clone()
            .or_else(|| env("VOYAGE_BIND"))
            .or_else(|| file.server.bind.clone())
            .unwrap_or_else(|| DEFAULT_BIND.to_owned());
        let port = match (cli.port, env("VOYAGE_PORT")) {
            (Some(port), _) => port,
            (None, Some(v)) => v
                .parse()
                .with_context(|| format!("VOYAGE_PORT is not a valid port: {v}"))?,
            (None, None) => file.server.port.unwrap_or(DEFAULT_PORT),
        };

        Ok(Self {
            model,
            store,
            options: DispatchOptions {
                materialize_via_stream,
            },
            bind,
            port,
        })
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn file_with_everything() -> ConfigFile {
        ConfigFile {
            model: ModelSection {
                api_key: Some("file-key".into()),
                model: Some("gemini-file".into()),
                base_url: None,
                materialize_via_stream: Some(false),
            },
            store: StoreSection {
                data_dir: Some("/srv/voyage".into()),
                blob_token: None,
                blob_api_url: None,
            },
            server: ServerSection {
                bind: Some("0.0.0.0".into()),
                port: Some(8080),
            },
        }
    }

    #[test]
    fn defaults_when_nothing_set() {
        let cfg = VoyageConfig::resolve_with(&CliOverrides::default(), None, env_of(&[])).unwrap();
        assert!(cfg.model.api_key.is_none());
        assert_eq!(cfg.model.model, ModelConfig::DEFAULT_MODEL);
        assert_eq!(cfg.store, StoreConfig::file_in("local-data"));
        assert!(cfg.options.materialize_via_stream);
        assert_eq!(cfg.bind, DEFAULT_BIND);
        assert_eq!(cfg.port, DEFAULT_PORT);
    }

    #[test]
    fn config_file_fills_gaps() {
        let file = file_with_everything();
        let cfg =
            VoyageConfig::resolve_with(&CliOverrides::default(), Some(&file), env_of(&[])).unwrap();
        assert_eq!(cfg.model.api_key.as_deref(), Some("file-key"));
        assert_eq!(cfg.model.model, "gemini-file");
        assert_eq!(cfg.store, StoreConfig::file_in("/srv/voyage"));
        assert!(!cfg.options.materialize_via_stream);
        assert_eq!(cfg.bind, "0.0.0.0");
        assert_eq!(cfg.port, 8080);
    }

    #[test]
    fn env_overrides_config_file() {
        let file = file_with_everything();
        let env = env_of(&[
            ("GEMINI_API_KEY", "env-key"),
            ("VOYAGE_DATA_DIR", "/tmp/env-data"),
            ("VOYAGE_PORT", "4000"),
            ("VOYAGE_MATERIALIZE_VIA_STREAM", "true"),
        ]);
        let cfg = VoyageConfig::resolve_with(&CliOverrides::default(), Some(&file), env).unwrap();
        assert_eq!(cfg.model.api_key.as_deref(), Some("env-key"));
        assert_eq!(cfg.store, StoreConfig::file_in("/tmp/env-data"));
        assert_eq!(cfg.port, 4000);
        assert!(cfg.options.materialize_via_stream);
    }

    #[test]
    fn cli_flag_overrides_all() {
        let file = file_with_everything();
        let cli = CliOverrides {
            bind: Some("::1".into()),
            port: Some(9999),
        };
        let env = env_of(&[("VOYAGE_BIND", "10.0.0.1"), ("VOYAGE_PORT", "4000")]);
        let cfg = VoyageConfig::resolve_with(&cli, Some(&file), env).unwrap();
        assert_eq!(cfg.bind, "::1");
        assert_eq!(cfg.port, 9999);
    }

    #[test]
    fn blob_token_selects_blob_backend() {
        let env = env_of(&[
            ("BLOB_READ_WRITE_TOKEN", "vercel_blob_rw_x"),
            ("VOYAGE_DATA_DIR", "/ignored"),
        ]);
        let cfg = VoyageConfig::resolve_with(&CliOverrides::default(), None, env).unwrap();
        assert_eq!(
            cfg.store,
            StoreConfig::Blob {
                base_url: DEFAULT_BLOB_API.to_owned(),
                token: "vercel_blob_rw_x".to_owned(),
            }
        );
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let file = file_with_everything();
        let env = env_of(&[("GEMINI_API_KEY", ""), ("BLOB_READ_WRITE_TOKEN", "")]);
        let cfg = VoyageConfig::resolve_with(&CliOverrides::default(), Some(&file), env).unwrap();
        assert_eq!(cfg.model.api_key.as_deref(), Some("file-key"));
        assert!(matches!(cfg.store, StoreConfig::File { .. }));
    }

    #[test]
    fn invalid_port_is_an_error() {
        let env = env_of(&[("VOYAGE_PORT", "eighty")]);
        let err = VoyageConfig::resolve_with(&CliOverrides::default(), None, env).unwrap_err();
        assert!(err.to_string().contains("VOYAGE_PORT"), "unexpected error: {err}");
    }

    #[test]
    fn config_file_parses_partial_sections() {
        let file: ConfigFile = toml::from_str("[model]\napi_key = \"k\"\n").unwrap();
        assert_eq!(file.model.api_key.as_deref(), Some("k"));
        assert!(file.server.port.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn save_config_writes_owner_only_file() {
        use std::os::unix::fs::PermissionsExt;

        let _lock = crate::test_util::lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        let orig_xdg = std::env::var("XDG_CONFIG_HOME").ok();
        unsafe { std::env::set_var("XDG_CONFIG_HOME", tmp.path()) };

        let mut cfg = ConfigFile::default();
        cfg.model.api_key = Some("secret".into());
        let saved = save_config(&cfg);
        let loaded = load_config();
        let path = config_path();

        // Restore env before asserting, to avoid poisoning the mutex on failure.
        match orig_xdg {
            Some(x) => unsafe { std::env::set_var("XDG_CONFIG_HOME", x) },
            None => unsafe { std::env::remove_var("XDG_CONFIG_HOME") },
        }

        saved.unwrap();
        assert_eq!(loaded.unwrap().model.api_key.as_deref(), Some("secret"));
        assert!(path.starts_with(tmp.path()));
        let meta = std::fs::metadata(&path).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }

    #[test]
    fn config_path_ends_with_expected_filename() {
        let _lock = crate::test_util::lock_env();
        let path = config_path();
        assert!(
            path.ends_with("voyage/config.toml"),
            "unexpected config path: {}",
            path.display()
        );
    }
}
