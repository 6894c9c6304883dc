use serde::Deserialize;
use std::{env, fs, path::Path, path::PathBuf};
use tracing::info;

use crate::auth::AuthConfig;
use crate::db::DatabaseConfig;

/// Default HTTP bind address.
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Application configuration loaded from `kind.json`.
///
/// Every section is optional; missing values fall back to defaults (and,
/// for the database, to `KIND_DB_*` environment variables).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bind: String,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl AppConfig {
    /// Database settings with an optional `--db-url` override applied.
    pub fn database_with_url(&self, db_url: Option<String>) -> DatabaseConfig {
        match db_url {
            Some(url) => DatabaseConfig {
                url,
                ..self.database.clone()
            },
            None => self.database.clone(),
        }
    }
}

/// Locate the config file, if any.
///
/// `KIND_CONFIG` wins outright; otherwise `$XDG_CONFIG_HOME/kind/kind.json`
/// and then `./kind.json` are tried.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(p) = env::var("KIND_CONFIG") {
        return Some(PathBuf::from(p));
    }

    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        let candidate = PathBuf::from(xdg).join("kind").join("kind.json");
        if candidate.exists() {
            return Some(candidate);
        }
    }

    let candidate = PathBuf::from("kind.json");
    if candidate.exists() {
        return Some(candidate);
    }

    None
}

/// Replace `${VAR}` references with environment values. Unknown variables are
/// left as written.
fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next(); // consume '{'
            let mut name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                name.push(c);
            }
            match env::var(&name) {
                Ok(val) => out.push_str(&val),
                Err(_) => {
                    out.push_str("${");
                    out.push_str(&name);
                    out.push('}');
                }
            }
        } else {
            out.push(ch);
        }
    }

    out
}

/// Parse configuration text after env expansion.
pub fn parse_config(raw: &str) -> anyhow::Result<AppConfig> {
    let config: AppConfig = serde_json::from_str(&expand_env_vars(raw))?;
    config.auth.validate()?;
    Ok(config)
}

pub fn load_config_from(path: &Path) -> anyhow::Result<AppConfig> {
    let raw = fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))?;
    parse_config(&raw)
}

/// Load configuration from an explicit path or the default search locations.
/// With no file found the defaults are used.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<AppConfig> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => resolve_config_path(),
    };

    match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            load_config_from(&path)
        }
        None => Ok(AppConfig::default()),
    }
}
