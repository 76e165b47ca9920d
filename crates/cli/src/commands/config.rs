use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use toml::Value;
use valora_core::config::{resolve_config_path, AppConfig, LoadOptions};

use crate::commands::CommandResult;

/// Where a rendered value was read from, checked in precedence order.
struct SourceLookup {
    file_doc: Option<Value>,
    file_path: Option<PathBuf>,
}

impl SourceLookup {
    fn detect() -> Self {
        let file_path = resolve_config_path(None);
        let file_doc = load_config_file_doc(file_path.as_deref());
        Self { file_doc, file_path }
    }

    fn field_source(&self, key_path: &str, env_keys: &[&str]) -> String {
        if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
            return format!("env ({env_key})");
        }

        if let Some(doc) = &self.file_doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .file_path
                    .as_deref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let sources = SourceLookup::detect();
    let gateway_secret = config
        .identity
        .gateway_secret
        .as_ref()
        .map(|secret| redact_secret(secret.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());

    let entries: [(&str, String, &[&str]); 9] = [
        ("database.url", config.database.url.clone(), &["VALORA_DATABASE_URL"]),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["VALORA_DATABASE_MAX_CONNECTIONS"],
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["VALORA_DATABASE_TIMEOUT_SECS"],
        ),
        ("server.bind_address", config.server.bind_address.clone(), &["VALORA_SERVER_BIND_ADDRESS"]),
        ("server.port", config.server.port.to_string(), &["VALORA_SERVER_PORT"]),
        (
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["VALORA_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        ("identity.gateway_secret", gateway_secret, &["VALORA_IDENTITY_GATEWAY_SECRET"]),
        (
            "logging.level",
            config.logging.level.clone(),
            &["VALORA_LOGGING_LEVEL", "VALORA_LOG_LEVEL"],
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
            &["VALORA_LOGGING_FORMAT", "VALORA_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_keys) in entries {
        lines.push(render_line(key, &value, sources.field_source(key, env_keys)));
    }

    CommandResult::success("config", "configuration loaded").with_detail(lines.join("\n"))
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_secret(secret: &str) -> String {
    if secret.trim().is_empty() {
        return "<empty>".to_string();
    }

    "<redacted>".to_string()
}
