use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use glassdesk_core::config::{AppConfig, LoadOptions};
use serde::Serialize;
use serde_json::json;
use toml::Value;

use crate::commands::CommandResult;

const UNSET: &str = "<unset>";
const REDACTED: &str = "<redacted>";

#[derive(Debug, Serialize)]
struct ConfigField {
    key: &'static str,
    value: String,
    source: String,
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

    let file_path = detect_config_path();
    let file_doc = load_config_file_doc(file_path.as_deref());
    let fields: Vec<ConfigField> = effective_values(&config)
        .into_iter()
        .map(|(key, env_key, value)| ConfigField {
            key,
            value,
            source: field_source(key, env_key, file_doc.as_ref(), file_path.as_deref()),
        })
        .collect();

    CommandResult::success_with_data(
        "config",
        "effective config (source precedence: env > file > default)",
        json!({
            "config_file": file_path.map(|path| path.display().to_string()),
            "fields": fields,
        }),
    )
}

fn effective_values(config: &AppConfig) -> Vec<(&'static str, &'static str, String)> {
    let optional = |value: Option<&str>| value.unwrap_or(UNSET).to_string();
    let secret = |present: bool| (if present { REDACTED } else { UNSET }).to_string();

    vec![
        ("database.url", "GLASSDESK_DATABASE_URL", config.database.url.clone()),
        (
            "database.max_connections",
            "GLASSDESK_DATABASE_MAX_CONNECTIONS",
            config.database.max_connections.to_string(),
        ),
        (
            "database.timeout_secs",
            "GLASSDESK_DATABASE_TIMEOUT_SECS",
            config.database.timeout_secs.to_string(),
        ),
        ("session.backend", "GLASSDESK_SESSION_BACKEND", format!("{:?}", config.session.backend)),
        ("session.ttl_secs", "GLASSDESK_SESSION_TTL_SECS", config.session.ttl_secs.to_string()),
        ("lookup.mode", "GLASSDESK_LOOKUP_MODE", format!("{:?}", config.lookup.mode)),
        (
            "lookup.base_url",
            "GLASSDESK_LOOKUP_BASE_URL",
            optional(config.lookup.base_url.as_deref()),
        ),
        (
            "lookup.timeout_secs",
            "GLASSDESK_LOOKUP_TIMEOUT_SECS",
            config.lookup.timeout_secs.to_string(),
        ),
        ("llm.provider", "GLASSDESK_LLM_PROVIDER", format!("{:?}", config.llm.provider)),
        ("llm.api_key", "GLASSDESK_LLM_API_KEY", secret(config.llm.api_key.is_some())),
        ("llm.base_url", "GLASSDESK_LLM_BASE_URL", optional(config.llm.base_url.as_deref())),
        ("llm.model", "GLASSDESK_LLM_MODEL", config.llm.model.clone()),
        ("llm.timeout_secs", "GLASSDESK_LLM_TIMEOUT_SECS", config.llm.timeout_secs.to_string()),
        (
            "escalation.timeout_secs",
            "GLASSDESK_ESCALATION_TIMEOUT_SECS",
            config.escalation.timeout_secs.to_string(),
        ),
        (
            "whatsapp.verify_token",
            "GLASSDESK_WHATSAPP_VERIFY_TOKEN",
            secret(config.whatsapp.verify_token.is_some()),
        ),
        (
            "whatsapp.access_token",
            "GLASSDESK_WHATSAPP_ACCESS_TOKEN",
            secret(config.whatsapp.access_token.is_some()),
        ),
        (
            "whatsapp.phone_number_id",
            "GLASSDESK_WHATSAPP_PHONE_NUMBER_ID",
            optional(config.whatsapp.phone_number_id.as_deref()),
        ),
        (
            "whatsapp.api_version",
            "GLASSDESK_WHATSAPP_API_VERSION",
            config.whatsapp.api_version.clone(),
        ),
        (
            "server.bind_address",
            "GLASSDESK_SERVER_BIND_ADDRESS",
            config.server.bind_address.clone(),
        ),
        ("server.port", "GLASSDESK_SERVER_PORT", config.server.port.to_string()),
        (
            "server.graceful_shutdown_secs",
            "GLASSDESK_SERVER_GRACEFUL_SHUTDOWN_SECS",
            config.server.graceful_shutdown_secs.to_string(),
        ),
        ("logging.level", "GLASSDESK_LOG_LEVEL", config.logging.level.clone()),
        ("logging.format", "GLASSDESK_LOG_FORMAT", format!("{:?}", config.logging.format)),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("glassdesk.toml"), PathBuf::from("config/glassdesk.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
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
