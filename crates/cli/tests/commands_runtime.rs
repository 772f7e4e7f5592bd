use std::env;
use std::io::Cursor;
use std::sync::{Mutex, OnceLock};

use glassdesk_cli::commands::{chat, classify, config, doctor};
use serde_json::Value;
use tempfile::TempDir;

#[test]
fn config_reports_sources_and_redacts_secrets() {
    with_env(
        &[
            ("GLASSDESK_LLM_API_KEY", "sk-live-secret"),
            ("GLASSDESK_WHATSAPP_VERIFY_TOKEN", "verify-secret"),
            ("GLASSDESK_LOOKUP_TIMEOUT_SECS", "7"),
        ],
        || {
            let result = config::run();
            assert_eq!(result.exit_code, 0, "expected config inspection success");
            assert!(!result.output.contains("sk-live-secret"));
            assert!(!result.output.contains("verify-secret"));

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "config");
            assert_eq!(payload["status"], "ok");

            let api_key = field(&payload, "llm.api_key");
            assert_eq!(api_key["value"], "<redacted>");
            assert_eq!(api_key["source"], "env (GLASSDESK_LLM_API_KEY)");

            let timeout = field(&payload, "lookup.timeout_secs");
            assert_eq!(timeout["value"], "7");

            let access_token = field(&payload, "whatsapp.access_token");
            assert_eq!(access_token["value"], "<unset>");
            assert_eq!(access_token["source"], "default");
        },
    );
}

#[test]
fn config_returns_failure_for_invalid_env() {
    with_env(&[("GLASSDESK_SESSION_BACKEND", "redis")], || {
        let result = config::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "config");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn doctor_passes_with_in_memory_sessions() {
    with_env(&[], || {
        let (output, passed) = doctor::run(true);
        assert!(passed, "expected all checks to pass: {output}");

        let payload = parse_payload(&output);
        assert_eq!(payload["overall_status"], "pass");
        let names: Vec<&str> = payload["checks"]
            .as_array()
            .expect("checks")
            .iter()
            .filter_map(|check| check["name"].as_str())
            .collect();
        assert_eq!(
            names,
            [
                "reply_templates",
                "config_validation",
                "collaborator_wiring",
                "session_store_connectivity"
            ]
        );
    });
}

#[test]
fn doctor_prepares_sqlite_session_store() {
    let dir = TempDir::new().expect("temp dir");
    let url = format!("sqlite://{}", dir.path().join("sessions.db").display());

    with_env(&[("GLASSDESK_SESSION_BACKEND", "sqlite"), ("GLASSDESK_DATABASE_URL", &url)], || {
        let (output, passed) = doctor::run(false);
        assert!(passed, "expected sqlite readiness: {output}");
        assert!(output.contains("- [ok] session_store_connectivity"));
    });

    assert!(dir.path().join("sessions.db").exists());
}

#[test]
fn doctor_skips_dependent_checks_when_config_is_invalid() {
    with_env(&[("GLASSDESK_LOOKUP_MODE", "http")], || {
        let (output, passed) = doctor::run(true);
        assert!(!passed);

        let payload = parse_payload(&output);
        assert_eq!(payload["overall_status"], "fail");
        let checks = payload["checks"].as_array().expect("checks");
        assert_eq!(checks[1]["status"], "fail");
        assert!(checks[1]["details"].as_str().unwrap_or_default().contains("lookup.base_url"));
        assert_eq!(checks[2]["status"], "skipped");
        assert_eq!(checks[3]["status"], "skipped");
    });
}

#[test]
fn classify_reports_mercosul_plate() {
    let result = classify::run("abc-1d23");
    assert_eq!(result.exit_code, 0);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["command"], "classify");
    assert_eq!(payload["data"]["entity_type"], "plate");
    assert_eq!(payload["data"]["value"], "ABC1D23");
}

#[test]
fn chat_runs_a_terminal_conversation_until_quit() {
    let input = Cursor::new("ABC1234\n\nquando fica pronto?\n/reset\n/quit\nDEF5678\n");
    let mut output = Vec::new();

    let result = chat::run_with_io(input, &mut output, "terminal-test");
    assert_eq!(result.exit_code, 0);

    let transcript = String::from_utf8(output).expect("utf8 transcript");
    assert!(transcript.starts_with("assistente: Olá!"), "unexpected start: {transcript}");
    assert!(transcript.contains("João da Silva"));
    assert!(!transcript.contains("<span"));
    assert!(!transcript.contains("Maria Oliveira"), "input after /quit must be ignored");

    let payload = parse_payload(last_line(&result.output));
    assert_eq!(payload["command"], "chat");
    assert_eq!(payload["data"]["turns"], 3);
}

fn field<'a>(payload: &'a Value, key: &str) -> &'a Value {
    payload["data"]["fields"]
        .as_array()
        .and_then(|fields| fields.iter().find(|field| field["key"] == key))
        .unwrap_or_else(|| panic!("missing config field {key}"))
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn last_line(output: &str) -> &str {
    output.lines().last().unwrap_or_default()
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "GLASSDESK_DATABASE_URL",
        "GLASSDESK_DATABASE_MAX_CONNECTIONS",
        "GLASSDESK_DATABASE_TIMEOUT_SECS",
        "GLASSDESK_SESSION_BACKEND",
        "GLASSDESK_SESSION_TTL_SECS",
        "GLASSDESK_LOOKUP_MODE",
        "GLASSDESK_LOOKUP_BASE_URL",
        "GLASSDESK_LOOKUP_TIMEOUT_SECS",
        "GLASSDESK_LLM_PROVIDER",
        "GLASSDESK_LLM_API_KEY",
        "GLASSDESK_LLM_BASE_URL",
        "GLASSDESK_LLM_MODEL",
        "GLASSDESK_LLM_TIMEOUT_SECS",
        "GLASSDESK_ESCALATION_TIMEOUT_SECS",
        "GLASSDESK_WHATSAPP_VERIFY_TOKEN",
        "GLASSDESK_WHATSAPP_ACCESS_TOKEN",
        "GLASSDESK_WHATSAPP_PHONE_NUMBER_ID",
        "GLASSDESK_WHATSAPP_API_VERSION",
        "GLASSDESK_SERVER_BIND_ADDRESS",
        "GLASSDESK_SERVER_PORT",
        "GLASSDESK_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "GLASSDESK_LOG_LEVEL",
        "GLASSDESK_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
