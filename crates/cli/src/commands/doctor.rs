use glassdesk_agent::formatter::ResponseFormatter;
use glassdesk_core::config::{AppConfig, LoadOptions, LookupMode, SessionBackend};
use glassdesk_db::{connect_with_settings, migrations};
use serde::Serialize;

use crate::commands::runtime;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }

    fn skipped(name: &'static str) -> Self {
        Self {
            name,
            status: CheckStatus::Skipped,
            details: "skipped because configuration did not load".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

/// Returns the rendered report and whether every check passed.
pub fn run(json_output: bool) -> (String, bool) {
    let report = build_report();
    let passed = report.overall_status == CheckStatus::Pass;

    if json_output {
        let rendered = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
        return (rendered, passed);
    }

    (render_human(&report), passed)
}

fn build_report() -> DoctorReport {
    let mut checks = vec![check_reply_templates()];

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck::pass(
                "config_validation",
                "configuration loaded and validated",
            ));
            checks.push(check_collaborators(&config));
            checks.push(check_session_store(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck::fail("config_validation", error.to_string()));
            checks.push(DoctorCheck::skipped("collaborator_wiring"));
            checks.push(DoctorCheck::skipped("session_store_connectivity"));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_reply_templates() -> DoctorCheck {
    match ResponseFormatter::new() {
        Ok(_) => DoctorCheck::pass("reply_templates", "web and whatsapp reply templates compiled"),
        Err(error) => DoctorCheck::fail("reply_templates", error.to_string()),
    }
}

fn check_collaborators(config: &AppConfig) -> DoctorCheck {
    let lookup = match config.lookup.mode {
        LookupMode::Fixture => "fixture status lookup".to_string(),
        LookupMode::Http => {
            format!("http status lookup at `{}`", config.lookup.base_url.as_deref().unwrap_or(""))
        }
    };
    let delivery = if config.whatsapp_delivery_enabled() { "cloud api" } else { "log only" };

    DoctorCheck::pass(
        "collaborator_wiring",
        format!(
            "{lookup}; answers via {:?}; whatsapp delivery {delivery}",
            config.llm.provider
        ),
    )
}

fn check_session_store(config: &AppConfig) -> DoctorCheck {
    const NAME: &str = "session_store_connectivity";

    if config.session.backend == SessionBackend::Memory {
        return DoctorCheck::pass(NAME, "in-memory session store needs no connection");
    }

    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(error) => return DoctorCheck::fail(NAME, error),
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

        let migrated = migrations::run_pending(&pool)
            .await
            .map_err(|error| format!("failed to apply session migrations: {error}"));
        pool.close().await;
        migrated
    });

    match result {
        Ok(()) => DoctorCheck::pass(
            NAME,
            format!("sqlite session store ready at `{}`", config.database.url),
        ),
        Err(error) => DoctorCheck::fail(NAME, error),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
