use std::fs;
use std::path::Path;

use dashshare_core::config::{AppConfig, LoadOptions};
use dashshare_slack::client::{HttpSlackClient, SlackApi};
use serde::Serialize;

use super::{CommandResult, EXIT_CONFIG, EXIT_RUNTIME};

const WRITE_CHECK_FILE: &str = ".dashshare-doctor-write-check";

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

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = exit_code(&report);

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_slack_token(&config));
            checks.push(check_images_dir(&config.rendering.images_dir));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["slack_token_readiness", "images_dir_writable"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
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

fn exit_code(report: &DoctorReport) -> u8 {
    let failed = |name: &str| {
        report.checks.iter().any(|check| check.name == name && check.status == CheckStatus::Fail)
    };

    if failed("config_validation") {
        EXIT_CONFIG
    } else if report.overall_status == CheckStatus::Fail {
        EXIT_RUNTIME
    } else {
        0
    }
}

/// Calls `auth.test` with the configured bot token.
fn check_slack_token(config: &AppConfig) -> DoctorCheck {
    let result = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| format!("failed to initialize async runtime: {error}"))
        .and_then(|runtime| {
            runtime
                .block_on(async {
                    let client = HttpSlackClient::new(&config.slack)?;
                    client.auth_test().await
                })
                .map_err(|error| error.to_string())
        });

    match result {
        Ok(identity) => DoctorCheck {
            name: "slack_token_readiness",
            status: CheckStatus::Pass,
            details: format!("authenticated as `{}` in `{}`", identity.user, identity.team),
        },
        Err(details) => {
            DoctorCheck { name: "slack_token_readiness", status: CheckStatus::Fail, details }
        }
    }
}

/// Creates the directory if needed, then writes and removes a marker file.
fn check_images_dir(images_dir: &Path) -> DoctorCheck {
    let marker = images_dir.join(WRITE_CHECK_FILE);
    let result = fs::create_dir_all(images_dir)
        .and_then(|()| fs::write(&marker, b"ok"))
        .and_then(|()| fs::remove_file(&marker));

    match result {
        Ok(()) => DoctorCheck {
            name: "images_dir_writable",
            status: CheckStatus::Pass,
            details: format!("rendered images can be written to `{}`", images_dir.display()),
        },
        Err(error) => DoctorCheck {
            name: "images_dir_writable",
            status: CheckStatus::Fail,
            details: format!("cannot write to `{}`: {error}", images_dir.display()),
        },
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
