use std::env;
use std::fs;
use std::path::Path;

use dashshare_core::config::{resolve_config_path, AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

use super::CommandResult;

/// One line per effective setting: key path, env override, rendered value.
struct Field {
    key: &'static str,
    env: &'static [&'static str],
    value: String,
}

impl Field {
    fn new(key: &'static str, env: &'static [&'static str], value: impl ToString) -> Self {
        Self { key, env, value: value.to_string() }
    }
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return CommandResult::config_failure("config", error),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key,
            field.env,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let slack = &config.slack;
    let server = &config.server;
    let public_url = &config.public_url;
    let grafana = &config.grafana;
    let rendering = &config.rendering;

    vec![
        Field::new(
            "slack.bot_token",
            &["DASHSHARE_SLACK_BOT_TOKEN"],
            redact_token(slack.bot_token.expose_secret()),
        ),
        Field::new("slack.api_base_url", &["DASHSHARE_SLACK_API_BASE_URL"], &slack.api_base_url),
        Field::new("slack.timeout_secs", &["DASHSHARE_SLACK_TIMEOUT_SECS"], slack.timeout_secs),
        Field::new("server.bind_address", &["DASHSHARE_SERVER_BIND_ADDRESS"], &server.bind_address),
        Field::new("server.port", &["DASHSHARE_SERVER_PORT"], server.port),
        Field::new(
            "server.graceful_shutdown_secs",
            &["DASHSHARE_SERVER_GRACEFUL_SHUTDOWN_SECS"],
            server.graceful_shutdown_secs,
        ),
        Field::new(
            "public_url.protocol",
            &["DASHSHARE_PUBLIC_URL_PROTOCOL"],
            public_url.protocol.as_str(),
        ),
        Field::new(
            "public_url.http_addr",
            &["DASHSHARE_PUBLIC_URL_HTTP_ADDR"],
            &public_url.http_addr,
        ),
        Field::new(
            "public_url.http_port",
            &["DASHSHARE_PUBLIC_URL_HTTP_PORT"],
            public_url.http_port,
        ),
        Field::new(
            "public_url.app_sub_url",
            &["DASHSHARE_PUBLIC_URL_APP_SUB_URL"],
            display_or_unset(&public_url.app_sub_url),
        ),
        Field::new(
            "public_url.serve_from_sub_path",
            &["DASHSHARE_PUBLIC_URL_SERVE_FROM_SUB_PATH"],
            public_url.serve_from_sub_path,
        ),
        Field::new(
            "public_url.renderer_callback_url",
            &["DASHSHARE_PUBLIC_URL_RENDERER_CALLBACK_URL"],
            display_or_unset(public_url.renderer_callback_url.as_deref().unwrap_or_default()),
        ),
        Field::new("grafana.url", &["DASHSHARE_GRAFANA_URL"], &grafana.url),
        Field::new(
            "grafana.api_token",
            &["DASHSHARE_GRAFANA_API_TOKEN"],
            redact_optional(grafana.api_token.as_ref()),
        ),
        Field::new(
            "grafana.timeout_secs",
            &["DASHSHARE_GRAFANA_TIMEOUT_SECS"],
            grafana.timeout_secs,
        ),
        Field::new(
            "rendering.renderer_url",
            &["DASHSHARE_RENDERING_RENDERER_URL"],
            &rendering.renderer_url,
        ),
        Field::new(
            "rendering.renderer_token",
            &["DASHSHARE_RENDERING_RENDERER_TOKEN"],
            redact_optional(rendering.renderer_token.as_ref()),
        ),
        Field::new(
            "rendering.images_dir",
            &["DASHSHARE_RENDERING_IMAGES_DIR"],
            rendering.images_dir.display(),
        ),
        Field::new(
            "rendering.default_org_id",
            &["DASHSHARE_RENDERING_DEFAULT_ORG_ID"],
            rendering.default_org_id,
        ),
        Field::new(
            "rendering.concurrent_request_limit",
            &["DASHSHARE_RENDERING_CONCURRENT_REQUEST_LIMIT"],
            rendering.concurrent_request_limit,
        ),
        Field::new(
            "rendering.timeout_secs",
            &["DASHSHARE_RENDERING_TIMEOUT_SECS"],
            rendering.timeout_secs,
        ),
        Field::new(
            "rendering.image_lifetime_secs",
            &["DASHSHARE_RENDERING_IMAGE_LIFETIME_SECS"],
            rendering.image_lifetime_secs,
        ),
        Field::new("rendering.width", &[], rendering.width),
        Field::new("rendering.height", &[], rendering.height),
        Field::new("rendering.device_scale_factor", &[], rendering.device_scale_factor),
        Field::new(
            "logging.level",
            &["DASHSHARE_LOGGING_LEVEL", "DASHSHARE_LOG_LEVEL"],
            &config.logging.level,
        ),
        Field::new(
            "logging.format",
            &["DASHSHARE_LOGGING_FORMAT", "DASHSHARE_LOG_FORMAT"],
            format!("{:?}", config.logging.format).to_lowercase(),
        ),
    ]
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
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

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn display_or_unset(value: &str) -> String {
    if value.is_empty() {
        "<unset>".to_string()
    } else {
        value.to_string()
    }
}

fn redact_optional(token: Option<&SecretString>) -> String {
    token.map(|token| redact_token(token.expose_secret())).unwrap_or_else(|| "<unset>".to_string())
}

fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
