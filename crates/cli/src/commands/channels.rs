use dashshare_core::config::{AppConfig, LoadOptions};
use dashshare_slack::client::{HttpSlackClient, SlackApi};

use super::{CommandResult, EXIT_RUNTIME};

/// Lists channels the bot can see, as returned by `conversations.list`.
pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return CommandResult::config_failure("channels", error),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "channels",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                EXIT_RUNTIME,
            );
        }
    };

    let result = runtime.block_on(async {
        let client = HttpSlackClient::new(&config.slack)?;
        client.list_conversations().await
    });

    match result {
        Ok(channels) => {
            let message = format!("listed {} channels", channels.len());
            match serde_json::to_value(&channels) {
                Ok(data) => CommandResult::success_with_data("channels", message, Some(data)),
                Err(error) => CommandResult::failure(
                    "channels",
                    "serialization",
                    error.to_string(),
                    EXIT_RUNTIME,
                ),
            }
        }
        Err(error) => {
            CommandResult::failure("channels", "slack_api", error.to_string(), EXIT_RUNTIME)
        }
    }
}
