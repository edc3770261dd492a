use std::path::Path;

use dashshare_core::config::{AppConfig, LoadOptions};

use super::{CommandResult, EXIT_RUNTIME};

/// Resolves the public attachment URL for a rendered image file.
pub fn run(file: &Path) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return CommandResult::config_failure("preview-url", error),
    };

    match config.public_url.image_url_for_file(file) {
        Some(url) => CommandResult::success("preview-url", url),
        None => CommandResult::failure(
            "preview-url",
            "invalid_image_path",
            format!("`{}` has no file name", file.display()),
            EXIT_RUNTIME,
        ),
    }
}
