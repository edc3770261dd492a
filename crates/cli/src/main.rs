use std::process::ExitCode;

fn main() -> ExitCode {
    dashshare_cli::run()
}
