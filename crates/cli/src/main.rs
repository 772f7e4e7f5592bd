use std::process::ExitCode;

fn main() -> ExitCode {
    glassdesk_cli::run()
}
