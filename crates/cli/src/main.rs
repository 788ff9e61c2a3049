use std::process::ExitCode;

fn main() -> ExitCode {
    docent_cli::run()
}
