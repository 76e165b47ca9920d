use std::process::ExitCode;

fn main() -> ExitCode {
    valora_cli::run()
}
