use std::process::ExitCode;

fn main() -> ExitCode {
    pipelens_cli::run()
}
