use std::process::ExitCode;

fn main() -> ExitCode {
    sentinel_index::cli::run()
}
