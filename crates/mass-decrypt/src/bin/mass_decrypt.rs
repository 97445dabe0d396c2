use std::process::ExitCode;

fn main() -> ExitCode {
    mass_decrypt::cli::run()
}
