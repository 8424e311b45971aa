use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    match beacond::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            if writeln!(io::stderr(), "beacond: {error}").is_err() {
                return ExitCode::from(2);
            }
            ExitCode::FAILURE
        }
    }
}
