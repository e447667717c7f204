use std::io;
use std::process::ExitCode;

use relbuild_sdk::{FAILURE_EXIT_CODE, write_failure};

fn main() -> ExitCode {
    match relbuild::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let message = relbuild::failure_message(&err);
            let _ = write_failure(&mut io::stderr().lock(), &message);
            ExitCode::from(FAILURE_EXIT_CODE)
        }
    }
}
