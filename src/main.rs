//! gx-cascade - Coordinate cascading republishing of gx packages

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = gx_cascade::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
