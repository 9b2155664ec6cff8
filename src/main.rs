//! tkn-graph - task graphs and run states from Tekton pipeline documents

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = tkn_graph::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
