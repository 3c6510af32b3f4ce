mod cli;
mod jq_exec;

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<ExitCode> {
    // RUST_LOG=json_decode=trace shows lazy/reference resolution
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
    let command_line_interface = cli::CommandLineInterface::load();
    command_line_interface.run()
}
