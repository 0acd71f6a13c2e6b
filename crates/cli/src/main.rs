use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    rosterbot_cli::run().await
}
