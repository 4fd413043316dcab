use anyhow::Result;
use otp_replay::cli::{self, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    let action = cli::start()?;

    let result = action.execute().await;

    telemetry::shutdown_tracer();

    result
}
