//! Moto Telemetry Host - Main Entry Point

use host_link::{init_logging, run, ConsoleConsumer, HostConfig, JsonConsumer, OutputFormat, TelemetryConsumer};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1);
    let config = HostConfig::load(path.as_deref())?;
    init_logging(&config.log_level);

    info!("=== Moto Telemetry v{} ===", env!("CARGO_PKG_VERSION"));

    let mut consumer: Box<dyn TelemetryConsumer> = match config.output {
        OutputFormat::Console => {
            // The first redraw moves the cursor up a line
            println!();
            Box::new(ConsoleConsumer::new(std::io::stdout()))
        }
        OutputFormat::Json => Box::new(JsonConsumer::new(std::io::stdout())),
    };

    if let Err(e) = run(&config, consumer.as_mut()).await {
        error!("{}", e);
        return Err(e.into());
    }
    Ok(())
}
