//! Headless capture example - connect, grab the screen, write a PNG.
//!
//! Usage:
//!   VNC_PASSWORD=secret cargo run --example capture_png -- localhost 5900 screen.png

use rfb_client::{run_operation, Config, Operation, OperationOutcome};
use std::env;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        eprintln!("Usage: {} <host> <port> <output.png>", args[0]);
        std::process::exit(1);
    }

    let mut builder = Config::builder().host(&args[1]).port(args[2].parse()?);
    if let Ok(password) = env::var("VNC_PASSWORD") {
        builder = builder.password(password);
    }
    let config = builder.build()?;

    match run_operation(&config, &Operation::CaptureScreen).await? {
        OperationOutcome::Screen { width, height, png } => {
            std::fs::write(&args[3], &png)?;
            info!("Wrote {}x{} capture to {}", width, height, args[3]);
        }
        other => anyhow::bail!("unexpected outcome: {other:?}"),
    }
    Ok(())
}
