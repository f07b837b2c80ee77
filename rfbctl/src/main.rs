use anyhow::{Context, Result};
use rfb_client::args::{Args, Command};
use rfb_client::{spawn_operation, Config, OperationOutcome, RfbClientError};
use std::process::ExitCode;
use tracing::{info, warn};

fn init_logging(level: u8) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // RUST_LOG wins over -v.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match level {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn error_json(err: &RfbClientError) -> serde_json::Value {
    serde_json::json!({
        "error": err.to_string(),
        "kind": err.kind(),
        "retryable": err.is_retryable(),
    })
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = Config::from_args(&args).context("Invalid configuration")?;
    let operation = args.command.operation().context("Invalid operation")?;
    info!("{} on {}", operation.name(), config.address());

    let handle = spawn_operation(config, operation);
    let canceller = handle.abort_handle();
    let join = handle.join();
    tokio::pin!(join);
    let result = tokio::select! {
        result = &mut join => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, cancelling");
            canceller.abort();
            join.await
        }
    };

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            println!("{}", serde_json::to_string_pretty(&error_json(&e))?);
            return Ok(ExitCode::FAILURE);
        }
    };

    if let (Command::Capture { output }, OperationOutcome::Screen { png, .. }) =
        (&args.command, &outcome)
    {
        std::fs::write(output, png)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        info!("Wrote {} bytes to {}", png.len(), output.display());
    }

    println!("{}", serde_json::to_string_pretty(&outcome)?);

    let ok = match &outcome {
        OperationOutcome::Batch { actions } => actions.all_succeeded(),
        _ => true,
    };
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
