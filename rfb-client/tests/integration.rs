//! Integration tests for rfb-client against a real server.
//!
//! These tests require a running VNC server. Set the environment variable
//! VNC_TEST_SERVER to specify the server address (default: localhost:5900)
//! and VNC_TEST_PASSWORD if it needs one.
//!
//! Example:
//!   VNC_TEST_SERVER=localhost:5901 cargo test --test integration -- --ignored --nocapture

use rfb_client::{run_operation, Config, Operation, OperationOutcome, Session};
use std::env;
use std::time::Duration;

/// Get VNC server address from environment or use default
fn get_test_server() -> (String, u16) {
    let server = env::var("VNC_TEST_SERVER").unwrap_or_else(|_| "localhost:5900".to_string());

    if let Some((host, port_str)) = server.split_once(':') {
        let port = port_str.parse::<u16>().expect("Invalid port");
        (host.to_string(), port)
    } else {
        (server, 5900)
    }
}

fn test_config() -> anyhow::Result<Config> {
    let (host, port) = get_test_server();
    let mut builder = Config::builder()
        .host(host)
        .port(port)
        .timeout(Duration::from_secs(10));
    if let Ok(password) = env::var("VNC_TEST_PASSWORD") {
        builder = builder.password(password);
    }
    Ok(builder.build()?)
}

/// Test basic connection and handshake
#[tokio::test]
#[ignore] // Requires running VNC server
async fn test_basic_connection() -> anyhow::Result<()> {
    let mut session = Session::connect(&test_config()?).await?;
    let geometry = session.geometry();
    println!(
        "Connected to: {} ({}) RFB {}",
        session.name(),
        geometry,
        session.version()
    );
    assert!(geometry.width > 0);
    assert!(geometry.height > 0);

    session.close().await;
    Ok(())
}

/// Test a full-screen capture
#[tokio::test]
#[ignore] // Requires running VNC server
async fn test_capture_screen() -> anyhow::Result<()> {
    let outcome = run_operation(&test_config()?, &Operation::CaptureScreen).await?;
    match outcome {
        OperationOutcome::Screen { width, height, png } => {
            println!("Captured {}x{} ({} bytes PNG)", width, height, png.len());
            assert!(width > 0 && height > 0);
            assert_eq!(&png[..4], b"\x89PNG");
        }
        other => panic!("Expected screen outcome, got: {:?}", other),
    }
    Ok(())
}

/// Test pointer movement at the screen centre
#[tokio::test]
#[ignore] // Requires running VNC server
async fn test_pointer_move() -> anyhow::Result<()> {
    let op = Operation::Move {
        x: 683,
        y: 384,
        source_width: 1366,
        source_height: 768,
    };
    let outcome = run_operation(&test_config()?, &op).await?;
    assert!(matches!(outcome, OperationOutcome::Pointer { .. }));
    Ok(())
}
