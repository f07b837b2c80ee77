//! End-to-end operations against a scripted server on a real TCP socket.

mod support;

use pretty_assertions::assert_eq;
use rfb_client::{
    run_operation, spawn_operation, Action, ActionOutcome, ErrorKind, Operation, OperationOutcome,
    RfbClientError,
};
use rfb_protocol::messages::{ClientMessage, KeyEvent, PointerEvent};
use std::time::Duration;
use support::{config, spawn_server};

#[tokio::test]
async fn test_capture_800x600_raw() {
    let (port, server) = spawn_server(|mut peer| async move {
        peer.handshake_none(800, 600).await;
        assert_eq!(peer.expect_update_request().await, (800, 600));

        peer.write_update_header(1);
        peer.write_rect_header(0, 0, 800, 600, 0);
        // rgb888 little-endian: B, G, R, pad. Solid blue.
        let row: Vec<u8> = [255u8, 0, 0, 0].repeat(800);
        for _ in 0..600 {
            peer.output.write_bytes(&row);
        }
        peer.output.flush().await.unwrap();
        peer.sees_eof().await
    })
    .await;

    let outcome = run_operation(&config(port, None), &Operation::CaptureScreen)
        .await
        .unwrap();
    let OperationOutcome::Screen { width, height, png } = outcome else {
        panic!("expected a screen outcome, got {outcome:?}");
    };
    assert_eq!((width, height), (800, 600));

    let decoded = image::load_from_memory_with_format(&png, image::ImageFormat::Png)
        .unwrap()
        .to_rgba8();
    assert_eq!(decoded.dimensions(), (800, 600));
    assert_eq!(decoded.get_pixel(0, 0).0, [0, 0, 255, 255]);
    assert_eq!(decoded.get_pixel(799, 599).0, [0, 0, 255, 255]);

    assert!(server.await.unwrap(), "client did not close the connection");
}

#[tokio::test]
async fn test_unsupported_encoding_is_decode_error() {
    let (port, server) = spawn_server(|mut peer| async move {
        peer.handshake_none(64, 64).await;
        peer.expect_update_request().await;
        peer.write_update_header(1);
        peer.write_rect_header(0, 0, 64, 64, 16);
        peer.output.flush().await.unwrap();
        peer.sees_eof().await
    })
    .await;

    let err = run_operation(&config(port, None), &Operation::CaptureScreen)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
    assert!(err.to_string().contains("16"), "{err}");
    assert!(server.await.unwrap());
}

#[tokio::test]
async fn test_auth_rejected_closes_connection() {
    let (port, server) = spawn_server(|mut peer| async move {
        let matched = peer.vnc_auth(b"secret", 1).await;
        (matched, peer.sees_eof().await)
    })
    .await;

    let err = run_operation(&config(port, Some("secret")), &Operation::CaptureScreen)
        .await
        .unwrap_err();
    match &err {
        RfbClientError::Authentication { code, reason } => {
            assert_eq!(*code, 1);
            assert_eq!(reason.as_deref(), Some("authentication failed"));
        }
        other => panic!("expected authentication error, got {other:?}"),
    }
    assert_eq!(err.kind(), ErrorKind::Authentication);

    let (matched, eof) = server.await.unwrap();
    assert!(matched, "challenge response did not match the password");
    assert!(eof, "connection left open after authentication failure");
}

#[tokio::test]
async fn test_vnc_auth_then_click() {
    let (port, server) = spawn_server(|mut peer| async move {
        assert!(peer.vnc_auth(b"secret", 0).await);
        peer.finish_init(1366, 768).await;
        peer.drain().await
    })
    .await;

    let op = Operation::Click {
        x: 100,
        y: 200,
        button: 1,
        source_width: 1366,
        source_height: 768,
    };
    run_operation(&config(port, Some("secret")), &op)
        .await
        .unwrap();

    assert_eq!(
        server.await.unwrap(),
        vec![
            ClientMessage::PointerEvent(PointerEvent {
                button_mask: 1,
                x: 100,
                y: 200
            }),
            ClientMessage::PointerEvent(PointerEvent {
                button_mask: 0,
                x: 100,
                y: 200
            }),
        ]
    );
}

#[tokio::test]
async fn test_batch_stops_at_failure() {
    let (port, server) = spawn_server(|mut peer| async move {
        peer.handshake_none(1366, 768).await;
        peer.drain().await
    })
    .await;

    let actions: Vec<Action> = serde_json::from_str(
        r#"[
            {"type": "click", "x": 10, "y": 10},
            {"type": "click", "x": 20, "y": 20, "source_width": -5, "source_height": -5},
            {"type": "keys", "text": "never"}
        ]"#,
    )
    .unwrap();
    let op = Operation::BatchActions {
        actions,
        source_width: 1366,
        source_height: 768,
    };

    let outcome = run_operation(&config(port, None), &op).await.unwrap();
    let OperationOutcome::Batch { actions: result } = outcome else {
        panic!("expected batch outcome, got {outcome:?}");
    };
    let outcomes: Vec<_> = result.outcomes().cloned().collect();
    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0], ActionOutcome::Success);
    assert!(matches!(
        outcomes[1],
        ActionOutcome::Failure {
            kind: ErrorKind::Action,
            ..
        }
    ));
    assert_eq!(outcomes[2], ActionOutcome::NotAttempted);

    // Nothing after the first click reached the server.
    let seen = server.await.unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen
        .iter()
        .all(|m| matches!(m, ClientMessage::PointerEvent(_))));
}

#[tokio::test]
async fn test_ctrl_alt_delete_ordering() {
    let (port, server) = spawn_server(|mut peer| async move {
        peer.handshake_none(1024, 768).await;
        peer.drain().await
    })
    .await;

    let op = Operation::SendKeys {
        text: None,
        special_key: None,
        key_combination: Some("ctrl+alt+delete".to_string()),
    };
    run_operation(&config(port, None), &op).await.unwrap();

    let key = |key, down| ClientMessage::KeyEvent(KeyEvent { down, key });
    assert_eq!(
        server.await.unwrap(),
        vec![
            key(0xffe3, true),
            key(0xffe9, true),
            key(0xffff, true),
            key(0xffff, false),
            key(0xffe9, false),
            key(0xffe3, false),
        ]
    );
}

#[tokio::test]
async fn test_unsupported_version_is_protocol_error() {
    let (port, server) = spawn_server(|mut peer| async move {
        peer.output.write_bytes(b"RFB 009.000\n");
        peer.output.flush().await.unwrap();
        peer.sees_eof().await
    })
    .await;

    let err = run_operation(&config(port, None), &Operation::CaptureScreen)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert!(server.await.unwrap());
}

#[tokio::test]
async fn test_connection_refused() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let err = run_operation(&config(port, None), &Operation::CaptureScreen)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_silent_server_times_out() {
    let (port, server) = spawn_server(|mut peer| async move { peer.sees_eof().await }).await;

    let config = rfb_client::Config::builder()
        .host("127.0.0.1")
        .port(port)
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let err = run_operation(&config, &Operation::CaptureScreen)
        .await
        .unwrap_err();
    assert!(matches!(err, RfbClientError::Timeout(_)), "{err:?}");
    assert!(server.await.unwrap());
}

#[tokio::test]
async fn test_cancel_closes_transport() {
    let (port, server) = spawn_server(|mut peer| async move { peer.sees_eof().await }).await;

    let handle = spawn_operation(config(port, None), Operation::CaptureScreen);
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.cancel();

    assert!(matches!(
        handle.join().await,
        Err(RfbClientError::Cancelled)
    ));
    let eof = tokio::time::timeout(Duration::from_secs(1), server)
        .await
        .expect("server never saw the socket close")
        .unwrap();
    assert!(eof);
}

#[tokio::test]
async fn test_concurrent_operations_are_independent() {
    // One server never answers; the other completes while the first is stuck.
    let (stuck_port, _stuck) =
        spawn_server(|mut peer| async move { peer.sees_eof().await }).await;
    let (port, server) = spawn_server(|mut peer| async move {
        peer.handshake_none(100, 100).await;
        peer.drain().await
    })
    .await;

    let stuck = spawn_operation(config(stuck_port, None), Operation::CaptureScreen);
    let quick = spawn_operation(
        config(port, None),
        Operation::Move {
            x: 0,
            y: 0,
            source_width: 100,
            source_height: 100,
        },
    );

    let outcome = quick.join().await.unwrap();
    assert!(matches!(outcome, OperationOutcome::Pointer { x: 0, y: 0, .. }));
    assert!(!stuck.is_finished());
    stuck.cancel();
    assert_eq!(server.await.unwrap().len(), 1);
}
