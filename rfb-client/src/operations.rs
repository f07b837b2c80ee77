//! Named operations exposed to the dispatch layer.
//!
//! Each [`Operation`] is one complete call: connect, authenticate, operate,
//! close. [`spawn_operation`] runs that sequence on its own task so one slow
//! server never holds up another call on the same runtime.

use crate::batch::{execute_batch, Action, BatchResult};
use crate::config::Config;
use crate::errors::RfbClientError;
use crate::input::{InputInjector, MouseButton, ScrollDirection};
use crate::keymap::{self, KeyCombination};
use crate::scaling::CoordinateScaler;
use crate::session::Session;
use image::ImageEncoder;
use rfb_common::{SourceResolution, DEFAULT_SOURCE_HEIGHT, DEFAULT_SOURCE_WIDTH};
use rfb_pixelbuffer::FramebufferImage;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::{AbortHandle, JoinHandle};

fn default_source_width() -> i32 {
    DEFAULT_SOURCE_WIDTH
}

fn default_source_height() -> i32 {
    DEFAULT_SOURCE_HEIGHT
}

fn default_button() -> u8 {
    1
}

/// Every operation a caller can request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Operation {
    CaptureScreen,
    Move {
        x: i32,
        y: i32,
        #[serde(default = "default_source_width")]
        source_width: i32,
        #[serde(default = "default_source_height")]
        source_height: i32,
    },
    Click {
        x: i32,
        y: i32,
        #[serde(default = "default_button")]
        button: u8,
        #[serde(default = "default_source_width")]
        source_width: i32,
        #[serde(default = "default_source_height")]
        source_height: i32,
    },
    DoubleClick {
        x: i32,
        y: i32,
        #[serde(default = "default_button")]
        button: u8,
        #[serde(default = "default_source_width")]
        source_width: i32,
        #[serde(default = "default_source_height")]
        source_height: i32,
    },
    Scroll {
        x: i32,
        y: i32,
        #[serde(default)]
        direction: ScrollDirection,
        #[serde(default = "default_source_width")]
        source_width: i32,
        #[serde(default = "default_source_height")]
        source_height: i32,
    },
    SendKeys {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        special_key: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key_combination: Option<String>,
    },
    BatchActions {
        actions: Vec<Action>,
        #[serde(default = "default_source_width")]
        source_width: i32,
        #[serde(default = "default_source_height")]
        source_height: i32,
    },
}

/// What a successful operation produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum OperationOutcome {
    /// A PNG of the whole remote screen.
    Screen {
        width: u32,
        height: u32,
        #[serde(skip)]
        png: Vec<u8>,
    },
    /// Where the pointer ended up, in remote pixels.
    Pointer {
        x: u16,
        y: u16,
        scaled_from: SourceResolution,
    },
    Keys {
        sent: Vec<String>,
    },
    Batch {
        actions: BatchResult,
    },
}

/// Names and combinations resolved before any key goes out.
enum KeyStep {
    Text(String),
    Special(String, u32),
    Combination(String, KeyCombination),
}

impl Operation {
    /// Wire name, as used in the `operation` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CaptureScreen => "capture_screen",
            Self::Move { .. } => "move",
            Self::Click { .. } => "click",
            Self::DoubleClick { .. } => "double_click",
            Self::Scroll { .. } => "scroll",
            Self::SendKeys { .. } => "send_keys",
            Self::BatchActions { .. } => "batch_actions",
        }
    }

    /// Run this operation against a ready session.
    pub async fn execute<S: AsyncRead + AsyncWrite>(
        &self,
        session: &mut Session<S>,
    ) -> Result<OperationOutcome, RfbClientError> {
        match self {
            Self::CaptureScreen => {
                let image = session.capture().await?;
                let (width, height) = (image.width(), image.height());
                let png = encode_png(&image)?;
                Ok(OperationOutcome::Screen { width, height, png })
            }
            Self::Move {
                x,
                y,
                source_width,
                source_height,
            } => {
                let source = SourceResolution::new(*source_width, *source_height);
                let (x, y) = scale_point(session, source, *x, *y)?;
                InputInjector::new(session).move_to(x, y).await?;
                Ok(OperationOutcome::Pointer {
                    x,
                    y,
                    scaled_from: source,
                })
            }
            Self::Click {
                x,
                y,
                button,
                source_width,
                source_height,
            } => {
                let button = MouseButton::from_number(*button)?;
                let source = SourceResolution::new(*source_width, *source_height);
                let (x, y) = scale_point(session, source, *x, *y)?;
                InputInjector::new(session).click(x, y, button).await?;
                Ok(OperationOutcome::Pointer {
                    x,
                    y,
                    scaled_from: source,
                })
            }
            Self::DoubleClick {
                x,
                y,
                button,
                source_width,
                source_height,
            } => {
                let button = MouseButton::from_number(*button)?;
                let source = SourceResolution::new(*source_width, *source_height);
                let (x, y) = scale_point(session, source, *x, *y)?;
                InputInjector::new(session)
                    .double_click(x, y, button)
                    .await?;
                Ok(OperationOutcome::Pointer {
                    x,
                    y,
                    scaled_from: source,
                })
            }
            Self::Scroll {
                x,
                y,
                direction,
                source_width,
                source_height,
            } => {
                let source = SourceResolution::new(*source_width, *source_height);
                let (x, y) = scale_point(session, source, *x, *y)?;
                InputInjector::new(session).scroll(x, y, *direction).await?;
                Ok(OperationOutcome::Pointer {
                    x,
                    y,
                    scaled_from: source,
                })
            }
            Self::SendKeys {
                text,
                special_key,
                key_combination,
            } => {
                let steps = resolve_keys(
                    text.as_deref(),
                    special_key.as_deref(),
                    key_combination.as_deref(),
                )?;
                let mut input = InputInjector::new(session);
                let mut sent = Vec::with_capacity(steps.len());
                for step in steps {
                    match step {
                        KeyStep::Text(text) => {
                            input.type_text(&text).await?;
                            sent.push(format!("text: {text}"));
                        }
                        KeyStep::Special(name, keysym) => {
                            input.tap(keysym).await?;
                            sent.push(format!("special_key: {name}"));
                        }
                        KeyStep::Combination(combo_str, combo) => {
                            input.key_combination(&combo).await?;
                            sent.push(format!("key_combination: {combo_str}"));
                        }
                    }
                }
                Ok(OperationOutcome::Keys { sent })
            }
            Self::BatchActions {
                actions,
                source_width,
                source_height,
            } => {
                let source = SourceResolution::new(*source_width, *source_height);
                let actions = execute_batch(session, actions, source).await?;
                Ok(OperationOutcome::Batch { actions })
            }
        }
    }
}

fn scale_point<S>(
    session: &Session<S>,
    source: SourceResolution,
    x: i32,
    y: i32,
) -> Result<(u16, u16), RfbClientError>
where
    S: AsyncRead + AsyncWrite,
{
    let scaler = CoordinateScaler::for_screen(source, session.geometry())?;
    let (sx, sy) = scaler.scale(x, y);
    tracing::debug!(
        "Scaled ({}, {}) from {} to ({}, {}) on {}",
        x,
        y,
        source,
        sx,
        sy,
        session.geometry()
    );
    Ok((sx, sy))
}

fn resolve_keys(
    text: Option<&str>,
    special_key: Option<&str>,
    key_combination: Option<&str>,
) -> Result<Vec<KeyStep>, RfbClientError> {
    let mut steps = Vec::new();
    if let Some(text) = text {
        steps.push(KeyStep::Text(text.to_string()));
    }
    if let Some(name) = special_key {
        let keysym = keymap::special_key(name)
            .ok_or_else(|| RfbClientError::Action(format!("unknown special key '{name}'")))?;
        steps.push(KeyStep::Special(name.to_string(), keysym));
    }
    if let Some(combo) = key_combination {
        steps.push(KeyStep::Combination(
            combo.to_string(),
            KeyCombination::parse(combo)?,
        ));
    }
    if steps.is_empty() {
        return Err(RfbClientError::Action(
            "send_keys needs text, special_key or key_combination".to_string(),
        ));
    }
    Ok(steps)
}

/// Encode an assembled framebuffer as PNG.
pub fn encode_png(image: &FramebufferImage) -> Result<Vec<u8>, RfbClientError> {
    let mut png = Vec::new();
    image::codecs::png::PngEncoder::new(&mut png)
        .write_image(
            image.rgba(),
            image.width(),
            image.height(),
            image::ColorType::Rgba8,
        )
        .map_err(|e| RfbClientError::Decode(format!("PNG encoding failed: {e}")))?;
    Ok(png)
}

/// Connect, run one operation, close.
///
/// The session is closed on every path, including when the operation fails.
pub async fn run_operation(
    config: &Config,
    operation: &Operation,
) -> Result<OperationOutcome, RfbClientError> {
    tracing::info!("Running {} against {}", operation.name(), config.address());
    let mut session = Session::connect(config).await?;
    let result = operation.execute(&mut session).await;
    session.close().await;
    match &result {
        Ok(_) => tracing::info!("{} finished", operation.name()),
        Err(e) => tracing::warn!("{} failed: {}", operation.name(), e),
    }
    result
}

/// A running operation on its own task.
pub struct OperationHandle {
    task: JoinHandle<Result<OperationOutcome, RfbClientError>>,
}

impl OperationHandle {
    /// Abort the task. Dropping it drops the session, which closes the socket.
    pub fn cancel(&self) {
        self.task.abort();
    }

    /// A detached way to cancel, usable while [`Self::join`] is pending.
    pub fn abort_handle(&self) -> AbortHandle {
        self.task.abort_handle()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the outcome.
    ///
    /// Returns [`RfbClientError::Cancelled`] when the task was aborted.
    pub async fn join(self) -> Result<OperationOutcome, RfbClientError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(RfbClientError::Cancelled),
            Err(e) => std::panic::resume_unwind(e.into_panic()),
        }
    }
}

/// Run [`run_operation`] on a new task.
pub fn spawn_operation(config: Config, operation: Operation) -> OperationHandle {
    let task = tokio::spawn(async move { run_operation(&config, &operation).await });
    OperationHandle { task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::test_support::connected_pair;
    use pretty_assertions::assert_eq;
    use rfb_protocol::messages::{ClientMessage, KeyEvent, PointerEvent};

    #[test]
    fn test_operation_json_defaults() {
        let op: Operation =
            serde_json::from_str(r#"{"operation": "click", "x": 100, "y": 200}"#).unwrap();
        assert_eq!(
            op,
            Operation::Click {
                x: 100,
                y: 200,
                button: 1,
                source_width: 1366,
                source_height: 768,
            }
        );
        assert_eq!(op.name(), "click");

        let op: Operation = serde_json::from_str(r#"{"operation": "capture_screen"}"#).unwrap();
        assert_eq!(op, Operation::CaptureScreen);

        assert!(serde_json::from_str::<Operation>(r#"{"operation": "reboot"}"#).is_err());
    }

    #[test]
    fn test_outcome_json_omits_png() {
        let outcome = OperationOutcome::Screen {
            width: 2,
            height: 1,
            png: vec![1, 2, 3],
        };
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            serde_json::json!({"result": "screen", "width": 2, "height": 1})
        );
    }

    #[test]
    fn test_resolve_keys_requires_something() {
        assert!(matches!(
            resolve_keys(None, None, None),
            Err(RfbClientError::Action(_))
        ));
        assert!(matches!(
            resolve_keys(Some("x"), None, Some("ctrl+")),
            Err(RfbClientError::Action(_))
        ));
    }

    #[test]
    fn test_encode_png_signature() {
        let image = rfb_pixelbuffer::ManagedPixelBuffer::new(1, 1).into_image(vec![0]);
        let png = encode_png(&image).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[tokio::test]
    async fn test_click_scales_then_sends() {
        let (mut session, peer) = connected_pair(2732, 1536).await;
        let op = Operation::Click {
            x: 683,
            y: 384,
            button: 3,
            source_width: 1366,
            source_height: 768,
        };
        let outcome = op.execute(&mut session).await.unwrap();
        session.close().await;

        assert_eq!(
            outcome,
            OperationOutcome::Pointer {
                x: 1366,
                y: 768,
                scaled_from: SourceResolution::new(1366, 768),
            }
        );
        assert_eq!(
            peer.drain().await,
            vec![
                ClientMessage::PointerEvent(PointerEvent {
                    button_mask: 4,
                    x: 1366,
                    y: 768
                }),
                ClientMessage::PointerEvent(PointerEvent {
                    button_mask: 0,
                    x: 1366,
                    y: 768
                }),
            ]
        );
    }

    #[tokio::test]
    async fn test_zero_source_width_sends_nothing() {
        let (mut session, peer) = connected_pair(800, 600).await;
        let op = Operation::Move {
            x: 1,
            y: 1,
            source_width: 0,
            source_height: 768,
        };
        let err = op.execute(&mut session).await.unwrap_err();
        session.close().await;

        assert!(matches!(err, RfbClientError::Action(_)));
        assert!(peer.drain().await.is_empty());
    }

    #[tokio::test]
    async fn test_send_keys_order() {
        let (mut session, peer) = connected_pair(100, 100).await;
        let op = Operation::SendKeys {
            text: Some("a".to_string()),
            special_key: Some("tab".to_string()),
            key_combination: Some("ctrl+c".to_string()),
        };
        let outcome = op.execute(&mut session).await.unwrap();
        session.close().await;

        assert_eq!(
            outcome,
            OperationOutcome::Keys {
                sent: vec![
                    "text: a".to_string(),
                    "special_key: tab".to_string(),
                    "key_combination: ctrl+c".to_string(),
                ]
            }
        );

        let keys: Vec<(u32, bool)> = peer
            .drain()
            .await
            .into_iter()
            .map(|m| match m {
                ClientMessage::KeyEvent(KeyEvent { down, key }) => (key, down),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(
            keys,
            vec![
                (0x61, true),
                (0x61, false),
                (0xff09, true),
                (0xff09, false),
                (0xffe3, true),
                (0x63, true),
                (0x63, false),
                (0xffe3, false),
            ]
        );
    }
}
