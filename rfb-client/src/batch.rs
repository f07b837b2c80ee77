//! Ordered multi-action execution over one session.
//!
//! Every coordinate is scaled exactly once, right before the injector call.
//! The first failing action stops the batch; everything after it is reported
//! as not attempted and never reaches the wire.

use crate::errors::{ErrorKind, RfbClientError};
use crate::input::{InputInjector, MouseButton, ScrollDirection};
use crate::keymap::{self, KeyCombination};
use crate::scaling::CoordinateScaler;
use crate::session::Session;
use rfb_common::SourceResolution;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};

fn default_button() -> u8 {
    1
}

/// One step of a batch, in the caller's reference resolution.
///
/// Pointer actions may override the batch-level source resolution with
/// their own `source_width` / `source_height`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Click {
        x: i32,
        y: i32,
        #[serde(default = "default_button")]
        button: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_width: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_height: Option<i32>,
    },
    Keys {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        special_key: Option<String>,
    },
    KeyCombination {
        key_combination: String,
    },
    Drag {
        start_x: i32,
        start_y: i32,
        end_x: i32,
        end_y: i32,
        #[serde(default = "default_button")]
        button: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_width: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_height: Option<i32>,
    },
    #[serde(rename = "mouse_scroll", alias = "scroll")]
    Scroll {
        x: i32,
        y: i32,
        #[serde(default)]
        direction: ScrollDirection,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_width: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_height: Option<i32>,
    },
}

impl Action {
    /// Short name for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Click { .. } => "click",
            Self::Keys { .. } => "keys",
            Self::KeyCombination { .. } => "key_combination",
            Self::Drag { .. } => "drag",
            Self::Scroll { .. } => "mouse_scroll",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionOutcome {
    Success,
    Failure { reason: String, kind: ErrorKind },
    NotAttempted,
}

impl ActionOutcome {
    fn failure(err: &RfbClientError) -> Self {
        Self::Failure {
            reason: err.to_string(),
            kind: err.kind(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionReport {
    pub index: usize,
    pub outcome: ActionOutcome,
}

/// Per-action outcomes in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BatchResult {
    reports: Vec<ActionReport>,
}

impl BatchResult {
    pub fn reports(&self) -> &[ActionReport] {
        &self.reports
    }

    pub fn outcomes(&self) -> impl Iterator<Item = &ActionOutcome> {
        self.reports.iter().map(|r| &r.outcome)
    }

    /// True when every action succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.outcomes().all(|o| *o == ActionOutcome::Success)
    }

    /// Index and outcome of the action that stopped the batch, if any.
    pub fn first_failure(&self) -> Option<&ActionReport> {
        self.reports
            .iter()
            .find(|r| matches!(r.outcome, ActionOutcome::Failure { .. }))
    }

    fn push(&mut self, index: usize, outcome: ActionOutcome) {
        self.reports.push(ActionReport { index, outcome });
    }
}

/// Run `actions` in order against a ready session.
///
/// Action failures are recorded in the result, not returned. An empty
/// action list is an error, and so is any failure of the connection itself:
/// a dead session fails the whole call instead of reporting a partial batch.
pub async fn execute_batch<S: AsyncRead + AsyncWrite>(
    session: &mut Session<S>,
    actions: &[Action],
    source: SourceResolution,
) -> Result<BatchResult, RfbClientError> {
    if actions.is_empty() {
        return Err(RfbClientError::Action("batch contains no actions".to_string()));
    }

    let mut result = BatchResult::default();
    let mut aborted = false;
    for (index, action) in actions.iter().enumerate() {
        if aborted {
            result.push(index, ActionOutcome::NotAttempted);
            continue;
        }
        match execute_action(session, action, source).await {
            Ok(()) => {
                tracing::debug!("batch action {} ({}) ok", index, action.label());
                result.push(index, ActionOutcome::Success);
            }
            Err(e) if e.kind() == ErrorKind::Connection => {
                tracing::warn!(
                    "batch action {} ({}) lost the connection: {}",
                    index,
                    action.label(),
                    e
                );
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(
                    "batch action {} ({}) failed, skipping {} remaining: {}",
                    index,
                    action.label(),
                    actions.len() - index - 1,
                    e
                );
                result.push(index, ActionOutcome::failure(&e));
                aborted = true;
            }
        }
    }
    Ok(result)
}

fn resolution(
    base: SourceResolution,
    width: Option<i32>,
    height: Option<i32>,
) -> SourceResolution {
    SourceResolution::new(width.unwrap_or(base.width), height.unwrap_or(base.height))
}

/// Translate one action into injector calls. Names and scaling are resolved
/// before the first PDU is sent.
async fn execute_action<S: AsyncRead + AsyncWrite>(
    session: &mut Session<S>,
    action: &Action,
    source: SourceResolution,
) -> Result<(), RfbClientError> {
    let geometry = session.geometry();
    match action {
        Action::Click {
            x,
            y,
            button,
            source_width,
            source_height,
        } => {
            let button = MouseButton::from_number(*button)?;
            let scaler = CoordinateScaler::for_screen(
                resolution(source, *source_width, *source_height),
                geometry,
            )?;
            let (x, y) = scaler.scale(*x, *y);
            InputInjector::new(session).click(x, y, button).await
        }
        Action::Keys { text, special_key } => {
            let keysym = special_key
                .as_deref()
                .map(|name| {
                    keymap::special_key(name).ok_or_else(|| {
                        RfbClientError::Action(format!("unknown special key '{name}'"))
                    })
                })
                .transpose()?;
            if text.is_none() && keysym.is_none() {
                return Err(RfbClientError::Action(
                    "keys action needs text or special_key".to_string(),
                ));
            }
            let mut input = InputInjector::new(session);
            if let Some(text) = text {
                input.type_text(text).await?;
            }
            if let Some(keysym) = keysym {
                input.tap(keysym).await?;
            }
            Ok(())
        }
        Action::KeyCombination { key_combination } => {
            let combo = KeyCombination::parse(key_combination)?;
            InputInjector::new(session).key_combination(&combo).await
        }
        Action::Drag {
            start_x,
            start_y,
            end_x,
            end_y,
            button,
            source_width,
            source_height,
        } => {
            let button = MouseButton::from_number(*button)?;
            let scaler = CoordinateScaler::for_screen(
                resolution(source, *source_width, *source_height),
                geometry,
            )?;
            let start = scaler.scale(*start_x, *start_y);
            let end = scaler.scale(*end_x, *end_y);
            InputInjector::new(session).drag(start, end, button).await
        }
        Action::Scroll {
            x,
            y,
            direction,
            source_width,
            source_height,
        } => {
            let scaler = CoordinateScaler::for_screen(
                resolution(source, *source_width, *source_height),
                geometry,
            )?;
            let (x, y) = scaler.scale(*x, *y);
            InputInjector::new(session).scroll(x, y, *direction).await
        }
    }
}
