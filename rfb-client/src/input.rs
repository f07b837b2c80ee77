//! Pointer and keyboard injection over a ready [`Session`].
//!
//! All coordinates here are already in remote screen pixels. Scaling from
//! the caller's reference resolution happens once, before these calls.

use crate::errors::RfbClientError;
use crate::keymap::{self, KeyCombination};
use crate::session::Session;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tokio::io::{AsyncRead, AsyncWrite};

bitflags! {
    /// RFB pointer button mask (bits).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ButtonMask: u8 {
        const LEFT       = 1 << 0; // Button 1
        const MIDDLE     = 1 << 1; // Button 2
        const RIGHT      = 1 << 2; // Button 3
        const WHEEL_UP   = 1 << 3; // Button 4
        const WHEEL_DOWN = 1 << 4; // Button 5
    }
}

/// A clickable mouse button, numbered 1-3 the way callers send them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

impl MouseButton {
    /// # Errors
    ///
    /// [`RfbClientError::Action`] for anything but 1, 2 or 3.
    pub fn from_number(button: u8) -> Result<Self, RfbClientError> {
        match button {
            1 => Ok(Self::Left),
            2 => Ok(Self::Middle),
            3 => Ok(Self::Right),
            other => Err(RfbClientError::Action(format!(
                "invalid mouse button {other} (expected 1=left, 2=middle, 3=right)"
            ))),
        }
    }

    pub fn mask(self) -> ButtonMask {
        match self {
            Self::Left => ButtonMask::LEFT,
            Self::Middle => ButtonMask::MIDDLE,
            Self::Right => ButtonMask::RIGHT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    #[default]
    Down,
}

impl ScrollDirection {
    pub fn mask(self) -> ButtonMask {
        match self {
            Self::Up => ButtonMask::WHEEL_UP,
            Self::Down => ButtonMask::WHEEL_DOWN,
        }
    }
}

impl FromStr for ScrollDirection {
    type Err = RfbClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            other => Err(RfbClientError::Action(format!(
                "invalid scroll direction '{other}' (expected up or down)"
            ))),
        }
    }
}

/// Encodes pointer and key gestures as PDUs on one session.
pub struct InputInjector<'a, S> {
    session: &'a mut Session<S>,
}

impl<'a, S: AsyncRead + AsyncWrite> InputInjector<'a, S> {
    pub fn new(session: &'a mut Session<S>) -> Self {
        Self { session }
    }

    /// Move the pointer with no buttons held.
    pub async fn move_to(&mut self, x: u16, y: u16) -> Result<(), RfbClientError> {
        self.session.pointer_event(ButtonMask::empty(), x, y).await
    }

    /// Press and release `button` at one point.
    pub async fn click(&mut self, x: u16, y: u16, button: MouseButton) -> Result<(), RfbClientError> {
        self.session.pointer_event(button.mask(), x, y).await?;
        self.session.pointer_event(ButtonMask::empty(), x, y).await
    }

    /// Two clicks back to back, no delay in between.
    pub async fn double_click(
        &mut self,
        x: u16,
        y: u16,
        button: MouseButton,
    ) -> Result<(), RfbClientError> {
        self.click(x, y, button).await?;
        self.click(x, y, button).await
    }

    /// One wheel tick at a point.
    pub async fn scroll(
        &mut self,
        x: u16,
        y: u16,
        direction: ScrollDirection,
    ) -> Result<(), RfbClientError> {
        self.move_to(x, y).await?;
        self.session.pointer_event(direction.mask(), x, y).await?;
        self.session.pointer_event(ButtonMask::empty(), x, y).await
    }

    /// Press at `start`, move to `end` with the button held, release at `end`.
    pub async fn drag(
        &mut self,
        start: (u16, u16),
        end: (u16, u16),
        button: MouseButton,
    ) -> Result<(), RfbClientError> {
        let held = button.mask();
        self.move_to(start.0, start.1).await?;
        self.session.pointer_event(held, start.0, start.1).await?;
        self.session.pointer_event(held, end.0, end.1).await?;
        self.session
            .pointer_event(ButtonMask::empty(), end.0, end.1)
            .await
    }

    /// Press and release one key.
    pub async fn tap(&mut self, keysym: u32) -> Result<(), RfbClientError> {
        self.session.key_event(keysym, true).await?;
        self.session.key_event(keysym, false).await
    }

    /// Type text one code point at a time.
    pub async fn type_text(&mut self, text: &str) -> Result<(), RfbClientError> {
        for c in text.chars() {
            self.tap(keymap::char_keysym(c)).await?;
        }
        Ok(())
    }

    /// Press and release a named key such as `enter`.
    pub async fn special_key(&mut self, name: &str) -> Result<(), RfbClientError> {
        let keysym = keymap::special_key(name)
            .ok_or_else(|| RfbClientError::Action(format!("unknown special key '{name}'")))?;
        self.tap(keysym).await
    }

    /// Modifiers down left to right, key down and up, modifiers up right to left.
    ///
    /// Every modifier that went down gets a release attempt, even when an
    /// earlier step failed. The first error is returned.
    pub async fn key_combination(&mut self, combo: &KeyCombination) -> Result<(), RfbClientError> {
        let mut pressed = Vec::with_capacity(combo.modifiers.len());
        let mut result = Ok(());

        for &modifier in &combo.modifiers {
            match self.session.key_event(modifier, true).await {
                Ok(()) => pressed.push(modifier),
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        if result.is_ok() {
            result = self.tap(combo.key).await;
        }

        for &modifier in pressed.iter().rev() {
            if let Err(e) = self.session.key_event(modifier, false).await {
                tracing::warn!("failed to release modifier 0x{:X}: {}", modifier, e);
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }
}
