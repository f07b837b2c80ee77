//! Key names, modifiers and characters to X11 keysyms.
//!
//! Names are matched case-insensitively. Characters outside Latin-1 use the
//! `0x0100_0000 | code point` Unicode keysym range.

use crate::errors::RfbClientError;

pub const XK_BACKSPACE: u32 = 0xff08;
pub const XK_TAB: u32 = 0xff09;
pub const XK_RETURN: u32 = 0xff0d;
pub const XK_ESCAPE: u32 = 0xff1b;
pub const XK_HOME: u32 = 0xff50;
pub const XK_LEFT: u32 = 0xff51;
pub const XK_UP: u32 = 0xff52;
pub const XK_RIGHT: u32 = 0xff53;
pub const XK_DOWN: u32 = 0xff54;
pub const XK_PAGE_UP: u32 = 0xff55;
pub const XK_PAGE_DOWN: u32 = 0xff56;
pub const XK_END: u32 = 0xff57;
pub const XK_INSERT: u32 = 0xff63;
pub const XK_F1: u32 = 0xffbe;
pub const XK_SHIFT_L: u32 = 0xffe1;
pub const XK_CONTROL_L: u32 = 0xffe3;
pub const XK_META_L: u32 = 0xffe7;
pub const XK_ALT_L: u32 = 0xffe9;
pub const XK_DELETE: u32 = 0xffff;
pub const XK_SPACE: u32 = 0x0020;

const UNICODE_KEYSYM_BASE: u32 = 0x0100_0000;

/// Keysym for a named non-character key such as `enter` or `f5`.
pub fn special_key(name: &str) -> Option<u32> {
    let name = name.trim().to_ascii_lowercase();
    let keysym = match name.as_str() {
        "enter" | "return" => XK_RETURN,
        "backspace" => XK_BACKSPACE,
        "tab" => XK_TAB,
        "escape" | "esc" => XK_ESCAPE,
        "delete" | "del" => XK_DELETE,
        "insert" => XK_INSERT,
        "home" => XK_HOME,
        "end" => XK_END,
        "page_up" => XK_PAGE_UP,
        "page_down" => XK_PAGE_DOWN,
        "left" => XK_LEFT,
        "up" => XK_UP,
        "right" => XK_RIGHT,
        "down" => XK_DOWN,
        "space" => XK_SPACE,
        other => return function_key(other),
    };
    Some(keysym)
}

fn function_key(name: &str) -> Option<u32> {
    let n: u32 = name.strip_prefix('f')?.parse().ok()?;
    (1..=12).contains(&n).then(|| XK_F1 + n - 1)
}

/// Keysym for a modifier name such as `ctrl` or `cmd`.
pub fn modifier(name: &str) -> Option<u32> {
    match name.trim().to_ascii_lowercase().as_str() {
        "ctrl" | "control" => Some(XK_CONTROL_L),
        "shift" => Some(XK_SHIFT_L),
        "alt" | "option" => Some(XK_ALT_L),
        "cmd" | "command" | "win" | "super" | "meta" => Some(XK_META_L),
        _ => None,
    }
}

/// Keysym for one typed character.
pub fn char_keysym(c: char) -> u32 {
    match c {
        '\n' | '\r' => XK_RETURN,
        '\t' => XK_TAB,
        '\u{8}' => XK_BACKSPACE,
        c if u32::from(c) <= 0xff => u32::from(c),
        c => UNICODE_KEYSYM_BASE | u32::from(c),
    }
}

/// A parsed `mod+mod+key` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCombination {
    /// Modifier keysyms in press order.
    pub modifiers: Vec<u32>,
    /// The final key.
    pub key: u32,
}

impl KeyCombination {
    /// Parse a combination like `ctrl+alt+delete` or `cmd+Q`.
    ///
    /// Every token but the last must be a modifier. The last may be a
    /// modifier, a special key name or a single character.
    pub fn parse(combo: &str) -> Result<Self, RfbClientError> {
        let tokens: Vec<&str> = combo.split('+').map(str::trim).collect();
        if tokens.iter().any(|t| t.is_empty()) {
            return Err(RfbClientError::Action(format!(
                "malformed key combination '{combo}'"
            )));
        }
        let Some((last, leading)) = tokens.split_last() else {
            return Err(RfbClientError::Action("empty key combination".to_string()));
        };

        let modifiers = leading
            .iter()
            .map(|token| {
                modifier(token).ok_or_else(|| {
                    RfbClientError::Action(format!(
                        "unknown modifier '{token}' in key combination '{combo}'"
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let key = modifier(last)
            .or_else(|| special_key(last))
            .or_else(|| single_char(last).map(|c| char_keysym(c.to_ascii_lowercase())))
            .ok_or_else(|| {
                RfbClientError::Action(format!(
                    "unknown key '{last}' in key combination '{combo}'"
                ))
            })?;

        Ok(Self { modifiers, key })
    }
}

fn single_char(token: &str) -> Option<char> {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}
