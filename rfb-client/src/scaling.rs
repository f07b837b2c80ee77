//! Caller reference resolution to remote screen coordinates.

use crate::errors::RfbClientError;
use rfb_common::{ScreenGeometry, SourceResolution};

/// Maps points from a caller-declared resolution onto the remote screen.
///
/// Built once per action from the session's [`ScreenGeometry`], so a scaler
/// cannot exist before the remote size is known.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateScaler {
    source_width: f64,
    source_height: f64,
    actual_width: i64,
    actual_height: i64,
}

impl CoordinateScaler {
    /// # Errors
    ///
    /// [`RfbClientError::Action`] when any dimension is zero or negative.
    pub fn new(
        source_width: i32,
        source_height: i32,
        actual_width: i32,
        actual_height: i32,
    ) -> Result<Self, RfbClientError> {
        if source_width <= 0 || source_height <= 0 {
            return Err(RfbClientError::Action(format!(
                "source resolution must be positive, got {source_width}x{source_height}"
            )));
        }
        if actual_width <= 0 || actual_height <= 0 {
            return Err(RfbClientError::Action(format!(
                "remote resolution must be positive, got {actual_width}x{actual_height}"
            )));
        }
        Ok(Self {
            source_width: f64::from(source_width),
            source_height: f64::from(source_height),
            actual_width: i64::from(actual_width),
            actual_height: i64::from(actual_height),
        })
    }

    pub fn for_screen(
        source: SourceResolution,
        screen: ScreenGeometry,
    ) -> Result<Self, RfbClientError> {
        Self::new(
            source.width,
            source.height,
            i32::from(screen.width),
            i32::from(screen.height),
        )
    }

    /// Scale one point. Results are rounded half away from zero and clamped
    /// to the remote screen.
    pub fn scale(&self, x: i32, y: i32) -> (u16, u16) {
        (
            scale_axis(x, self.source_width, self.actual_width),
            scale_axis(y, self.source_height, self.actual_height),
        )
    }
}

fn scale_axis(value: i32, source: f64, actual: i64) -> u16 {
    let scaled = (f64::from(value) * actual as f64 / source).round();
    let max = (actual - 1).min(i64::from(u16::MAX)) as f64;
    scaled.clamp(0.0, max) as u16
}

/// One-shot form of [`CoordinateScaler::scale`].
pub fn scale(
    x: i32,
    y: i32,
    source_width: i32,
    source_height: i32,
    actual_width: i32,
    actual_height: i32,
) -> Result<(u16, u16), RfbClientError> {
    Ok(CoordinateScaler::new(source_width, source_height, actual_width, actual_height)?.scale(x, y))
}
