//! Coordinate transformation between preview space and native PDF space
//!
//! Preview space is what the user saw: origin top-left, Y growing downward,
//! units are pixels at the rendered width. Native space is the page's own
//! coordinate system: origin bottom-left, Y growing upward, units are points.

use crate::error::{Result, SignError};
use serde::{Deserialize, Serialize};

/// Native page box of a single page, in points.
///
/// `origin_x`/`origin_y` are the lower-left corner of the MediaBox; for
/// almost every PDF this is `(0, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub origin_x: f64,
    pub origin_y: f64,
    pub width: f64,
    pub height: f64,
}

impl PageGeometry {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            origin_x: 0.0,
            origin_y: 0.0,
            width,
            height,
        }
    }

    /// Build from a MediaBox given as `[x, y, width, height]`
    pub fn from_media_box(media_box: [f64; 4]) -> Self {
        let [origin_x, origin_y, width, height] = media_box;
        Self {
            origin_x,
            origin_y,
            width,
            height,
        }
    }

    pub fn letter() -> Self {
        Self::new(612.0, 792.0)
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.height / self.width
    }
}

/// Axis-aligned rectangle in preview pixels, anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreviewRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Draw parameters in native points, anchored at the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NativeRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Independent horizontal and vertical scale factors from preview to native.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub x: f64,
    pub y: f64,
}

impl Scale {
    /// Compute `Wn / Wp` and `Hn / Hp`.
    ///
    /// Fails with `InvalidState` when the preview has not been measured yet
    /// (zero, negative or non-finite size) instead of producing Infinity/NaN.
    pub fn between(preview_width: f64, preview_height: f64, page: &PageGeometry) -> Result<Self> {
        if !is_positive(preview_width) || !is_positive(preview_height) {
            return Err(SignError::invalid_state(format!(
                "preview size {}x{} is not usable; render the page first",
                preview_width, preview_height
            )));
        }
        if !is_positive(page.width) || !is_positive(page.height) {
            return Err(SignError::invalid_state(format!(
                "native page size {}x{} is not usable",
                page.width, page.height
            )));
        }
        Ok(Self {
            x: page.width / preview_width,
            y: page.height / preview_height,
        })
    }
}

fn is_positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

/// Map a preview-space rectangle onto the native page.
///
/// The overlay height is part of the vertical shift so that the visual top
/// edge, not the bottom, lines up with what the preview showed.
pub fn preview_to_native(
    preview_width: f64,
    preview_height: f64,
    page: &PageGeometry,
    rect: PreviewRect,
) -> Result<NativeRect> {
    let scale = Scale::between(preview_width, preview_height, page)?;
    if ![rect.x, rect.y, rect.width, rect.height]
        .iter()
        .all(|v| v.is_finite())
    {
        return Err(SignError::invalid_state(format!(
            "overlay placement {:?} contains non-finite values",
            rect
        )));
    }

    let height = rect.height * scale.y;
    let native = NativeRect {
        x: page.origin_x + rect.x * scale.x,
        y: page.origin_y + page.height - (rect.y * scale.y) - height,
        width: rect.width * scale.x,
        height,
    };

    tracing::debug!(
        scale_x = scale.x,
        scale_y = scale.y,
        ?rect,
        ?native,
        "mapped overlay to native space"
    );

    Ok(native)
}

/// Inverse of [`preview_to_native`].
pub fn native_to_preview(
    preview_width: f64,
    preview_height: f64,
    page: &PageGeometry,
    rect: NativeRect,
) -> Result<PreviewRect> {
    let scale = Scale::between(preview_width, preview_height, page)?;

    let top = page.height - (rect.y - page.origin_y) - rect.height;
    Ok(PreviewRect {
        x: (rect.x - page.origin_x) / scale.x,
        y: top / scale.y,
        width: rect.width / scale.x,
        height: rect.height / scale.y,
    })
}
