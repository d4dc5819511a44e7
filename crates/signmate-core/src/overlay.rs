//! Signature overlays and the preview metrics they were placed against

use crate::coords::{preview_to_native, NativeRect, PageGeometry, PreviewRect};
use crate::embed::raster::SignatureImage;
use crate::error::Result;
use crate::fonts::StandardFont;
use serde::{Deserialize, Serialize};

/// Rendered size of one page as shown to the user.
///
/// `revision` increases every time the page is re-measured; an overlay
/// placed against an older revision is stale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreviewMetrics {
    pub width: f64,
    pub height: f64,
    pub revision: u64,
}

/// RGB colour with components in 0..=1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    /// Parse `#RRGGBB` or `RRGGBB`
    pub fn from_hex(color: &str) -> Option<Self> {
        let hex = color.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .ok()
                .map(|v| v as f32 / 255.0)
        };
        Some(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Rgb::BLACK
    }
}

/// A typed signature. `font_size` is in preview pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSignature {
    pub text: String,
    pub font: StandardFont,
    pub font_size: f64,
    pub color: Rgb,
}

/// A drawn/uploaded signature shown at `width` x `height` preview pixels.
#[derive(Debug, Clone)]
pub struct ImageSignature {
    pub image: SignatureImage,
    pub width: f64,
    pub height: f64,
}

impl ImageSignature {
    /// Size the image to `width` preview pixels keeping its aspect ratio.
    pub fn fit_width(image: SignatureImage, width: f64) -> Self {
        let height = width * image.height() as f64 / image.width() as f64;
        Self {
            image,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone)]
pub enum OverlayContent {
    Text(TextSignature),
    Image(ImageSignature),
}

/// One signature placement on one page.
#[derive(Debug, Clone)]
pub struct Overlay {
    /// 1-based page number
    pub page: u32,
    /// Top-left corner in preview pixels
    pub x: f64,
    pub y: f64,
    pub content: OverlayContent,
    /// Metrics of `page` at the time of placement
    pub preview: PreviewMetrics,
}

impl Overlay {
    pub fn new(page: u32, x: f64, y: f64, content: OverlayContent, preview: PreviewMetrics) -> Self {
        Self {
            page,
            x,
            y,
            content,
            preview,
        }
    }

    /// Size of the overlay in preview pixels.
    ///
    /// For text the height comes from the font's ascent/descent rather than
    /// from the caller, and the width from its glyph widths.
    pub fn preview_size(&self) -> (f64, f64) {
        match &self.content {
            OverlayContent::Text(t) => (
                t.font.text_width(&t.text, t.font_size),
                t.font.line_height(t.font_size),
            ),
            OverlayContent::Image(img) => (img.width, img.height),
        }
    }

    pub fn preview_rect(&self) -> PreviewRect {
        let (width, height) = self.preview_size();
        PreviewRect {
            x: self.x,
            y: self.y,
            width,
            height,
        }
    }

    /// Drag update
    pub fn move_to(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    /// Resize update. Images take the new box as-is; text keeps its font
    /// and scales the font size so the line height matches `height`.
    pub fn resize(&mut self, width: f64, height: f64) {
        match &mut self.content {
            OverlayContent::Image(img) => {
                img.width = width;
                img.height = height;
            }
            OverlayContent::Text(t) => {
                let unit = t.font.line_height(1.0);
                if unit > 0.0 {
                    t.font_size = height / unit;
                }
            }
        }
    }

    /// Re-derive the placement for a page that was re-rendered at a
    /// different size, keeping its relative position and size.
    pub fn rebase(&mut self, metrics: PreviewMetrics) {
        let sx = metrics.width / self.preview.width;
        let sy = metrics.height / self.preview.height;
        if sx.is_finite() && sy.is_finite() {
            self.x *= sx;
            self.y *= sy;
            match &mut self.content {
                OverlayContent::Image(img) => {
                    img.width *= sx;
                    img.height *= sy;
                }
                OverlayContent::Text(t) => t.font_size *= sy,
            }
        }
        self.preview = metrics;
    }

    /// Map this overlay onto its page using the metrics it was placed with.
    pub fn to_native(&self, page: &PageGeometry) -> Result<NativeRect> {
        preview_to_native(
            self.preview.width,
            self.preview.height,
            page,
            self.preview_rect(),
        )
    }
}
