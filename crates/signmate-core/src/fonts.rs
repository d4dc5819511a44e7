//! Metrics for the standard-14 fonts used by typed signatures
//!
//! Only the printable ASCII range of WinAnsiEncoding is measured; anything
//! else is replaced with `?` both when measuring and when drawing, so the
//! box the user saw and the box we draw always agree.

use serde::{Deserialize, Serialize};

/// Glyph widths (1/1000 em) for Helvetica, codes 32..=126
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 32-47
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0-9
    278, 278, 584, 584, 584, 556, 1015, // : ; < = > ? @
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A-M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N-Z
    278, 278, 278, 469, 556, 333, // [ \ ] ^ _ `
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a-m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n-z
    334, 260, 334, 584, // { | } ~
];

/// Glyph widths (1/1000 em) for Times-Roman, codes 32..=126
const TIMES_WIDTHS: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278, // 32-47
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, // 0-9
    278, 278, 564, 564, 564, 444, 921, // : ; < = > ? @
    722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, // A-M
    722, 722, 556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, // N-Z
    333, 278, 333, 469, 500, 333, // [ \ ] ^ _ `
    444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, // a-m
    500, 500, 500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, // n-z
    480, 200, 480, 541, // { | } ~
];

const COURIER_WIDTH: u16 = 600;

/// Standard fonts available for typed signatures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StandardFont {
    #[default]
    Helvetica,
    TimesRoman,
    Courier,
}

impl StandardFont {
    /// PostScript name used as `/BaseFont`
    pub fn base_font(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::TimesRoman => "Times-Roman",
            StandardFont::Courier => "Courier",
        }
    }

    /// Ascender in 1/1000 em
    pub fn ascent(&self) -> f64 {
        match self {
            StandardFont::Helvetica => 718.0,
            StandardFont::TimesRoman => 683.0,
            StandardFont::Courier => 629.0,
        }
    }

    /// Descender in 1/1000 em (negative)
    pub fn descent(&self) -> f64 {
        match self {
            StandardFont::Helvetica => -207.0,
            StandardFont::TimesRoman => -217.0,
            StandardFont::Courier => -157.0,
        }
    }

    /// Height of one line of text at `size`, from descender to ascender.
    pub fn line_height(&self, size: f64) -> f64 {
        (self.ascent() - self.descent()) / 1000.0 * size
    }

    /// Distance from the bottom of the line box up to the baseline.
    pub fn baseline_offset(&self, size: f64) -> f64 {
        -self.descent() / 1000.0 * size
    }

    /// Advance width of `text` at `size`
    pub fn text_width(&self, text: &str, size: f64) -> f64 {
        let units: u32 = encode_win_ansi(text)
            .iter()
            .map(|&b| self.glyph_width(b) as u32)
            .sum();
        units as f64 / 1000.0 * size
    }

    fn glyph_width(&self, code: u8) -> u16 {
        let idx = (code - 32) as usize;
        match self {
            StandardFont::Helvetica => HELVETICA_WIDTHS[idx],
            StandardFont::TimesRoman => TIMES_WIDTHS[idx],
            StandardFont::Courier => COURIER_WIDTH,
        }
    }

    /// Resolve a loose font family name ("Arial", "serif", "monospace", ...)
    pub fn from_family(name: &str) -> Self {
        let lower = name.to_lowercase();

        match lower.as_str() {
            "serif" => return StandardFont::TimesRoman,
            "monospace" => return StandardFont::Courier,
            _ => {}
        }

        if lower.contains("times") || lower.contains("georgia") || lower.contains("garamond") {
            return StandardFont::TimesRoman;
        }
        if lower.contains("courier") || lower.contains("mono") || lower.contains("consolas") {
            return StandardFont::Courier;
        }

        StandardFont::Helvetica
    }
}

/// Encode text as printable WinAnsi bytes; anything outside 32..=126 and
/// control characters become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            _ => b'?',
        })
        .collect()
}
