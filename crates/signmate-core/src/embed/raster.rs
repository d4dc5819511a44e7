//! Signature image decoding into PDF image XObject payloads

use crate::error::{Result, SignError};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use flate2::{write::ZlibEncoder, Compression};
use image::{GenericImageView, ImageFormat};
use std::io::Write;
use tracing::debug;

/// Image data ready to be written as an `/Image` XObject
#[derive(Debug, Clone)]
pub struct SignatureImage {
    width: u32,
    height: u32,
    color_space: &'static str,
    filter: &'static str,
    data: Vec<u8>,
    alpha: Option<Vec<u8>>,
}

impl SignatureImage {
    /// Decode PNG or JPEG bytes. Anything else is rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let format = image::guess_format(bytes).map_err(|_| {
            SignError::UnsupportedImageFormat("could not recognise image data".into())
        })?;

        match format {
            ImageFormat::Jpeg => Self::from_jpeg(bytes),
            ImageFormat::Png => Self::from_png(bytes),
            other => Err(SignError::UnsupportedImageFormat(format!(
                "{:?} (expected PNG or JPEG)",
                other
            ))),
        }
    }

    /// Accept a `data:image/...;base64,` URL as produced by a browser file reader.
    pub fn from_data_url(url: &str) -> Result<Self> {
        let (header, payload) = url
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(','))
            .ok_or_else(|| SignError::UnsupportedImageFormat("not a data URL".into()))?;

        if !header.ends_with(";base64") {
            return Err(SignError::UnsupportedImageFormat(
                "data URL is not base64 encoded".into(),
            ));
        }
        let bytes = BASE64
            .decode(payload.trim())
            .map_err(|e| SignError::UnsupportedImageFormat(format!("bad base64: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    fn from_jpeg(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)
            .map_err(|e| SignError::UnsupportedImageFormat(format!("invalid JPEG: {}", e)))?;
        let (width, height) = decoded.dimensions();

        // The decoder converts CMYK/YCCK to RGB, so the colour space of the
        // raw DCT stream has to come from the frame header instead.
        let color_space = match jpeg_components(bytes) {
            Some(1) => "DeviceGray",
            Some(3) => "DeviceRGB",
            components => {
                debug!(?components, "re-encoding JPEG that is not gray or RGB");
                return Ok(Self {
                    width,
                    height,
                    color_space: "DeviceRGB",
                    filter: "FlateDecode",
                    data: flate_compress(decoded.to_rgb8().as_raw())?,
                    alpha: None,
                });
            }
        };

        // Gray/RGB JPEG goes in untouched; PDF readers decode DCT natively
        Ok(Self {
            width,
            height,
            color_space,
            filter: "DCTDecode",
            data: bytes.to_vec(),
            alpha: None,
        })
    }

    fn from_png(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory_with_format(bytes, ImageFormat::Png)
            .map_err(|e| SignError::UnsupportedImageFormat(format!("invalid PNG: {}", e)))?;
        let (width, height) = decoded.dimensions();

        let rgba = decoded.to_rgba8();
        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        let mut alpha = Vec::with_capacity((width * height) as usize);
        let mut has_alpha = false;
        for pixel in rgba.pixels() {
            let [r, g, b, a] = pixel.0;
            has_alpha |= a != 255;
            rgb.extend_from_slice(&[r, g, b]);
            alpha.push(a);
        }

        Ok(Self {
            width,
            height,
            color_space: "DeviceRGB",
            filter: "FlateDecode",
            data: flate_compress(&rgb)?,
            alpha: if has_alpha {
                Some(flate_compress(&alpha)?)
            } else {
                None
            },
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn has_alpha(&self) -> bool {
        self.alpha.is_some()
    }

    pub(crate) fn color_space(&self) -> &'static str {
        self.color_space
    }

    pub(crate) fn filter(&self) -> &'static str {
        self.filter
    }

    pub(crate) fn data(&self) -> &[u8] {
        &self.data
    }

    /// Flate-compressed 8-bit alpha channel, if any pixel is not opaque
    pub(crate) fn alpha(&self) -> Option<&[u8]> {
        self.alpha.as_deref()
    }
}

/// Component count from the first SOFn frame header, `None` if the marker
/// stream ends (or reaches scan data) before one is found.
fn jpeg_components(bytes: &[u8]) -> Option<u8> {
    let mut pos = 2;
    while pos + 1 < bytes.len() {
        if bytes[pos] != 0xFF {
            return None;
        }
        let marker = bytes[pos + 1];
        pos += 2;
        match marker {
            // Fill bytes before a marker
            0xFF => pos -= 1,
            // Markers without a length field
            0x01 | 0xD0..=0xD7 => {}
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                // length(2) precision(1) height(2) width(2) components(1)
                return bytes.get(pos + 7).copied();
            }
            0xD9 | 0xDA => return None,
            _ => {
                let len = u16::from_be_bytes([*bytes.get(pos)?, *bytes.get(pos + 1)?]) as usize;
                pos += len;
            }
        }
    }
    None
}

fn flate_compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, Rgba};
    use std::io::Cursor;

    pub(crate) fn png_bytes(width: u32, height: u32, translucent: bool) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, _| {
            let a = if translucent && x == 0 { 0 } else { 255 };
            Rgba([10u8, 20, 30, a])
        });
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    pub(crate) fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |_, _| Rgb([200u8, 100, 50]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Jpeg).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_png_with_alpha_gets_mask() {
        let img = SignatureImage::from_bytes(&png_bytes(4, 2, true)).unwrap();
        assert_eq!((img.width(), img.height()), (4, 2));
        assert_eq!(img.filter(), "FlateDecode");
        assert!(img.has_alpha());
    }

    #[test]
    fn test_opaque_png_has_no_mask() {
        let img = SignatureImage::from_bytes(&png_bytes(3, 3, false)).unwrap();
        assert!(!img.has_alpha());
    }

    #[test]
    fn test_jpeg_is_passed_through() {
        let bytes = jpeg_bytes(8, 8);
        let img = SignatureImage::from_bytes(&bytes).unwrap();
        assert_eq!(img.filter(), "DCTDecode");
        assert_eq!(img.data(), bytes.as_slice());
        assert_eq!(img.color_space(), "DeviceRGB");
    }

    #[test]
    fn test_gray_jpeg_is_passed_through_as_gray() {
        let img = image::GrayImage::from_fn(4, 4, |x, _| image::Luma([x as u8 * 40]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Jpeg).unwrap();
        let bytes = out.into_inner();

        assert_eq!(jpeg_components(&bytes), Some(1));
        let img = SignatureImage::from_bytes(&bytes).unwrap();
        assert_eq!(img.color_space(), "DeviceGray");
        assert_eq!(img.filter(), "DCTDecode");
    }

    #[test]
    fn test_cmyk_jpeg_is_reencoded_as_rgb() {
        let (width, height) = (6u16, 4u16);
        let cmyk: Vec<u8> = (0..width as usize * height as usize)
            .flat_map(|i| [(i * 10) as u8, 40, 80, 0])
            .collect();
        let mut bytes = Vec::new();
        jpeg_encoder::Encoder::new(&mut bytes, 90)
            .encode(&cmyk, width, height, jpeg_encoder::ColorType::Cmyk)
            .unwrap();
        assert_eq!(jpeg_components(&bytes), Some(4));

        let img = SignatureImage::from_bytes(&bytes).unwrap();
        assert_eq!((img.width(), img.height()), (6, 4));
        // A 4-component DCT stream must never be labelled DeviceRGB
        assert_eq!(img.color_space(), "DeviceRGB");
        assert_eq!(img.filter(), "FlateDecode");
        assert_ne!(img.data(), bytes.as_slice());
    }

    #[test]
    fn test_jpeg_components_stops_at_truncation() {
        assert_eq!(jpeg_components(&[0xFF, 0xD8]), None);
        assert_eq!(jpeg_components(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00]), None);
        assert_eq!(jpeg_components(&jpeg_bytes(2, 2)), Some(3));
    }

    #[test]
    fn test_gif_is_unsupported() {
        let gif = b"GIF89a\x01\x00\x01\x00\x00\x00\x00;";
        let err = SignatureImage::from_bytes(gif).unwrap_err();
        assert!(matches!(err, SignError::UnsupportedImageFormat(_)));
    }

    #[test]
    fn test_random_bytes_are_unsupported() {
        let err = SignatureImage::from_bytes(b"definitely not an image").unwrap_err();
        assert!(matches!(err, SignError::UnsupportedImageFormat(_)));
    }

    #[test]
    fn test_data_url() {
        let url = format!("data:image/png;base64,{}", BASE64.encode(png_bytes(2, 2, false)));
        let img = SignatureImage::from_data_url(&url).unwrap();
        assert_eq!(img.width(), 2);

        assert!(SignatureImage::from_data_url("data:image/png,rawstuff").is_err());
        assert!(SignatureImage::from_data_url("https://example.com/a.png").is_err());
    }
}
