//! Visible signature stamping for PDF documents
//!
//! A signature (typed text or a PNG/JPEG image) is positioned by the user
//! against an on-screen preview of a page. This crate maps that placement
//! into the page's own coordinate system and rewrites the PDF with the
//! signature drawn into the page content.
//!
//! ```no_run
//! use signmate_core::{ImageSignature, SignSession, SignatureImage};
//!
//! # fn example(pdf: Vec<u8>, png: &[u8]) -> signmate_core::Result<()> {
//! let mut session = SignSession::new(pdf)?;
//! session.set_preview(1, 600.0, 776.5)?;
//! let image = SignatureImage::from_bytes(png)?;
//! session.place_image(1, 100.0, 100.0, ImageSignature::fit_width(image, 120.0))?;
//! let signed = session.sign()?;
//! std::fs::write("signed-document.pdf", &signed.bytes)?;
//! # Ok(())
//! # }
//! ```

pub mod coords;
pub mod document;
pub mod embed;
pub mod error;
pub mod fonts;
pub mod overlay;
pub mod session;

pub use coords::{native_to_preview, preview_to_native, NativeRect, PageGeometry, PreviewRect};
pub use document::PdfDocument;
pub use embed::raster::SignatureImage;
pub use error::{Result, SignError};
pub use fonts::StandardFont;
pub use overlay::{ImageSignature, Overlay, OverlayContent, PreviewMetrics, Rgb, TextSignature};
pub use session::{OverlayId, SignJob, SignSession, SignedDocument};
