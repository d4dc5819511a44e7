//! Signing session: one document, its preview metrics, and the overlays
//! placed on it
//!
//! The rewrite is split in two so it can run off the UI/async thread:
//! [`SignSession::prepare`] validates and maps every overlay and hands out
//! a [`SignJob`]; [`SignJob::run`] does the blocking embed/serialize on its
//! own copy of the document. Only one job may exist per session at a time,
//! and the session gives up its document only once a job has succeeded.

use crate::coords::{NativeRect, PageGeometry, Scale};
use crate::document::PdfDocument;
use crate::embed::embed_overlay;
use crate::error::{Result, SignError};
use crate::overlay::{ImageSignature, Overlay, OverlayContent, PreviewMetrics, TextSignature};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Index of an overlay within its session
pub type OverlayId = usize;

/// The rewritten PDF
#[derive(Debug, Clone)]
pub struct SignedDocument {
    pub bytes: Vec<u8>,
    /// Hex SHA-256 of `bytes`
    pub sha256: String,
    pub page_count: usize,
    pub overlay_count: usize,
}

pub struct SignSession {
    document: Option<PdfDocument>,
    pages: Vec<PageGeometry>,
    previews: BTreeMap<u32, PreviewMetrics>,
    overlays: Vec<Overlay>,
    next_revision: u64,
    in_progress: Arc<AtomicBool>,
    /// Set by a job that produced its output
    committed: Arc<AtomicBool>,
}

impl SignSession {
    /// Load a document. Fails with `MalformedDocument` on unparsable bytes.
    pub fn new(bytes: Vec<u8>) -> Result<Self> {
        let document = PdfDocument::from_bytes(bytes)?;
        let pages = document.pages()?;
        debug!(pages = pages.len(), "loaded document");

        Ok(Self {
            document: Some(document),
            pages,
            previews: BTreeMap::new(),
            overlays: Vec::new(),
            next_revision: 1,
            in_progress: Arc::new(AtomicBool::new(false)),
            committed: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Native geometry of a 1-based page
    pub fn page(&self, page: u32) -> Result<PageGeometry> {
        page.checked_sub(1)
            .and_then(|i| self.pages.get(i as usize))
            .copied()
            .ok_or_else(|| {
                SignError::invalid_state(format!(
                    "page {} not found (document has {} pages)",
                    page,
                    self.pages.len()
                ))
            })
    }

    pub fn has_document(&self) -> bool {
        self.document.is_some() && !self.committed.load(Ordering::Acquire)
    }

    pub fn is_signing(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Record the rendered size of a page. Every call bumps the revision,
    /// which makes overlays placed against earlier metrics stale.
    pub fn set_preview(&mut self, page: u32, width: f64, height: f64) -> Result<PreviewMetrics> {
        let geometry = self.page(page)?;
        Scale::between(width, height, &geometry)?;

        let metrics = PreviewMetrics {
            width,
            height,
            revision: self.next_revision,
        };
        self.next_revision += 1;
        self.previews.insert(page, metrics);
        debug!(page, width, height, revision = metrics.revision, "preview measured");
        Ok(metrics)
    }

    pub fn preview(&self, page: u32) -> Option<PreviewMetrics> {
        self.previews.get(&page).copied()
    }

    pub fn place_text(&mut self, page: u32, x: f64, y: f64, text: TextSignature) -> Result<OverlayId> {
        self.place(page, x, y, OverlayContent::Text(text))
    }

    pub fn place_image(
        &mut self,
        page: u32,
        x: f64,
        y: f64,
        image: ImageSignature,
    ) -> Result<OverlayId> {
        self.place(page, x, y, OverlayContent::Image(image))
    }

    fn place(&mut self, page: u32, x: f64, y: f64, content: OverlayContent) -> Result<OverlayId> {
        self.page(page)?;
        let metrics = self.preview(page).ok_or_else(|| {
            SignError::invalid_state(format!("page {} has not been rendered yet", page))
        })?;
        self.overlays.push(Overlay::new(page, x, y, content, metrics));
        Ok(self.overlays.len() - 1)
    }

    pub fn overlays(&self) -> &[Overlay] {
        &self.overlays
    }

    /// Mutable access for drag/resize updates
    pub fn overlay_mut(&mut self, id: OverlayId) -> Option<&mut Overlay> {
        self.overlays.get_mut(id)
    }

    /// Re-derive every overlay on `page` against its current metrics.
    pub fn rebase_page(&mut self, page: u32) -> Result<()> {
        let metrics = self.preview(page).ok_or_else(|| {
            SignError::invalid_state(format!("page {} has not been rendered yet", page))
        })?;
        for overlay in self.overlays.iter_mut().filter(|o| o.page == page) {
            overlay.rebase(metrics);
        }
        Ok(())
    }

    /// Validate and map all overlays, and copy the document for rewriting.
    ///
    /// Fails with `InvalidState` if a rewrite is already running, the
    /// document was already consumed, nothing is placed, or any overlay was
    /// placed against preview metrics that have since changed. A job that
    /// fails or is dropped leaves the session as it was.
    pub fn prepare(&mut self) -> Result<SignJob> {
        let guard = SignGuard::acquire(&self.in_progress)?;

        if self.committed.load(Ordering::Acquire) {
            self.document = None;
        }
        if self.document.is_none() {
            return Err(SignError::invalid_state("no document loaded"));
        }
        if self.overlays.is_empty() {
            return Err(SignError::invalid_state("no signature placed"));
        }

        let mut placements = Vec::with_capacity(self.overlays.len());
        for overlay in &self.overlays {
            let current = self.preview(overlay.page).ok_or_else(|| {
                SignError::invalid_state(format!("page {} has no preview metrics", overlay.page))
            })?;
            if current != overlay.preview {
                return Err(SignError::invalid_state(format!(
                    "overlay on page {} was placed against preview revision {} but the page is now at revision {}",
                    overlay.page, overlay.preview.revision, current.revision
                )));
            }
            let geometry = self.page(overlay.page)?;
            placements.push(Placement {
                page: overlay.page,
                rect: overlay.to_native(&geometry)?,
                content: overlay.content.clone(),
            });
        }

        let document = self
            .document
            .clone()
            .ok_or_else(|| SignError::invalid_state("no document loaded"))?;

        Ok(SignJob {
            document,
            placements,
            committed: Arc::clone(&self.committed),
            _guard: guard,
        })
    }

    /// Prepare and run in one go on the current thread
    pub fn sign(&mut self) -> Result<SignedDocument> {
        let signed = self.prepare()?.run()?;
        self.document = None;
        Ok(signed)
    }
}

struct Placement {
    page: u32,
    rect: NativeRect,
    content: OverlayContent,
}

/// A validated rewrite, ready to run on a blocking thread
pub struct SignJob {
    document: PdfDocument,
    placements: Vec<Placement>,
    committed: Arc<AtomicBool>,
    _guard: SignGuard,
}

impl SignJob {
    pub fn overlay_count(&self) -> usize {
        self.placements.len()
    }

    /// Embed every overlay and serialize the result
    pub fn run(mut self) -> Result<SignedDocument> {
        info!(overlays = self.placements.len(), "signing document");

        for placement in &self.placements {
            embed_overlay(
                &mut self.document,
                placement.page,
                &placement.rect,
                &placement.content,
            )?;
        }

        let bytes = self.document.save_to_bytes()?;
        let sha256 = hex::encode(Sha256::digest(&bytes));
        self.committed.store(true, Ordering::Release);
        let signed = SignedDocument {
            page_count: self.document.page_count(),
            overlay_count: self.placements.len(),
            sha256,
            bytes,
        };
        info!(
            bytes = signed.bytes.len(),
            sha256 = %signed.sha256,
            "document signed"
        );
        Ok(signed)
    }
}

/// Clears the session's in-progress flag when the job finishes or is dropped
struct SignGuard(Arc<AtomicBool>);

impl SignGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SignError::invalid_state("a signing operation is already in progress"))?;
        Ok(Self(Arc::clone(flag)))
    }
}

impl Drop for SignGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
