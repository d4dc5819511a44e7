//! PDF loading and page geometry using lopdf

use crate::coords::PageGeometry;
use crate::error::{Result, SignError};
use lopdf::{Dictionary, Document, Object, ObjectId};

/// A parsed PDF plus the bytes it came from
#[derive(Clone)]
pub struct PdfDocument {
    pub(crate) doc: Document,
    pub(crate) bytes: Vec<u8>,
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("pages", &self.page_count())
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl PdfDocument {
    /// Load a PDF from raw bytes
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let doc = Document::load_mem(&bytes)
            .map_err(|e| SignError::MalformedDocument(format!("PDF parse error: {}", e)))?;
        Ok(Self { doc, bytes })
    }

    /// The bytes the document was loaded from (or last saved to)
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Page object ID for a 1-based page number
    pub fn page_id(&self, page_num: u32) -> Option<ObjectId> {
        self.doc.get_pages().get(&page_num).copied()
    }

    /// Native geometry of every page, in page order
    pub fn pages(&self) -> Result<Vec<PageGeometry>> {
        self.doc
            .get_pages()
            .keys()
            .map(|&num| self.page_geometry(num))
            .collect()
    }

    /// Native geometry (MediaBox) of a 1-based page
    pub fn page_geometry(&self, page_num: u32) -> Result<PageGeometry> {
        let page_id = self.page_id(page_num).ok_or_else(|| {
            SignError::invalid_state(format!(
                "page {} not found (document has {} pages)",
                page_num,
                self.page_count()
            ))
        })?;

        // MediaBox is inheritable, walk up through Parent
        let mut current = Some(page_id);
        while let Some(id) = current {
            let dict = self.dict(id)?;
            if let Ok(media_box) = dict.get(b"MediaBox") {
                return self.parse_rect(media_box).map(PageGeometry::from_media_box);
            }
            current = dict.get(b"Parent").and_then(|p| p.as_reference()).ok();
        }

        // Default to US Letter size
        Ok(PageGeometry::letter())
    }

    fn dict(&self, id: ObjectId) -> Result<&Dictionary> {
        self.doc
            .get_object(id)
            .and_then(|o| o.as_dict())
            .map_err(|e| SignError::MalformedDocument(format!("object {:?}: {}", id, e)))
    }

    /// Parse a PDF rectangle array into [x, y, width, height]
    fn parse_rect(&self, obj: &Object) -> Result<[f64; 4]> {
        let arr = match obj {
            Object::Array(a) => a,
            Object::Reference(id) => self
                .doc
                .get_object(*id)
                .and_then(|o| o.as_array())
                .map_err(|_| {
                    SignError::MalformedDocument("MediaBox reference is not an array".into())
                })?,
            _ => {
                return Err(SignError::MalformedDocument(
                    "MediaBox is not an array".into(),
                ))
            }
        };

        if arr.len() != 4 {
            return Err(SignError::MalformedDocument(format!(
                "MediaBox has {} elements, expected 4",
                arr.len()
            )));
        }

        let mut values = [0.0f64; 4];
        for (i, obj) in arr.iter().enumerate() {
            values[i] = self.extract_number(obj)?;
        }

        // [x1, y1, x2, y2] -> [x, y, width, height]; corners may be given
        // in any order
        let (x1, x2) = (values[0].min(values[2]), values[0].max(values[2]));
        let (y1, y2) = (values[1].min(values[3]), values[1].max(values[3]));
        Ok([x1, y1, x2 - x1, y2 - y1])
    }

    fn extract_number(&self, obj: &Object) -> Result<f64> {
        match obj {
            Object::Integer(i) => Ok(*i as f64),
            Object::Real(r) => Ok(*r as f64),
            Object::Reference(id) => {
                let resolved = self
                    .doc
                    .get_object(*id)
                    .map_err(|e| SignError::MalformedDocument(format!("Failed to resolve: {}", e)))?;
                self.extract_number(resolved)
            }
            _ => Err(SignError::MalformedDocument(
                "Expected number in rectangle".into(),
            )),
        }
    }

    pub fn doc_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// Serialize the (possibly modified) document
    pub fn save_to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.doc.save_to(&mut buffer)?;
        self.bytes = buffer.clone();
        Ok(buffer)
    }
}

/// Build a blank document with one page per `(width, height)`.
///
/// Used by tests and the CLI's self-check; pages carry their own MediaBox.
pub fn blank_document(sizes: &[(f64, f64)]) -> Result<Vec<u8>> {
    use lopdf::dictionary;

    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = sizes
        .iter()
        .map(|&(w, h)| {
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), Object::Real(w as f32), Object::Real(h as f32)],
            });
            Object::Reference(page_id)
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}
