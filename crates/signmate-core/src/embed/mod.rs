//! Draw mapped overlays into page content
//!
//! Overlays become real page content (not annotations) so every viewer
//! and printer renders them. The original page content is wrapped in
//! `q ... Q` first so a dangling graphics state cannot shift the stamp.

pub mod raster;

use crate::coords::NativeRect;
use crate::document::PdfDocument;
use crate::error::{Result, SignError};
use crate::fonts::encode_win_ansi;
use crate::overlay::{OverlayContent, TextSignature};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use raster::SignatureImage;

/// Embed one overlay on a 1-based page at native draw parameters.
pub fn embed_overlay(
    pdf: &mut PdfDocument,
    page_num: u32,
    rect: &NativeRect,
    content: &OverlayContent,
) -> Result<()> {
    let page_id = pdf
        .page_id(page_num)
        .ok_or_else(|| SignError::invalid_state(format!("page {} not found", page_num)))?;
    let doc = pdf.doc_mut();

    let operators = match content {
        OverlayContent::Image(img) => {
            let name = add_image_xobject(doc, page_id, &img.image)?;
            image_operators(&name, rect)
        }
        OverlayContent::Text(text) => {
            let name = add_font_resource(doc, page_id, text)?;
            text_operators(&name, rect, text)
        }
    };

    append_page_content(doc, page_id, operators.into_bytes())
}

fn image_operators(name: &str, rect: &NativeRect) -> String {
    format!(
        "q\n{} 0 0 {} {} {} cm\n/{} Do\nQ\n",
        fmt_num(rect.width),
        fmt_num(rect.height),
        fmt_num(rect.x),
        fmt_num(rect.y),
        name
    )
}

fn text_operators(name: &str, rect: &NativeRect, text: &TextSignature) -> String {
    // The mapped height is the scaled line box; recover the font size from it
    let unit = text.font.line_height(1.0);
    let size = if unit > 0.0 { rect.height / unit } else { 0.0 };
    let baseline = rect.y + text.font.baseline_offset(size);

    format!(
        "q\n{} {} {} rg\nBT\n/{} {} Tf\n{} {} Td\n({}) Tj\nET\nQ\n",
        text.color.r,
        text.color.g,
        text.color.b,
        name,
        fmt_num(size),
        fmt_num(rect.x),
        fmt_num(baseline),
        escape_pdf_string(&encode_win_ansi(&text.text)),
    )
}

/// Four decimals is well below a device pixel and keeps streams readable
fn fmt_num(v: f64) -> String {
    let s = format!("{:.4}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// Escape special characters for PDF string literals
fn escape_pdf_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            b'\\' => out.push_str("\\\\"),
            _ => out.push(b as char),
        }
    }
    out
}

fn add_image_xobject(doc: &mut Document, page_id: ObjectId, image: &SignatureImage) -> Result<String> {
    let mut image_dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => image.width() as i64,
        "Height" => image.height() as i64,
        "ColorSpace" => image.color_space(),
        "BitsPerComponent" => 8,
        "Filter" => image.filter(),
    };

    if let Some(alpha) = image.alpha() {
        let smask_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width() as i64,
                "Height" => image.height() as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            },
            alpha.to_vec(),
        ));
        image_dict.set("SMask", smask_id);
    }

    let image_id = doc.add_object(Stream::new(image_dict, image.data().to_vec()));
    let name = format!("SmImg{}", image_id.0);
    resource_dict(doc, page_id, b"XObject")?.set(name.as_bytes().to_vec(), image_id);
    Ok(name)
}

fn add_font_resource(doc: &mut Document, page_id: ObjectId, text: &TextSignature) -> Result<String> {
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => text.font.base_font(),
        "Encoding" => "WinAnsiEncoding",
    });
    let name = format!("SmF{}", font_id.0);
    resource_dict(doc, page_id, b"Font")?.set(name.as_bytes().to_vec(), font_id);
    Ok(name)
}

/// Get the page's `/Resources/<kind>` dictionary for writing.
///
/// Resources inherited from an ancestor, or held behind a reference, are
/// copied onto the page first so we never mutate objects other pages share.
fn resource_dict<'a>(
    doc: &'a mut Document,
    page_id: ObjectId,
    kind: &[u8],
) -> Result<&'a mut Dictionary> {
    let mut resources = effective_resources(doc, page_id)?;

    let sub = match resources.get(kind) {
        Ok(Object::Dictionary(d)) => d.clone(),
        Ok(Object::Reference(id)) => doc
            .get_object(*id)
            .and_then(|o| o.as_dict())
            .cloned()
            .map_err(|e| {
                SignError::MalformedDocument(format!(
                    "/{} resources: {}",
                    String::from_utf8_lossy(kind),
                    e
                ))
            })?,
        Ok(_) => {
            return Err(SignError::MalformedDocument(format!(
                "/{} resources are not a dictionary",
                String::from_utf8_lossy(kind)
            )))
        }
        Err(_) => Dictionary::new(),
    };
    resources.set(kind.to_vec(), Object::Dictionary(sub));

    let page = page_dict_mut(doc, page_id)?;
    page.set("Resources", Object::Dictionary(resources));

    match page.get_mut(b"Resources") {
        Ok(Object::Dictionary(res)) => match res.get_mut(kind) {
            Ok(Object::Dictionary(sub)) => Ok(sub),
            _ => Err(SignError::MalformedDocument("resource dictionary vanished".into())),
        },
        _ => Err(SignError::MalformedDocument("page resources vanished".into())),
    }
}

/// The Resources dictionary that applies to a page, resolved and cloned.
fn effective_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let dict = doc
            .get_object(id)
            .and_then(|o| o.as_dict())
            .map_err(|e| SignError::MalformedDocument(format!("page tree: {}", e)))?;
        match dict.get(b"Resources") {
            Ok(Object::Dictionary(res)) => return Ok(res.clone()),
            Ok(Object::Reference(res_id)) => {
                return doc
                    .get_object(*res_id)
                    .and_then(|o| o.as_dict())
                    .cloned()
                    .map_err(|e| SignError::MalformedDocument(format!("Resources: {}", e)));
            }
            _ => {}
        }
        current = dict.get(b"Parent").and_then(|p| p.as_reference()).ok();
    }
    Ok(Dictionary::new())
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary> {
    doc.get_object_mut(page_id)
        .and_then(|o| o.as_dict_mut())
        .map_err(|e| SignError::MalformedDocument(format!("page is not a dictionary: {}", e)))
}

/// Append a content stream to the page, isolating what was already there.
fn append_page_content(doc: &mut Document, page_id: ObjectId, content: Vec<u8>) -> Result<()> {
    let existing: Vec<Object> = {
        let page = doc
            .get_object(page_id)
            .and_then(|o| o.as_dict())
            .map_err(|e| SignError::MalformedDocument(format!("page: {}", e)))?;
        match page.get(b"Contents") {
            Ok(Object::Array(items)) => items.clone(),
            Ok(Object::Reference(id)) => match doc.get_object(*id) {
                Ok(Object::Array(items)) => items.clone(),
                _ => vec![Object::Reference(*id)],
            },
            _ => vec![],
        }
    };

    let mut contents = Vec::with_capacity(existing.len() + 2);
    if !existing.is_empty() {
        let open_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        contents.push(Object::Reference(open_id));
        contents.extend(existing);
        let mut closed = b"\nQ\n".to_vec();
        closed.extend(content);
        let stamp_id = doc.add_object(Stream::new(Dictionary::new(), closed));
        contents.push(Object::Reference(stamp_id));
    } else {
        let stamp_id = doc.add_object(Stream::new(Dictionary::new(), content));
        contents.push(Object::Reference(stamp_id));
    }

    page_dict_mut(doc, page_id)?.set("Contents", Object::Array(contents));
    Ok(())
}
