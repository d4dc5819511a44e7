//! Command implementations

use crate::config::AppConfig;
use anyhow::{bail, Context, Result};
use signmate_client::{BackendClient, ClientError, RecordId};
use signmate_core::{
    ImageSignature, PdfDocument, Rgb, SignSession, SignatureImage, StandardFont, TextSignature,
};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// What to stamp
#[derive(Debug, Clone)]
pub enum SignatureSource {
    Image {
        path: PathBuf,
        width: f64,
        height: Option<f64>,
    },
    Text {
        text: String,
        font: StandardFont,
        font_size: f64,
        color: String,
    },
}

#[derive(Debug, Clone)]
pub struct SignRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub page: u32,
    pub preview_width: f64,
    pub preview_height: Option<f64>,
    pub x: f64,
    pub y: f64,
    pub signature: SignatureSource,
    pub upload: bool,
}

#[derive(Debug)]
pub struct SignReport {
    pub output: PathBuf,
    pub sha256: String,
    /// `None` when no upload was requested
    pub upload: Option<std::result::Result<RecordId, ClientError>>,
}

/// Stamp the signature, write the result locally, then optionally upload.
///
/// The local file is written before any network activity; an upload
/// failure is reported in the returned report and never removes it.
pub async fn sign(request: &SignRequest, config: &AppConfig) -> Result<SignReport> {
    let bytes = tokio::fs::read(&request.input)
        .await
        .with_context(|| format!("Failed to read {}", request.input.display()))?;

    let mut session = SignSession::new(bytes)
        .with_context(|| format!("{} is not a usable PDF", request.input.display()))?;

    let page = session.page(request.page)?;
    let preview_height = request
        .preview_height
        .unwrap_or(request.preview_width * page.aspect_ratio());
    session.set_preview(request.page, request.preview_width, preview_height)?;

    match &request.signature {
        SignatureSource::Image {
            path,
            width,
            height,
        } => {
            let image = load_signature_image(path).await?;
            let image = match height {
                Some(height) => ImageSignature {
                    image,
                    width: *width,
                    height: *height,
                },
                None => ImageSignature::fit_width(image, *width),
            };
            session.place_image(request.page, request.x, request.y, image)?;
        }
        SignatureSource::Text {
            text,
            font,
            font_size,
            color,
        } => {
            if text.trim().is_empty() {
                bail!("signature text must not be empty");
            }
            let color = Rgb::from_hex(color)
                .with_context(|| format!("invalid colour {:?}, expected #RRGGBB", color))?;
            session.place_text(
                request.page,
                request.x,
                request.y,
                TextSignature {
                    text: text.clone(),
                    font: *font,
                    font_size: *font_size,
                    color,
                },
            )?;
        }
    }

    let job = session.prepare()?;
    let signed = tokio::task::spawn_blocking(move || job.run())
        .await
        .context("signing task panicked")??;

    tokio::fs::write(&request.output, &signed.bytes)
        .await
        .with_context(|| format!("Failed to write {}", request.output.display()))?;
    info!(output = %request.output.display(), sha256 = %signed.sha256, "signed document written");

    let upload = if request.upload {
        let result = upload_signed(request, config, signed.bytes).await;
        if let Err(e) = &result {
            error!(error = %e, "upload failed; the local copy is kept");
        }
        Some(result)
    } else {
        None
    };

    Ok(SignReport {
        output: request.output.clone(),
        sha256: signed.sha256,
        upload,
    })
}

/// Upload on a spawned task. Every failure, including an unusable client
/// configuration, comes back as a `ClientError`.
async fn upload_signed(
    request: &SignRequest,
    config: &AppConfig,
    bytes: Vec<u8>,
) -> std::result::Result<RecordId, ClientError> {
    let client = BackendClient::new(config.client_config())?;
    let filename = request
        .output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "signed-document.pdf".to_string());

    let handle = tokio::spawn(async move { client.upload(&filename, bytes).await });
    match handle.await {
        Ok(result) => result,
        Err(e) => Err(ClientError::Transport(format!("upload task failed: {}", e))),
    }
}

/// Read a PNG/JPEG file, or a text file holding a `data:` URL
async fn load_signature_image(path: &Path) -> Result<SignatureImage> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let image = if bytes.starts_with(b"data:") {
        let url = String::from_utf8_lossy(&bytes);
        SignatureImage::from_data_url(url.trim())
    } else {
        SignatureImage::from_bytes(&bytes)
    };
    image.with_context(|| format!("{} is not a PNG or JPEG image", path.display()))
}

pub async fn login(config: &AppConfig, email: &str, password: &str) -> Result<String> {
    let client = BackendClient::new(config.client_config())?;
    let session = client.login(email, password).await?;
    Ok(session.token)
}

pub async fn register(config: &AppConfig, name: &str, email: &str, password: &str) -> Result<String> {
    let client = BackendClient::new(config.client_config())?;
    let session = client.register(name, email, password).await?;
    Ok(session.token)
}

pub async fn list(config: &AppConfig) -> Result<Vec<(String, String)>> {
    let client = BackendClient::new(config.client_config())?;
    let records = client.list().await?;
    if records.is_empty() {
        warn!("no signed documents found");
    }
    Ok(records
        .into_iter()
        .map(|r| (r.id.0, r.filename))
        .collect())
}

pub async fn download(config: &AppConfig, id: &str, output: &Path) -> Result<usize> {
    let client = BackendClient::new(config.client_config())?;
    let bytes = client.download(&RecordId::from(id)).await?;
    tokio::fs::write(output, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(bytes.len())
}

/// Native size of every page, as `(page, width, height)`
pub fn inspect(input: &Path) -> Result<Vec<(u32, f64, f64)>> {
    let bytes = std::fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let pdf = PdfDocument::from_bytes(bytes)?;
    Ok(pdf
        .pages()?
        .into_iter()
        .zip(1u32..)
        .map(|(g, n)| (n, g.width, g.height))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use signmate_core::document::blank_document;
    use std::time::Duration;

    fn config(base_url: &str, token: Option<&str>) -> AppConfig {
        AppConfig {
            base_url: base_url.to_string(),
            token: token.map(str::to_string),
            timeout: Duration::from_secs(5),
        }
    }

    fn text_request(dir: &Path, upload: bool) -> SignRequest {
        let input = dir.join("in.pdf");
        std::fs::write(&input, blank_document(&[(612.0, 792.0)]).unwrap()).unwrap();
        SignRequest {
            input,
            output: dir.join("signed-document.pdf"),
            page: 1,
            preview_width: 600.0,
            preview_height: None,
            x: 100.0,
            y: 100.0,
            signature: SignatureSource::Text {
                text: "Jane Doe".into(),
                font: StandardFont::TimesRoman,
                font_size: 24.0,
                color: "#1a237e".into(),
            },
            upload,
        }
    }

    #[tokio::test]
    async fn test_sign_text_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let request = text_request(dir.path(), false);

        let report = sign(&request, &config("http://127.0.0.1:9/api", None)).await.unwrap();
        assert!(report.upload.is_none());

        let written = std::fs::read(&report.output).unwrap();
        assert!(written.starts_with(b"%PDF-"));
        assert_eq!(inspect(&report.output).unwrap(), vec![(1, 612.0, 792.0)]);
    }

    #[tokio::test]
    async fn test_upload_failure_keeps_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let request = text_request(dir.path(), true);

        // No token: upload is rejected, local output must still exist
        let report = sign(&request, &config("http://127.0.0.1:9/api", None)).await.unwrap();
        assert!(matches!(report.upload, Some(Err(ClientError::Unauthorized(_)))));
        assert!(report.output.exists());
    }

    #[tokio::test]
    async fn test_unusable_upload_config_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let request = text_request(dir.path(), true);

        // e.g. SIGNMATE_API_URL=localhost:5000 with no scheme
        let report = sign(&request, &config("localhost:5000", Some("token")))
            .await
            .unwrap();
        assert!(matches!(report.upload, Some(Err(ClientError::InvalidConfig(_)))));
        assert_eq!(report.sha256.len(), 64);
        assert!(report.output.exists());
    }

    #[tokio::test]
    async fn test_bad_colour_aborts_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let mut request = text_request(dir.path(), false);
        if let SignatureSource::Text { color, .. } = &mut request.signature {
            *color = "blue".into();
        }

        assert!(sign(&request, &config("http://127.0.0.1:9/api", None)).await.is_err());
        assert!(!request.output.exists());
    }

    #[tokio::test]
    async fn test_unsupported_image_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let mut request = text_request(dir.path(), false);
        let sig = dir.path().join("sig.gif");
        std::fs::write(&sig, b"GIF89a....").unwrap();
        request.signature = SignatureSource::Image {
            path: sig,
            width: 120.0,
            height: None,
        };

        let err = sign(&request, &config("http://127.0.0.1:9/api", None)).await.unwrap_err();
        assert!(format!("{:#}", err).contains("Unsupported image format"), "got: {:#}", err);
        assert!(!request.output.exists());
    }

    #[tokio::test]
    async fn test_page_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let mut request = text_request(dir.path(), false);
        request.page = 4;
        let err = sign(&request, &config("http://127.0.0.1:9/api", None)).await.unwrap_err();
        assert!(format!("{:#}", err).contains("page 4 not found"), "got: {:#}", err);
    }
}
