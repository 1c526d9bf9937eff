//! First-page rasterisation: turns an uploaded PDF into a PNG preview.
//!
//! pdfium is a blocking C++ library, so rendering runs inside
//! `tokio::task::spawn_blocking`.

use std::io::Cursor;

use async_trait::async_trait;
use bytes::Bytes;
use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::{debug, warn};

use crate::storage::UploadFile;

/// Outcome of a conversion. Mirrors the renderer contract: an image, an error
/// message, or (rarely) neither.
#[derive(Debug, Clone, Default)]
pub struct Rasterized {
    pub file: Option<UploadFile>,
    pub error: Option<String>,
}

impl Rasterized {
    pub fn image(file: UploadFile) -> Self {
        Self {
            file: Some(file),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            file: None,
            error: Some(error.into()),
        }
    }
}

#[async_trait]
pub trait DocumentRasterizer: Send + Sync {
    async fn convert(&self, file: &UploadFile) -> Rasterized;
}

/// pdfium backed rasterizer.
pub struct PdfiumRasterizer {
    max_pixels: i32,
    library_path: Option<String>,
}

impl PdfiumRasterizer {
    pub fn new(max_pixels: i32, library_path: Option<String>) -> Self {
        Self {
            max_pixels,
            library_path,
        }
    }
}

#[async_trait]
impl DocumentRasterizer for PdfiumRasterizer {
    async fn convert(&self, file: &UploadFile) -> Rasterized {
        let bytes = file.bytes.clone();
        let max_pixels = self.max_pixels;
        let library_path = self.library_path.clone();
        let image_name = preview_name(&file.name);

        let rendered = tokio::task::spawn_blocking(move || {
            render_first_page(&bytes, max_pixels, library_path.as_deref())
        })
        .await;

        match rendered {
            Ok(Ok(png)) => {
                debug!("Rendered preview {image_name} ({} bytes)", png.len());
                Rasterized::image(UploadFile::new(image_name, "image/png", Bytes::from(png)))
            }
            Ok(Err(message)) => {
                warn!("Rasterisation of {} failed: {message}", file.name);
                Rasterized::failed(message)
            }
            Err(e) => Rasterized::failed(format!("Render task panicked: {e}")),
        }
    }
}

fn bind_pdfium(library_path: Option<&str>) -> Result<Pdfium, String> {
    let bindings = match library_path {
        Some(path) => Pdfium::bind_to_library(path),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| format!("Failed to load pdfium: {e}"))?;
    Ok(Pdfium::new(bindings))
}

fn render_first_page(
    bytes: &[u8],
    max_pixels: i32,
    library_path: Option<&str>,
) -> Result<Vec<u8>, String> {
    let pdfium = bind_pdfium(library_path)?;

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| format!("Failed to open PDF: {e:?}"))?;

    let pages = document.pages();
    if pages.len() == 0 {
        return Err("PDF has no pages".to_string());
    }

    let page = pages
        .get(0)
        .map_err(|e| format!("Failed to load first page: {e:?}"))?;

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels)
        .set_maximum_height(max_pixels);

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| format!("Failed to render first page: {e:?}"))?;

    encode_png(&bitmap.as_image())
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, String> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| format!("Failed to encode PNG: {e}"))?;
    Ok(buf)
}

/// `resume.PDF` → `resume.png`; other names just gain the extension.
pub fn preview_name(document_name: &str) -> String {
    let lower = document_name.to_ascii_lowercase();
    let stem = if lower.ends_with(".pdf") {
        &document_name[..document_name.len() - 4]
    } else {
        document_name
    };
    format!("{stem}.png")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_preview_name_replaces_pdf_extension() {
        assert_eq!(preview_name("resume.pdf"), "resume.png");
        assert_eq!(preview_name("Resume.PDF"), "Resume.png");
        assert_eq!(preview_name("cv"), "cv.png");
        assert_eq!(preview_name("notes.pdf.bak"), "notes.pdf.bak.png");
    }

    #[test]
    fn test_encode_png_produces_png_signature() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([0, 0, 255, 255])));
        let png = encode_png(&img).expect("encode should succeed");
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_rasterized_constructors() {
        let ok = Rasterized::image(UploadFile::new("a.png", "image/png", Bytes::from_static(b"x")));
        assert!(ok.file.is_some() && ok.error.is_none());

        let failed = Rasterized::failed("boom");
        assert!(failed.file.is_none());
        assert_eq!(failed.error.as_deref(), Some("boom"));
    }
}
