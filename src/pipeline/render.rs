//! Page rasterisation via pdfium, for [`crate::config::AttachmentMode::Pages`].
//!
//! pdfium keeps thread-local state and blocks for the whole render, so the
//! work runs under `spawn_blocking`. The library is bound at call time:
//! `PDFIUM_LIB_PATH` if set, otherwise the system library search path.
//! A missing library is a per-file error, not a panic.

use crate::error::InvoiceError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::debug;

/// Rasterise the first `max_pages` pages of an in-memory PDF.
pub async fn render_pages(
    bytes: Vec<u8>,
    max_pages: usize,
    max_pixels: u32,
) -> Result<Vec<DynamicImage>, InvoiceError> {
    tokio::task::spawn_blocking(move || render_pages_blocking(&bytes, max_pages, max_pixels))
        .await
        .map_err(|e| InvoiceError::RasterisationFailed(format!("render task panicked: {e}")))?
}

fn bind_pdfium() -> Result<Pdfium, InvoiceError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) if !path.is_empty() => Pdfium::bind_to_library(path),
        _ => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| {
        InvoiceError::RasterisationFailed(format!(
            "cannot load pdfium ({e:?}); set PDFIUM_LIB_PATH or use --attach pdf"
        ))
    })?;
    Ok(Pdfium::new(bindings))
}

fn render_pages_blocking(
    bytes: &[u8],
    max_pages: usize,
    max_pixels: u32,
) -> Result<Vec<DynamicImage>, InvoiceError> {
    let pdfium = bind_pdfium()?;
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| InvoiceError::RasterisationFailed(format!("{e:?}")))?;

    let pages = document.pages();
    let count = (pages.len() as usize).min(max_pages);
    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut images = Vec::with_capacity(count);
    for idx in 0..count {
        let page = pages
            .get(idx as u16)
            .map_err(|e| InvoiceError::RasterisationFailed(format!("page {}: {e:?}", idx + 1)))?;
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| InvoiceError::RasterisationFailed(format!("page {}: {e:?}", idx + 1)))?;
        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );
        images.push(image);
    }

    if images.is_empty() {
        return Err(InvoiceError::RasterisationFailed(
            "document has no pages".into(),
        ));
    }
    Ok(images)
}
