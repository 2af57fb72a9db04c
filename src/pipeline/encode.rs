//! Attachment encoding: invoice bytes or rendered pages → base64 `ImageData`.
//!
//! edgequake-llm carries every attachment as [`ImageData`] (base64 payload
//! plus MIME type), whatever the payload actually is. A PDF therefore goes
//! out as `application/pdf`; providers with native document support read
//! it directly. Rendered pages go out as lossless PNG so small print on a
//! receipt survives.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// MIME type used for whole-document attachments.
pub const PDF_MIME: &str = "application/pdf";

/// Wrap raw PDF bytes as a base64 attachment.
pub fn encode_pdf(bytes: &[u8]) -> ImageData {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded PDF → {} bytes base64", b64.len());
    ImageData::new(b64, PDF_MIME)
}

/// Encode a rasterised page as a base64 PNG.
///
/// `detail: "high"` keeps GPT-class models from downscaling the page to a
/// single overview tile, which loses line items and dates.
pub fn encode_page(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded page → {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_pdf_round_trips_bytes() {
        let bytes = b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n";
        let data = encode_pdf(bytes);
        assert_eq!(data.mime_type, PDF_MIME);
        assert_eq!(STANDARD.decode(&data.data).expect("valid base64"), bytes);
    }

    #[test]
    fn encode_small_page() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255])));
        let data = encode_page(&img).expect("encode should succeed");
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(&decoded[1..4], b"PNG");
    }
}
