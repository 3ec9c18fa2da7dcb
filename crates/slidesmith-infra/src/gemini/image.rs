//! Image generation with bounded retries and output normalization.
//!
//! A successful attempt yields a base64 inline payload. Before the file is
//! written the payload is normalized: decoded, any transparency composited
//! over white, and re-encoded as JPEG at a fixed quality so the serving
//! layer ships consistently sized files. If normalization fails on an
//! otherwise good payload, the raw bytes are written instead -- that is
//! still a success, not a failure.

use std::io::Cursor;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgb, RgbImage};
use tracing::{debug, warn};

use slidesmith_core::generate::{ImageGenerator, ImageRequest};
use slidesmith_types::outcome::ImageOutcome;
use slidesmith_types::session::MaterialKind;

use super::types::{GenerateContentRequest, InlineBlob};
use super::{AttemptError, GeminiClient, with_retries};

/// JPEG quality for normalized page images.
const JPEG_QUALITY: u8 = 85;

impl GeminiClient {
    /// Gather the inline attachments for an image request, in the fixed
    /// order the prompt blocks describe them: logo, reference, materials.
    /// Unreadable files are skipped rather than failing the request.
    async fn collect_attachments(&self, request: &ImageRequest) -> Vec<InlineBlob> {
        let mut attachments = Vec::new();

        if let Some(logo) = &request.custom_logo_path {
            if let Some(blob) = Self::load_attachment(logo).await {
                attachments.push(blob);
            }
        }
        if let Some(reference) = &request.reference_image_path {
            if let Some(blob) = Self::load_attachment(reference).await {
                attachments.push(blob);
            }
        }
        for material in &request.page_materials {
            if material.kind != MaterialKind::Image {
                continue; // table text travels inside the prompt
            }
            let Some(path) = &material.path else { continue };
            if let Some(blob) = Self::load_attachment(path).await {
                attachments.push(blob);
            }
        }

        attachments
    }

    /// One image-generation attempt: POST, check status, extract and decode
    /// the inline payload.
    async fn image_attempt(
        &self,
        prompt: &str,
        attachments: &[InlineBlob],
    ) -> Result<Vec<u8>, AttemptError> {
        let request =
            GenerateContentRequest::image(&self.image_model, prompt, attachments.to_vec());
        let response = self
            .post_once(&self.image_model, &request, self.image_timeout)
            .await?;

        let inline = response
            .first_inline_data()
            .ok_or(AttemptError::MissingImage)?;
        BASE64
            .decode(&inline.data)
            .map_err(|err| AttemptError::Other(format!("undecodable image payload: {err}")))
    }

    /// Normalize the payload and write it to the output path.
    async fn write_output(&self, output_path: &Path, bytes: Vec<u8>) -> Result<(), String> {
        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| format!("failed to create output directory: {err}"))?;
        }

        let payload = match encode_jpeg_over_white(&bytes) {
            Ok(jpeg) => jpeg,
            Err(err) => {
                warn!(%err, "image normalization failed, saving raw payload");
                bytes
            }
        };
        tokio::fs::write(output_path, payload)
            .await
            .map_err(|err| format!("failed to write image: {err}"))
    }
}

impl ImageGenerator for GeminiClient {
    async fn generate_image(&self, request: &ImageRequest) -> ImageOutcome {
        let attachments = self.collect_attachments(request).await;
        debug!(
            attachments = attachments.len(),
            prompt_chars = request.prompt.len(),
            output = %request.output_path.display(),
            "image generation requested"
        );

        let result = with_retries(self.max_attempts, self.retry_delay, |_| {
            self.image_attempt(&request.prompt, &attachments)
        })
        .await;

        match result {
            Ok((bytes, advisory)) => match self.write_output(&request.output_path, bytes).await {
                Ok(()) => match advisory {
                    Some(advisory) => ImageOutcome::ok_after_retries(advisory),
                    None => ImageOutcome::ok(),
                },
                Err(message) => ImageOutcome::failed(message),
            },
            Err(advisory) => ImageOutcome::failed(advisory),
        }
    }
}

/// Decode an image payload, composite any transparency over white, and
/// re-encode it as JPEG.
fn encode_jpeg_over_white(bytes: &[u8]) -> Result<Vec<u8>, image::ImageError> {
    let decoded = image::load_from_memory(bytes)?;

    let rgb: RgbImage = match decoded {
        DynamicImage::ImageRgba8(rgba) => {
            let (width, height) = rgba.dimensions();
            let mut canvas = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
            for (x, y, pixel) in rgba.enumerate_pixels() {
                let alpha = pixel[3] as u32;
                let blend =
                    |channel: u8| ((channel as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
                canvas.put_pixel(x, y, Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]));
            }
            canvas
        }
        other => other.to_rgb8(),
    };

    let mut out = Vec::new();
    let mut cursor = Cursor::new(&mut out);
    let encoder = JpegEncoder::new_with_quality(&mut cursor, JPEG_QUALITY);
    DynamicImage::ImageRgb8(rgb).write_with_encoder(encoder)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};

    fn png_bytes(image: RgbaImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(image)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_transparency_composites_over_white() {
        let mut rgba = RgbaImage::from_pixel(16, 16, Rgba([0, 0, 0, 0]));
        rgba.put_pixel(0, 0, Rgba([200, 10, 10, 255]));

        let jpeg = encode_jpeg_over_white(&png_bytes(rgba)).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap().to_rgb8();

        // Fully transparent pixels become white (JPEG is lossy, allow slack).
        let corner = decoded.get_pixel(15, 15);
        assert!(corner[0] > 200 && corner[1] > 200 && corner[2] > 200);
        // The opaque pixel keeps its dominant channel.
        let painted = decoded.get_pixel(0, 0);
        assert!(painted[0] > 120);
    }

    #[test]
    fn test_opaque_image_reencodes_as_jpeg() {
        let rgba = RgbaImage::from_pixel(2, 2, Rgba([10, 200, 30, 255]));
        let jpeg = encode_jpeg_over_white(&png_bytes(rgba)).unwrap();
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_garbage_payload_fails_normalization() {
        assert!(encode_jpeg_over_white(b"not an image").is_err());
    }
}
