//! Image handling for recipe records: decoding, the downscale applied before
//! storage, PNG encoding, and the thumbnail used by the terminal preview.

use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, RgbaImage};
use thiserror::Error;

/// Longer edge of every stored image. Applied unconditionally, so smaller
/// images are scaled up until they hit it.
pub const MAX_IMAGE_EDGE: u32 = 300;

/// PNG is lossless, so "quality" only picks a compression/filter trade-off.
const PNG_COMPRESSION: CompressionType = CompressionType::Default;
const PNG_FILTER: PngFilterType = PngFilterType::Adaptive;

/// Failures while turning bytes into pixels or back.
#[derive(Debug, Error)]
pub enum ImagingError {
    /// The bytes were not a decodable image.
    #[error("failed to decode image data")]
    Decode {
        /// Decoder failure reported by the image crate.
        #[source]
        source: image::ImageError,
    },
    /// The PNG encoder rejected the scaled image.
    #[error("failed to encode image as PNG")]
    Encode {
        /// Encoder failure reported by the image crate.
        #[source]
        source: image::ImageError,
    },
}

/// Decode image bytes, sniffing the format. Used both for files the picker
/// reads and for blobs coming back out of the store.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, ImagingError> {
    image::load_from_memory(bytes).map_err(|source| ImagingError::Decode { source })
}

/// Dimensions after the downscale policy: the longer edge becomes `max_edge`
/// and the shorter one keeps the aspect ratio, arithmetically rounded.
pub fn scaled_dimensions(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let ratio = width as f64 / height as f64;
    if ratio > 1.0 {
        (max_edge, (max_edge as f64 / ratio).round() as u32)
    } else {
        ((max_edge as f64 * ratio).round() as u32, max_edge)
    }
}

/// Scale an image to the storage size and PNG-encode it. This is the only
/// path that produces blob bytes, so everything in the store went through the
/// same policy.
pub fn encode_for_storage(img: &DynamicImage) -> Result<Vec<u8>, ImagingError> {
    let (width, height) = img.dimensions();
    let (target_width, target_height) = scaled_dimensions(width, height, MAX_IMAGE_EDGE);
    let scaled = img.resize_exact(target_width, target_height, FilterType::Triangle);
    encode_png(&scaled)
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, ImagingError> {
    let mut bytes = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut bytes, PNG_COMPRESSION, PNG_FILTER);
    img.write_with_encoder(encoder)
        .map_err(|source| ImagingError::Encode { source })?;
    Ok(bytes)
}

/// Downsample for the terminal preview. Bounds are in pixels; the caller maps
/// pixel rows onto half-block cells.
pub fn preview_thumbnail(img: &DynamicImage, max_width: u32, max_height: u32) -> RgbaImage {
    img.thumbnail(max_width, max_height).to_rgba8()
}
