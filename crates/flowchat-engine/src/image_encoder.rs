use std::borrow::Cow;
use std::path::Path;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;

pub const JPEG_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";
pub const UPLOAD_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Serializes `image` as JPEG and wraps it in a `data:image/jpeg;base64,`
/// URI. Alpha is dropped, not composited against a background.
pub fn encode_image(image: &DynamicImage) -> Result<String> {
    let flattened = flatten_for_jpeg(image);
    let mut bytes: Vec<u8> = Vec::new();
    flattened
        .write_with_encoder(JpegEncoder::new(&mut bytes))
        .context("failed to encode image as JPEG")?;
    Ok(format!("{JPEG_DATA_URI_PREFIX}{}", BASE64.encode(bytes)))
}

pub fn encode_image_file(path: &Path) -> Result<String> {
    check_upload_path(path)?;
    let image =
        image::open(path).with_context(|| format!("failed to decode image {}", path.display()))?;
    encode_image(&image)
}

/// Uploads are limited to jpg/jpeg/png and must exist on disk.
pub fn check_upload_path(path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !UPLOAD_EXTENSIONS.contains(&ext.as_str()) {
        bail!(
            "unsupported image type for {} (expected one of: {})",
            path.display(),
            UPLOAD_EXTENSIONS.join(", ")
        );
    }
    if !path.is_file() {
        bail!("image not found: {}", path.display());
    }
    Ok(())
}

/// JPEG carries 8-bit RGB or luma; anything else is converted to 8-bit RGB.
fn flatten_for_jpeg(image: &DynamicImage) -> Cow<'_, DynamicImage> {
    match image {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_) => Cow::Borrowed(image),
        other => Cow::Owned(DynamicImage::ImageRgb8(other.to_rgb8())),
    }
}
