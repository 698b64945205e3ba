use std::path::Path;

use image::{DynamicImage, Rgb32FImage};
use log::trace;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::{AlignError, Result};

/// Rejects extensions this build cannot encode or decode.
pub fn check_format(path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let unsupported = |reason: &str| {
        Err(AlignError::UnsupportedFormat {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        })
    };
    match ext.as_deref() {
        Some("bmp" | "ppm" | "pgm" | "pnm" | "png") => Ok(()),
        Some("jpg" | "jpeg") => {
            if cfg!(feature = "jpeg") {
                Ok(())
            } else {
                unsupported("built without the `jpeg` feature")
            }
        }
        Some(_) => unsupported("unrecognised extension"),
        None => unsupported("missing extension"),
    }
}

/// Reads an image file into normalised RGB.
pub fn read_image(path: &Path) -> Result<Rgb32FImage> {
    check_format(path)?;
    let codec_err = |op, source| AlignError::ImageCodec {
        op,
        path: path.to_path_buf(),
        source,
    };
    let img = image::ImageReader::open(path)
        .map_err(|e| codec_err("open", image::ImageError::IoError(e)))?
        .decode()
        .map_err(|e| codec_err("decode", e))?;
    trace!("read {} ({}x{})", path.display(), img.width(), img.height());
    Ok(img.to_rgb32f())
}

/// Writes an image, quantising to 8 bits per channel. The format follows
/// the extension.
pub fn write_image(img: &Rgb32FImage, path: &Path) -> Result<()> {
    check_format(path)?;
    let mut clamped = img.clone();
    for p in clamped.pixels_mut() {
        *p = crate::filters::clamp_pixel(*p);
    }
    DynamicImage::ImageRgb32F(clamped)
        .to_rgb8()
        .save(path)
        .map_err(|source| AlignError::ImageCodec {
            op: "write",
            path: path.to_path_buf(),
            source,
        })?;
    trace!("wrote {}", path.display());
    Ok(())
}

/// Serializes an object to a JSON file.
pub fn object_to_json<T: Serialize>(output_path: &Path, object: &T) -> Result<()> {
    let j = serde_json::to_string_pretty(object)?;
    std::fs::write(output_path, j)?;
    Ok(())
}

/// Deserializes an object from a JSON file.
pub fn object_from_json<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(file_path)?;
    Ok(serde_json::from_str(&contents)?)
}
