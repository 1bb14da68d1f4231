//! `data:` URIs for rasters crossing the host boundary.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use image::{ImageFormat, RgbaImage};
use snafu::ResultExt;

use crate::error::{EditorResult, EncodeRasterSnafu, UnsupportedImageSnafu};

const ACCEPTED_FORMATS: [ImageFormat; 4] = [
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Gif,
    ImageFormat::WebP,
];

/// Sniffs raster bytes and returns them as a `data:` URI.
///
/// Only formats a browser canvas can draw are accepted.
pub fn from_image_bytes(bytes: &[u8], stage: &'static str) -> EditorResult<String> {
    let format = sniff(bytes, stage)?;
    Ok(format!(
        "data:{};base64,{}",
        format.to_mime_type(),
        B64.encode(bytes)
    ))
}

/// Checks that a `data:` URI carries an accepted raster and returns it unchanged.
pub fn validate<'a>(uri: &'a str, stage: &'static str) -> EditorResult<&'a str> {
    let Some((header, payload)) = uri
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
    else {
        return UnsupportedImageSnafu {
            stage,
            details: "expected a data: URI".to_string(),
        }
        .fail();
    };
    let Some(mime) = header.strip_suffix(";base64") else {
        return UnsupportedImageSnafu {
            stage,
            details: format!("'{header}' is not base64 encoded"),
        }
        .fail();
    };
    let Ok(bytes) = B64.decode(payload.trim()) else {
        return UnsupportedImageSnafu {
            stage,
            details: "payload is not valid base64".to_string(),
        }
        .fail();
    };

    let format = sniff(&bytes, stage)?;
    if !mime.eq_ignore_ascii_case(format.to_mime_type()) {
        return UnsupportedImageSnafu {
            stage,
            details: format!("declared {mime} but found {}", format.to_mime_type()),
        }
        .fail();
    }
    Ok(uri)
}

pub fn encode_png(raster: &RgbaImage, stage: &'static str) -> EditorResult<String> {
    let mut bytes = std::io::Cursor::new(Vec::new());
    raster
        .write_to(&mut bytes, ImageFormat::Png)
        .context(EncodeRasterSnafu { stage })?;
    Ok(format!("data:image/png;base64,{}", B64.encode(bytes.into_inner())))
}

fn sniff(bytes: &[u8], stage: &'static str) -> EditorResult<ImageFormat> {
    match image::guess_format(bytes) {
        Ok(format) if ACCEPTED_FORMATS.contains(&format) => Ok(format),
        Ok(format) => UnsupportedImageSnafu {
            stage,
            details: format!("{format:?} images are not accepted"),
        }
        .fail(),
        Err(_) => UnsupportedImageSnafu {
            stage,
            details: "unrecognized image data".to_string(),
        }
        .fail(),
    }
}
