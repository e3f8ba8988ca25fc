//! Image encoding: `DynamicImage` → PNG bytes → base64.
//!
//! Page images travel to the front end as base64 strings inside the JSON
//! response. PNG is used because it is lossless; change highlights are thin
//! coloured boxes and JPEG artefacts smear them.

use crate::engine::PageImage;
use crate::output::PageDescriptor;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode an image as PNG bytes.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

/// Encode a rendered page into a fully loaded [`PageDescriptor`].
pub fn encode_page(page: &PageImage) -> Result<PageDescriptor, image::ImageError> {
    let png = encode_png(&page.image)?;
    let b64 = STANDARD.encode(&png);
    debug!("Encoded page {} → {} bytes base64", page.number, b64.len());

    Ok(PageDescriptor {
        number: page.number,
        width: page.width(),
        height: page.height(),
        data: Some(b64),
    })
}
