// Utils module

use anyhow::Result;
use base64::{engine::general_purpose, Engine as _};
use image::{DynamicImage, Luma};
use qrcode::QrCode;
use std::io::Cursor;

/// Render a QR payload as a base64-encoded PNG for invoice print formats.
pub fn qr_png_base64(payload: &str) -> Result<String> {
    let code = QrCode::new(payload)?;
    let image = code.render::<Luma<u8>>().min_dimensions(180, 180).build();

    let dynamic_image = DynamicImage::ImageLuma8(image);
    let mut buffer = Cursor::new(Vec::new());
    dynamic_image.write_to(&mut buffer, image::ImageOutputFormat::Png)?;

    Ok(general_purpose::STANDARD.encode(buffer.get_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_a_png_for_an_invoice_number() {
        let encoded = qr_png_base64("7000007DI1747119701593").unwrap();
        let bytes = general_purpose::STANDARD.decode(encoded).unwrap();
        // PNG signature
        assert_eq!(&bytes[..4], b"\x89PNG");
    }
}
