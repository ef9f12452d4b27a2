//! Data-URL images (the lab signature) for embedding in reports.

use crate::{ReportError, ReportResult};
use base64::{engine::general_purpose, Engine as _};
use printpdf::image_crate::{self, DynamicImage, GenericImageView, ImageBuffer, Rgb, RgbImage};
use std::io::Cursor;

/// Decodes the payload of a `data:<type>;base64,<payload>` URL. A bare base64 string is
/// accepted as well.
pub fn decode_data_url(data_url: &str) -> ReportResult<Vec<u8>> {
    let payload = match data_url.strip_prefix("data:") {
        Some(rest) => {
            let (meta, payload) = rest
                .split_once(',')
                .ok_or_else(|| ReportError::Image("data URL has no payload".into()))?;
            if !meta.ends_with(";base64") {
                return Err(ReportError::Image(format!(
                    "unsupported data URL encoding: {meta}"
                )));
            }
            payload
        }
        None => data_url,
    };
    let payload: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| ReportError::Image(format!("invalid base64: {e}")))
}

/// Pixel dimensions without decoding the whole image.
pub fn dimensions(data_url: &str) -> ReportResult<(u32, u32)> {
    let bytes = decode_data_url(data_url)?;
    image_crate::io::Reader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ReportError::Image(e.to_string()))?
        .into_dimensions()
        .map_err(|e| ReportError::Image(e.to_string()))
}

/// Decodes the image and flattens any transparency onto white.
pub fn load_rgb(data_url: &str) -> ReportResult<DynamicImage> {
    let bytes = decode_data_url(data_url)?;
    let decoded =
        image_crate::load_from_memory(&bytes).map_err(|e| ReportError::Image(e.to_string()))?;
    let (width, height) = decoded.dimensions();
    let rgba = decoded.to_rgba8();

    let flat: RgbImage = ImageBuffer::from_fn(width, height, |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = u16::from(a);
        let over_white = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha)) / 255) as u8;
        Rgb([over_white(r), over_white(g), over_white(b)])
    });
    Ok(DynamicImage::ImageRgb8(flat))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use printpdf::image_crate::{ImageOutputFormat, Rgba, RgbaImage};

    pub(crate) fn png_data_url(width: u32, height: u32) -> String {
        let img = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut bytes, ImageOutputFormat::Png)
            .unwrap();
        format!(
            "data:image/png;base64,{}",
            general_purpose::STANDARD.encode(bytes.into_inner())
        )
    }

    #[test]
    fn reads_dimensions_from_data_url() {
        assert_eq!(dimensions(&png_data_url(12, 5)).unwrap(), (12, 5));
    }

    #[test]
    fn transparent_pixels_become_white() {
        let img = load_rgb(&png_data_url(2, 2)).unwrap();
        let rgb = img.to_rgb8();
        assert_eq!(rgb.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn rejects_bad_data_urls() {
        assert!(matches!(
            decode_data_url("data:image/png,abc"),
            Err(ReportError::Image(_))
        ));
        assert!(matches!(
            decode_data_url("data:image/png;base64"),
            Err(ReportError::Image(_))
        ));
        assert!(dimensions("data:image/png;base64,aGVsbG8=").is_err());
    }
}
