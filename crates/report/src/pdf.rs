//! PDF backend: draws laid-out pages with the builtin Courier fonts.

use crate::document::{Document, Rgb, TextStyle};
use crate::image;
use crate::layout::{paginate, DrawOp, Page};
use crate::{ReportError, ReportResult};
use printpdf::image_crate::{DynamicImage, GenericImageView};
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Point, Pt,
};
use std::collections::HashMap;
use std::io::BufWriter;

/// Resolution images are embedded at before scaling.
const IMAGE_DPI: f32 = 300.0;

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
    bold_italic: IndirectFontRef,
}

impl Fonts {
    fn load(doc: &PdfDocumentReference) -> ReportResult<Self> {
        let font = |f: BuiltinFont| {
            doc.add_builtin_font(f)
                .map_err(|e| ReportError::Pdf(format!("failed to load font: {e}")))
        };
        Ok(Self {
            regular: font(BuiltinFont::Courier)?,
            bold: font(BuiltinFont::CourierBold)?,
            italic: font(BuiltinFont::CourierOblique)?,
            bold_italic: font(BuiltinFont::CourierBoldOblique)?,
        })
    }

    fn for_style(&self, style: &TextStyle) -> &IndirectFontRef {
        match (style.bold, style.italic) {
            (false, false) => &self.regular,
            (true, false) => &self.bold,
            (false, true) => &self.italic,
            (true, true) => &self.bold_italic,
        }
    }
}

fn color(rgb: Rgb) -> Color {
    let channel = |c: u8| f32::from(c) / 255.0;
    Color::Rgb(printpdf::Rgb::new(
        channel(rgb.0),
        channel(rgb.1),
        channel(rgb.2),
        None,
    ))
}

fn mm(points: f32) -> Mm {
    Mm::from(Pt(points))
}

/// The builtin fonts only cover WinAnsi; map the few typographic characters reports use and
/// replace anything else outside ASCII.
fn winansi_safe(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '–' | '—' | '‐' => '-',
            '‘' | '’' => '\'',
            '“' | '”' => '"',
            c if c.is_ascii() => c,
            _ => '?',
        })
        .collect()
}

/// Lays out and renders `doc` to PDF bytes.
pub fn render(doc: &Document) -> ReportResult<Vec<u8>> {
    let pages = paginate(doc);
    render_pages(doc, &pages)
}

/// Renders already laid-out pages.
pub fn render_pages(doc: &Document, pages: &[Page]) -> ReportResult<Vec<u8>> {
    let (width, height) = (mm(doc.page_width), mm(doc.page_height));
    let (pdf, first_page, first_layer) = PdfDocument::new(&doc.title, width, height, "Layer 1");
    let fonts = Fonts::load(&pdf)?;
    let mut images: HashMap<&str, DynamicImage> = HashMap::new();

    for (index, page) in pages.iter().enumerate() {
        let layer = if index == 0 {
            pdf.get_page(first_page).get_layer(first_layer)
        } else {
            let (p, l) = pdf.add_page(width, height, format!("Page {}", page.number));
            pdf.get_page(p).get_layer(l)
        };
        for op in &page.ops {
            draw(op, &layer, &fonts, &mut images, doc.page_height)?;
        }
    }

    let mut buf = BufWriter::new(Vec::new());
    pdf.save(&mut buf)
        .map_err(|e| ReportError::Pdf(format!("failed to save PDF: {e}")))?;
    let bytes = buf
        .into_inner()
        .map_err(|e| ReportError::Pdf(format!("failed to flush PDF: {e}")))?;
    tracing::info!("rendered {} page(s), {} bytes", pages.len(), bytes.len());
    Ok(bytes)
}

fn draw<'a>(
    op: &'a DrawOp,
    layer: &PdfLayerReference,
    fonts: &Fonts,
    images: &mut HashMap<&'a str, DynamicImage>,
    page_height: f32,
) -> ReportResult<()> {
    // layout measures from the top, PDF from the bottom
    let flip = |y: f32| page_height - y;

    match op {
        DrawOp::Text { x, y, text, style } => {
            if text.is_empty() {
                return Ok(());
            }
            layer.set_fill_color(color(style.color));
            layer.use_text(
                winansi_safe(text),
                style.size,
                mm(*x),
                mm(flip(*y)),
                fonts.for_style(style),
            );
        }
        DrawOp::Line {
            x1,
            y1,
            x2,
            y2,
            thickness,
            color: c,
        } => {
            layer.set_outline_color(color(*c));
            layer.set_outline_thickness(*thickness);
            layer.add_line(Line {
                points: vec![
                    (Point::new(mm(*x1), mm(flip(*y1))), false),
                    (Point::new(mm(*x2), mm(flip(*y2))), false),
                ],
                is_closed: false,
            });
        }
        DrawOp::Rect {
            x,
            y,
            width,
            height,
            thickness,
            color: c,
        } => {
            let (left, right) = (mm(*x), mm(x + width));
            let (top, bottom) = (mm(flip(*y)), mm(flip(y + height)));
            layer.set_outline_color(color(*c));
            layer.set_outline_thickness(*thickness);
            layer.add_line(Line {
                points: vec![
                    (Point::new(left, top), false),
                    (Point::new(right, top), false),
                    (Point::new(right, bottom), false),
                    (Point::new(left, bottom), false),
                ],
                is_closed: true,
            });
        }
        DrawOp::Image {
            x,
            y,
            width,
            height,
            data_url,
        } => {
            if !images.contains_key(data_url.as_str()) {
                images.insert(data_url.as_str(), image::load_rgb(data_url)?);
            }
            let Some(decoded) = images.get(data_url.as_str()) else {
                return Ok(());
            };
            let (px_width, px_height) = decoded.dimensions();
            let (px_width, px_height) = (px_width as f32, px_height as f32);
            if px_width == 0.0 || px_height == 0.0 {
                return Ok(());
            }
            // natural size at IMAGE_DPI, in points
            let natural_width = px_width * 72.0 / IMAGE_DPI;
            let natural_height = px_height * 72.0 / IMAGE_DPI;

            Image::from_dynamic_image(decoded).add_to_layer(
                layer.clone(),
                ImageTransform {
                    translate_x: Some(mm(*x)),
                    translate_y: Some(mm(flip(y + height))),
                    scale_x: Some(width / natural_width),
                    scale_y: Some(height / natural_height),
                    dpi: Some(IMAGE_DPI),
                    ..Default::default()
                },
            );
        }
    }
    Ok(())
}
