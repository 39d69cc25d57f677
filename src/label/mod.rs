//! Label rendering: short lines of centered text on a transparent canvas.

pub mod font;

pub use font::{FontError, LabelFont};

use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

pub const MAX_LINES: usize = 3;
pub const BORDER_WIDTH: u32 = 2;

const SHADOW_COLOR: Rgba<u8> = Rgba([0, 0, 0, 60]);
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub width: u32,
    pub height: u32,
    pub lines: Vec<String>,
    pub color: Rgba<u8>,
    pub border: bool,
    pub shadow: bool,
}

/// Renders `label` into a new canvas of exactly `label.width` x `label.height`.
///
/// Lines past [`MAX_LINES`] are dropped. Every line is centered on the canvas
/// assuming all of its characters are as wide as an `M`.
pub fn render(label: &Label, font: &LabelFont) -> RgbaImage {
    let lines = &label.lines[..label.lines.len().min(MAX_LINES)];
    let mut img = RgbaImage::from_pixel(label.width, label.height, TRANSPARENT);

    if label.border {
        draw_border(&mut img, BORDER_WIDTH, label.color);
    }

    let advance = font.advance('M');
    let center = (label.width / 2) as f32;
    let spacing = font.line_spacing();
    let offsets: Vec<i32> = lines
        .iter()
        .map(|line| (center - line.chars().count() as f32 * advance / 2.0) as i32)
        .collect();

    if label.shadow {
        for (i, (line, offset)) in lines.iter().zip(&offsets).enumerate() {
            let baseline = (i as i32 + 1) * spacing + 1;
            font.draw_text(&mut img, 4 + offset, baseline, line, SHADOW_COLOR);
        }
    }

    for (i, (line, offset)) in lines.iter().zip(&offsets).enumerate() {
        let baseline = (i as i32 + 1) * spacing;
        font.draw_text(&mut img, 3 + offset, baseline, line, label.color);
    }

    img
}

/// Paints a solid frame `width` pixels wide along the canvas edge.
pub fn draw_border(img: &mut RgbaImage, width: u32, color: Rgba<u8>) {
    let (w, h) = img.dimensions();
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        if x < width || x >= w.saturating_sub(width) || y < width || y >= h.saturating_sub(width) {
            *pixel = color;
        }
    }
}

pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}
