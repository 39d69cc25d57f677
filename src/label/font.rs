//! The face labels are drawn with.
//!
//! A font file can be configured; otherwise the Hack typeface embedded in the
//! binary is used. Hack is monospaced, which keeps the `M`-based centering
//! exact.

use ab_glyph::{Font, FontArc, GlyphId, PxScale, ScaleFont, point};
use image::{Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

/// Pixels per em, also the distance between baselines.
pub const FONT_SIZE_PX: f32 = 19.0;

static EMBEDDED_FONT: &[u8] = epaint_default_fonts::HACK_REGULAR;

#[derive(Debug, Error)]
pub enum FontError {
    #[error("reading font {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing font: {0}")]
    Parse(#[from] ab_glyph::InvalidFont),
}

#[derive(Clone)]
pub struct LabelFont {
    font: FontArc,
    scale: PxScale,
}

impl std::fmt::Debug for LabelFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelFont")
            .field("scale", &self.scale)
            .finish_non_exhaustive()
    }
}

impl LabelFont {
    fn new(font: FontArc) -> Self {
        // PxScale is measured in line height, convert from the em size
        let units_per_em = font.units_per_em().unwrap_or(1000.0);
        let scale = PxScale::from(FONT_SIZE_PX * font.height_unscaled() / units_per_em);
        LabelFont { font, scale }
    }

    pub fn embedded() -> Result<Self, FontError> {
        Ok(Self::new(FontArc::try_from_slice(EMBEDDED_FONT)?))
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self, FontError> {
        Ok(Self::new(FontArc::try_from_vec(data)?))
    }

    pub fn load(path: &Path) -> Result<Self, FontError> {
        let data = std::fs::read(path).map_err(|source| FontError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(data)
    }

    /// Loads the configured font, falling back to the embedded one.
    ///
    /// Failures are logged rather than returned. `None` means no font could be
    /// loaded at all and rendering will fail per request.
    pub fn load_or_embedded(path: Option<&Path>) -> Option<Self> {
        if let Some(path) = path {
            match Self::load(path) {
                Ok(font) => {
                    info!("Loaded font from {}", path.display());
                    return Some(font);
                }
                Err(e) => error!("Unable to load font: {e}. Falling back to the embedded font"),
            }
        }

        match Self::embedded() {
            Ok(font) => Some(font),
            Err(e) => {
                error!("Unable to load embedded font: {e}");
                None
            }
        }
    }

    /// Horizontal advance of `ch` in pixels.
    pub fn advance(&self, ch: char) -> f32 {
        self.font
            .as_scaled(self.scale)
            .h_advance(self.font.glyph_id(ch))
    }

    pub fn line_spacing(&self) -> i32 {
        FONT_SIZE_PX as i32
    }

    /// Draws `text` with its baseline at `baseline`, starting at `x`.
    pub fn draw_text(&self, img: &mut RgbaImage, x: i32, baseline: i32, text: &str, color: Rgba<u8>) {
        let scaled = self.font.as_scaled(self.scale);
        let mut caret = x as f32;
        let mut previous: Option<GlyphId> = None;

        for ch in text.chars() {
            let id = self.font.glyph_id(ch);
            if let Some(previous) = previous {
                caret += scaled.kern(previous, id);
            }
            let glyph = id.with_scale_and_position(self.scale, point(caret, baseline as f32));
            caret += scaled.h_advance(id);
            previous = Some(id);

            let Some(outlined) = self.font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                blend_pixel(
                    img,
                    bounds.min.x as i32 + gx as i32,
                    bounds.min.y as i32 + gy as i32,
                    color,
                    coverage,
                );
            });
        }
    }
}

/// Composites `color`, weighted by `coverage`, over the pixel at (x, y).
/// Coordinates outside the canvas are clipped.
pub(crate) fn blend_pixel(img: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>, coverage: f32) {
    if x < 0 || y < 0 || x >= img.width() as i32 || y >= img.height() as i32 {
        return;
    }

    let src_a = color[3] as f32 / 255.0 * coverage.clamp(0.0, 1.0);
    if src_a <= 0.0 {
        return;
    }

    let dst = img.get_pixel_mut(x as u32, y as u32);
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);

    for c in 0..3 {
        let blended = (color[c] as f32 * src_a + dst[c] as f32 * dst_a * (1.0 - src_a)) / out_a;
        dst[c] = blended.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round() as u8;
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);
    const GREEN: Rgba<u8> = Rgba([60, 128, 60, 255]);

    #[test]
    fn test_embedded_font_parses() {
        let font = LabelFont::embedded().unwrap();
        assert!(font.advance('M') > 5.0);
        assert_eq!(font.line_spacing(), 19);
    }

    #[test]
    fn test_embedded_font_is_monospaced() {
        let font = LabelFont::embedded().unwrap();
        let m = font.advance('M');
        for ch in ['1', '.', '-', '+', '%', 'S', 'E', 'K'] {
            assert!((font.advance(ch) - m).abs() < 0.01, "{ch}");
        }
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        let result = LabelFont::from_bytes(b"definitely not a font".to_vec());
        assert!(matches!(result, Err(FontError::Parse(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let err = LabelFont::load(Path::new("/nonexistent/White Rabbit.ttf")).unwrap_err();
        assert!(matches!(err, FontError::Read { .. }));
        assert!(err.to_string().contains("White Rabbit.ttf"));
    }

    #[test]
    fn test_load_from_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), EMBEDDED_FONT).unwrap();

        let font = LabelFont::load(file.path()).unwrap();
        let embedded = LabelFont::embedded().unwrap();
        assert_eq!(font.advance('M'), embedded.advance('M'));
    }

    #[test]
    fn test_load_or_embedded_falls_back() {
        assert!(LabelFont::load_or_embedded(Some(Path::new("/nonexistent/font.ttf"))).is_some());
        assert!(LabelFont::load_or_embedded(None).is_some());
    }

    #[test]
    fn test_draw_text_sits_on_baseline() {
        let mut img = RgbaImage::from_pixel(64, 40, TRANSPARENT);
        LabelFont::embedded()
            .unwrap()
            .draw_text(&mut img, 2, 30, "M", GREEN);

        let rows: Vec<u32> = img
            .enumerate_pixels()
            .filter(|(_, _, p)| p[3] > 0)
            .map(|(_, y, _)| y)
            .collect();
        assert!(!rows.is_empty());
        // Capitals stay above the baseline and span most of the em
        assert!(rows.iter().all(|y| *y <= 30));
        assert!(rows.iter().min().unwrap() < &20);
    }

    #[test]
    fn test_blend_over_transparent_keeps_color() {
        let mut img = RgbaImage::from_pixel(1, 1, TRANSPARENT);
        blend_pixel(&mut img, 0, 0, Rgba([0, 0, 0, 60]), 1.0);
        assert_eq!(*img.get_pixel(0, 0), Rgba([0, 0, 0, 60]));

        let mut img = RgbaImage::from_pixel(1, 1, TRANSPARENT);
        blend_pixel(&mut img, 0, 0, GREEN, 1.0);
        assert_eq!(*img.get_pixel(0, 0), GREEN);
    }

    #[test]
    fn test_blend_over_opaque() {
        let mut img = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 255]));
        blend_pixel(&mut img, 0, 0, Rgba([0, 0, 0, 255]), 0.5);
        let pixel = img.get_pixel(0, 0);
        assert_eq!(pixel[3], 255);
        assert!((127..=128).contains(&pixel[0]));
    }

    #[test]
    fn test_blend_clips_outside_canvas() {
        let mut img = RgbaImage::from_pixel(2, 2, TRANSPARENT);
        blend_pixel(&mut img, -1, 0, GREEN, 1.0);
        blend_pixel(&mut img, 0, 2, GREEN, 1.0);
        assert!(img.pixels().all(|p| *p == TRANSPARENT));
    }
}
