//! Glyph atlas for one font at one pixel size
//!
//! Printable ASCII is rasterized up front with fontdue and shelf-packed into an
//! RGBA image: white texels carrying glyph coverage in alpha, so the sprite
//! path can draw text with an ordinary tint.

use std::path::Path;

use crate::{
    error::{Result, SolarisError},
    gfx::backend::Rectangle,
};

pub const FIRST_CHAR: char = ' ';
pub const LAST_CHAR: char = '~';
const FALLBACK_CHAR: char = '?';
const GLYPH_PADDING: u32 = 1;

/// Coverage bitmap of one glyph before packing
#[derive(Debug, Clone)]
pub struct RasterGlyph {
    pub ch: char,
    pub width: u32,
    pub height: u32,
    /// Horizontal bearing from the pen position
    pub xmin: f32,
    /// Bottom of the bitmap relative to the baseline, y up
    pub ymin: f32,
    pub advance: f32,
    pub coverage: Vec<u8>,
}

/// Packed glyph, all metrics at the atlas base size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glyph {
    pub source: Rectangle,
    /// Offset of the bitmap's top-left from the pen position at the line top
    pub offset: [f32; 2],
    pub advance: f32,
}

#[derive(Debug, Clone)]
pub struct FontAtlas {
    pub base_size: u32,
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
    glyphs: Vec<Glyph>,
}

impl FontAtlas {
    pub fn load(path: &Path, size: u32) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| SolarisError::io(path, e))?;
        Self::from_bytes(&bytes, size).map_err(|reason| SolarisError::Font {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn from_bytes(bytes: &[u8], size: u32) -> std::result::Result<Self, String> {
        if size == 0 {
            return Err("font size must be positive".to_string());
        }
        let px = size as f32;
        let font = fontdue::Font::from_bytes(
            bytes,
            fontdue::FontSettings {
                scale: px,
                ..fontdue::FontSettings::default()
            },
        )
        .map_err(|e| e.to_string())?;

        let ascent = font
            .horizontal_line_metrics(px)
            .map(|metrics| metrics.ascent)
            .unwrap_or(px);

        let glyphs = (FIRST_CHAR..=LAST_CHAR)
            .map(|ch| {
                let (metrics, coverage) = font.rasterize(ch, px);
                RasterGlyph {
                    ch,
                    width: metrics.width as u32,
                    height: metrics.height as u32,
                    xmin: metrics.xmin as f32,
                    ymin: metrics.ymin as f32,
                    advance: metrics.advance_width,
                    coverage,
                }
            })
            .collect();

        Ok(Self::pack(size, ascent, glyphs))
    }

    /// Shelf-packs `glyphs` into a power-of-two wide atlas
    ///
    /// `glyphs` must hold one entry per printable ASCII character, in order.
    pub fn pack(base_size: u32, ascent: f32, glyphs: Vec<RasterGlyph>) -> Self {
        let area: u32 = glyphs
            .iter()
            .map(|g| (g.width + GLYPH_PADDING) * (g.height + GLYPH_PADDING))
            .sum();
        let widest = glyphs.iter().map(|g| g.width).max().unwrap_or(0) + 2 * GLYPH_PADDING;
        let width = ((area as f32).sqrt().ceil() as u32)
            .max(widest)
            .max(1)
            .next_power_of_two();

        let mut cursor_x = GLYPH_PADDING;
        let mut cursor_y = GLYPH_PADDING;
        let mut row_height = 0;
        let mut placed = Vec::with_capacity(glyphs.len());
        for glyph in &glyphs {
            if cursor_x + glyph.width + GLYPH_PADDING > width {
                cursor_x = GLYPH_PADDING;
                cursor_y += row_height + GLYPH_PADDING;
                row_height = 0;
            }
            placed.push((cursor_x, cursor_y));
            cursor_x += glyph.width + GLYPH_PADDING;
            row_height = row_height.max(glyph.height);
        }
        let height = (cursor_y + row_height + GLYPH_PADDING).max(1);

        let mut rgba = vec![0u8; (width * height * 4) as usize];
        for pixel in rgba.chunks_exact_mut(4) {
            pixel[..3].copy_from_slice(&[255, 255, 255]);
        }

        let mut packed = Vec::with_capacity(glyphs.len());
        for (glyph, &(x, y)) in glyphs.iter().zip(&placed) {
            for row in 0..glyph.height {
                for col in 0..glyph.width {
                    let coverage = glyph
                        .coverage
                        .get((row * glyph.width + col) as usize)
                        .copied()
                        .unwrap_or(0);
                    let index = (((y + row) * width + x + col) * 4 + 3) as usize;
                    rgba[index] = coverage;
                }
            }

            packed.push(Glyph {
                source: Rectangle::new(x as f32, y as f32, glyph.width as f32, glyph.height as f32),
                offset: [glyph.xmin, ascent - (glyph.ymin + glyph.height as f32)],
                advance: glyph.advance,
            });
        }

        log::debug!(
            "font atlas {}x{} for {} glyphs at {}px",
            width,
            height,
            packed.len(),
            base_size
        );

        Self {
            base_size,
            width,
            height,
            rgba,
            glyphs: packed,
        }
    }

    /// Glyph for `ch`; characters outside printable ASCII use `?`
    pub fn glyph(&self, ch: char) -> Option<&Glyph> {
        let ch = if (FIRST_CHAR..=LAST_CHAR).contains(&ch) {
            ch
        } else {
            FALLBACK_CHAR
        };
        self.glyphs.get(ch as usize - FIRST_CHAR as usize)
    }

    fn scale(&self, size: f32) -> f32 {
        size / self.base_size.max(1) as f32
    }

    /// `[width, height]` of `text`; lines break on `\n`
    pub fn measure(&self, text: &str, size: f32, spacing: f32) -> [f32; 2] {
        let scale = self.scale(size);
        let mut widest: f32 = 0.0;
        let mut lines = 0;

        for line in text.split('\n') {
            lines += 1;
            let mut width = 0.0;
            let mut count = 0;
            for ch in line.chars() {
                if let Some(glyph) = self.glyph(ch) {
                    width += glyph.advance * scale;
                    count += 1;
                }
            }
            if count > 1 {
                width += spacing * (count - 1) as f32;
            }
            widest = widest.max(width);
        }

        [widest, size * lines as f32]
    }

    /// Source and destination rectangles for every visible glyph of `text`
    pub fn layout(
        &self,
        text: &str,
        position: [f32; 2],
        size: f32,
        spacing: f32,
    ) -> Vec<(Rectangle, Rectangle)> {
        let scale = self.scale(size);
        let mut quads = Vec::with_capacity(text.len());
        let [mut pen_x, mut pen_y] = position;

        for ch in text.chars() {
            if ch == '\n' {
                pen_x = position[0];
                pen_y += size;
                continue;
            }
            let Some(glyph) = self.glyph(ch) else {
                continue;
            };

            if glyph.source.width > 0.0 && glyph.source.height > 0.0 {
                let dest = Rectangle::new(
                    pen_x + glyph.offset[0] * scale,
                    pen_y + glyph.offset[1] * scale,
                    glyph.source.width * scale,
                    glyph.source.height * scale,
                );
                quads.push((glyph.source, dest));
            }
            pen_x += glyph.advance * scale + spacing;
        }

        quads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every glyph a filled 4x8 box on the baseline, 5 px advance, at 10 px
    fn box_atlas() -> FontAtlas {
        let glyphs = (FIRST_CHAR..=LAST_CHAR)
            .map(|ch| {
                let (width, height) = if ch == ' ' { (0, 0) } else { (4, 8) };
                RasterGlyph {
                    ch,
                    width,
                    height,
                    xmin: 1.0,
                    ymin: 0.0,
                    advance: 5.0,
                    coverage: vec![255; (width * height) as usize],
                }
            })
            .collect();
        FontAtlas::pack(10, 8.0, glyphs)
    }

    #[test]
    fn test_glyphs_do_not_overlap() {
        let atlas = box_atlas();
        assert!(atlas.width.is_power_of_two());

        let rects: Vec<Rectangle> = (FIRST_CHAR..=LAST_CHAR)
            .filter_map(|ch| atlas.glyph(ch))
            .map(|g| g.source)
            .filter(|r| r.width > 0.0)
            .collect();
        for (i, a) in rects.iter().enumerate() {
            assert!(a.x + a.width <= atlas.width as f32);
            assert!(a.y + a.height <= atlas.height as f32);
            for b in &rects[i + 1..] {
                let disjoint = a.x + a.width <= b.x
                    || b.x + b.width <= a.x
                    || a.y + a.height <= b.y
                    || b.y + b.height <= a.y;
                assert!(disjoint, "{:?} overlaps {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_coverage_lands_in_alpha() {
        let atlas = box_atlas();
        let source = atlas.glyph('A').unwrap().source;
        let index = ((source.y as u32 * atlas.width + source.x as u32) * 4) as usize;
        assert_eq!(&atlas.rgba[index..index + 4], &[255, 255, 255, 255]);
        // padding stays transparent
        assert_eq!(atlas.rgba[3], 0);
    }

    #[test]
    fn test_measure_scales_and_spaces() {
        let atlas = box_atlas();
        // 7 glyphs: 7 * 5 * 2 + 6 * 3
        assert_eq!(atlas.measure("SOLARIS", 20.0, 3.0), [88.0, 20.0]);
        assert_eq!(atlas.measure("", 20.0, 3.0), [0.0, 20.0]);
        assert_eq!(atlas.measure("ab\nabc", 10.0, 0.0), [15.0, 20.0]);
    }

    #[test]
    fn test_layout_places_glyph_tops_from_ascent() {
        let atlas = box_atlas();
        let quads = atlas.layout("A B", [100.0, 50.0], 20.0, 2.0);

        // the space has no bitmap but still advances the pen
        assert_eq!(quads.len(), 2);
        let (_, first) = quads[0];
        assert_eq!(first, Rectangle::new(102.0, 50.0, 8.0, 16.0));
        let (_, second) = quads[1];
        assert_eq!(second.x, 102.0 + 2.0 * (10.0 + 2.0));
    }

    #[test]
    fn test_non_ascii_falls_back() {
        let atlas = box_atlas();
        assert_eq!(atlas.glyph('é'), atlas.glyph('?'));
    }

    #[test]
    fn test_missing_font_file() {
        let result = FontAtlas::load(Path::new("/nonexistent/font.ttf"), 32);
        assert!(matches!(result, Err(SolarisError::Io { .. })));
    }

    #[test]
    fn test_garbage_font_bytes() {
        assert!(FontAtlas::from_bytes(b"definitely not a font", 32).is_err());
    }
}
