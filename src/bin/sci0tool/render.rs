use std::path::Path;

use anyhow::Result;
use bmp::{px, Image, Pixel};

use sci0_decode::scigfx::font::Font;
use sci0_decode::scigfx::palette;
use sci0_decode::scigfx::view0::ImageCell;

const FONT_SHEET_WIDTH: u32 = 256;

pub fn ega_palette() -> [u8; 768] {
    let mut palette = [0u8; 768];
    palette::fill_ega_colours(&mut palette);
    palette
}

pub fn render_bitmap(path: &Path, width: u32, height: u32, bits: &[u8], palette: &[u8; 768]) -> Result<()> {
    let mut img = Image::new(width, height);
    for (x, y) in img.coordinates() {
        let v = bits[(width * y + x) as usize] as usize;
        let r = palette[v * 3];
        let g = palette[v * 3 + 1];
        let b = palette[v * 3 + 2];
        img.set_pixel(x, y, px!(r, g, b));
    }
    img.save(path)?;
    Ok(())
}

/// Writes one view image, the colour key as magenta.
pub fn render_image_cell(path: &Path, image: &ImageCell) -> Result<()> {
    let width = image.width.max(1) as u32;
    let height = image.height.max(1) as u32;
    let mut img = Image::new(width, height);
    for y in 0..image.height {
        for x in 0..image.width {
            let [r, g, b, a] = image.pixel(x, y);
            let pixel = if a == 0 { px!(255, 0, 255) } else { px!(r, g, b) };
            img.set_pixel(x as u32, y as u32, pixel);
        }
    }
    img.save(path)?;
    Ok(())
}

/// Places the glyphs left to right, wrapping at a fixed sheet width. Only
/// the first 256 glyphs are addressable by a character code.
fn layout_glyphs(font: &Font) -> Vec<(u8, u32, u32)> {
    let line_height = font.get_height().max(1) as u32;
    let (mut base_x, mut base_y) = (0u32, 0u32);
    (0..=u8::MAX)
        .take(font.get_number_of_chars())
        .map(|ch| {
            let char_width = font.get_char_width(ch) as u32;
            if base_x + char_width >= FONT_SHEET_WIDTH {
                base_x = 0;
                base_y += line_height;
            }
            let position = (ch, base_x, base_y);
            base_x += char_width;
            position
        })
        .collect()
}

pub fn render_font(path: &Path, font: &Font) -> Result<()> {
    let line_height = font.get_height().max(1) as u32;
    let positions = layout_glyphs(font);
    let last_row = positions.last().map_or(0, |&(_, _, y)| y);

    let (width, height) = (FONT_SHEET_WIDTH, last_row + line_height);
    let mut img = Image::new(width, height);
    for &(ch, base_x, base_y) in &positions {
        font.render(ch, &mut |x, y| {
            let (x, y) = (base_x + x as u32, base_y + y as u32);
            if x < width && y < height {
                img.set_pixel(x, y, px!(255, 0, 0));
            }
        });
    }
    img.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sci0_decode::scigfx::font::FontOptions;

    // `count` glyphs sharing one 8x1 bitmap
    fn font_with_glyphs(count: u16) -> Font {
        let glyph_offset = 6 + 2 * count;
        let mut data = vec![0, 0];
        data.extend_from_slice(&count.to_le_bytes());
        data.extend_from_slice(&[1, 0]);
        for _ in 0..count {
            data.extend_from_slice(&glyph_offset.to_le_bytes());
        }
        data.extend_from_slice(&[1, 8, 0xff]);
        Font::new(&data, &FontOptions::default()).unwrap()
    }

    #[test]
    fn layout_stops_at_last_character_code() {
        let font = font_with_glyphs(300);
        assert_eq!(font.get_number_of_chars(), 300);
        let positions = layout_glyphs(&font);
        assert_eq!(positions.len(), 256);
        assert_eq!(positions[255].0, 255);
        // 31 glyphs of width 8 fit before the 256 pixel edge
        assert_eq!(positions[31], (31, 0, 1));
    }

    #[test]
    fn font_sheet_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("font.bmp");
        render_font(&path, &font_with_glyphs(300)).unwrap();
        let image = bmp::open(&path).unwrap();
        assert_eq!(image.get_width(), FONT_SHEET_WIDTH);
        assert_eq!(image.get_height(), 9);
    }
}
