use packed_struct::prelude::*;

use crate::error::{Error, Result};
use crate::scires::stream::ByteCursor;

#[derive(PackedStruct)]
#[packed_struct(endian = "lsb")]
pub struct FontHeader {
    pub reserved: u16,
    pub num_chars: u16,
    pub point_size: u16,
}

const FONT_HEADER_SIZE: usize = 6;

/// Order of the two size bytes in front of every glyph bitmap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GlyphHeader {
    HeightFirst,
    WidthFirst,
}

/// Glyph orientation varies between descriptions of the format, so it is
/// chosen by the caller and checked against known output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FontOptions {
    pub glyph_header: GlyphHeader,
    /// Stored rows run bottom to top and are flipped into raster order.
    pub mirror_rows: bool,
}

impl Default for FontOptions {
    fn default() -> Self {
        Self { glyph_header: GlyphHeader::HeightFirst, mirror_rows: true }
    }
}

impl FontOptions {
    /// The layout the SCI0 interpreter itself draws from.
    pub fn sci0_interpreter() -> Self {
        Self { glyph_header: GlyphHeader::WidthFirst, mirror_rows: false }
    }
}

#[derive(Debug)]
pub struct Glyph {
    pub width: u8,
    pub height: u8,
    bits: Vec<bool>,
}

impl Glyph {
    fn parse(data: &[u8], offset: usize, options: &FontOptions) -> Result<Self> {
        let mut rdr = ByteCursor::new(data);
        rdr.seek(offset)?;
        let (height, width) = match options.glyph_header {
            GlyphHeader::HeightFirst => {
                let height = rdr.get()?;
                (height, rdr.get()?)
            }
            GlyphHeader::WidthFirst => {
                let width = rdr.get()?;
                (rdr.get()?, width)
            }
        };

        let stride = (width as usize).div_ceil(8);
        let mut rows: Vec<Vec<bool>> = Vec::with_capacity(height as usize);
        for _ in 0..height {
            let packed = rdr.get_bytes(stride)?;
            let row = (0..width as usize).map(|x| packed[x / 8] & (0x80 >> (x % 8)) != 0).collect();
            rows.push(row);
        }
        if options.mirror_rows {
            rows.reverse();
        }
        Ok(Glyph { width, height, bits: rows.concat() })
    }

    pub fn is_set(&self, x: usize, y: usize) -> bool {
        x < self.width as usize && y < self.height as usize && self.bits[y * self.width as usize + x]
    }

    pub fn render(&self, plot: &mut dyn FnMut(u16, u16)) {
        for y in 0..self.height as usize {
            for x in 0..self.width as usize {
                if self.bits[y * self.width as usize + x] {
                    plot(x as u16, y as u16);
                }
            }
        }
    }
}

#[derive(Debug)]
pub struct Font {
    point_size: u16,
    glyphs: Vec<Glyph>,
}

impl Font {
    pub fn new(data: &[u8], options: &FontOptions) -> Result<Self> {
        let raw_header = data
            .get(..FONT_HEADER_SIZE)
            .ok_or(Error::OutOfBounds { offset: FONT_HEADER_SIZE, length: data.len() })?;
        let header = FontHeader::unpack_from_slice(raw_header)
            .map_err(|e| Error::format(format!("bad font header: {:?}", e)))?;

        let mut rdr = ByteCursor::new(data);
        rdr.seek(FONT_HEADER_SIZE)?;
        let mut glyphs = Vec::with_capacity(header.num_chars as usize);
        for _ in 0..header.num_chars {
            let offset = rdr.get_u16()? as usize;
            glyphs.push(Glyph::parse(data, offset, options)?);
        }
        log::debug!("font: {} glyphs, height {}", glyphs.len(), header.point_size);
        Ok(Self { point_size: header.point_size, glyphs })
    }

    pub fn get_height(&self) -> u16 {
        self.point_size
    }

    pub fn get_number_of_chars(&self) -> usize {
        self.glyphs.len()
    }

    pub fn glyph(&self, ch: u8) -> Option<&Glyph> {
        self.glyphs.get(ch as usize)
    }

    pub fn get_char_width(&self, ch: u8) -> u8 {
        self.glyph(ch).map_or(0, |g| g.width)
    }

    pub fn text_width(&self, text: &[u8]) -> usize {
        text.iter().map(|&ch| self.get_char_width(ch) as usize).sum()
    }

    pub fn render(&self, ch: u8, plot: &mut dyn FnMut(u16, u16)) {
        if let Some(glyph) = self.glyph(ch) {
            glyph.render(plot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_glyph_font() -> Vec<u8> {
        let mut data = vec![0, 0, 2, 0, 2, 0];
        data.extend_from_slice(&[10, 0, 14, 0]);
        // 3x2 glyph, rows padded to a byte
        data.extend_from_slice(&[2, 3, 0b1010_0000, 0b0100_0000]);
        // 9x1 glyph, two bytes per row
        data.extend_from_slice(&[1, 9, 0b1000_0000, 0b1000_0000]);
        data
    }

    #[test]
    fn glyph_grid_ignores_padding() {
        let font = Font::new(&two_glyph_font(), &FontOptions::default()).unwrap();
        assert_eq!(font.get_number_of_chars(), 2);
        assert_eq!(font.get_height(), 2);
        let glyph = font.glyph(0).unwrap();
        assert_eq!((glyph.width, glyph.height), (3, 2));
        assert_eq!(glyph.bits.len(), 6);
        // first stored row ends up at the bottom
        assert!(glyph.is_set(0, 1) && !glyph.is_set(1, 1) && glyph.is_set(2, 1));
        assert!(!glyph.is_set(0, 0) && glyph.is_set(1, 0) && !glyph.is_set(2, 0));
        assert!(!glyph.is_set(3, 0));
    }

    #[test]
    fn wide_glyph_spans_bytes() {
        let font = Font::new(&two_glyph_font(), &FontOptions::default()).unwrap();
        let glyph = font.glyph(1).unwrap();
        let mut plotted = Vec::new();
        glyph.render(&mut |x, y| plotted.push((x, y)));
        assert_eq!(plotted, vec![(0, 0), (8, 0)]);
        assert_eq!(font.text_width(&[0, 1, 1]), 21);
    }

    #[test]
    fn unmirrored_width_first() {
        let options = FontOptions::sci0_interpreter();
        let data = [0, 0, 1, 0, 8, 0, 8, 0, 3, 2, 0b1010_0000, 0b0100_0000];
        let font = Font::new(&data, &options).unwrap();
        let glyph = font.glyph(0).unwrap();
        assert!(glyph.is_set(0, 0) && glyph.is_set(2, 0) && glyph.is_set(1, 1));
    }

    #[test]
    fn truncated_bitmap_fails() {
        let data = [0, 0, 1, 0, 8, 0, 8, 0, 4, 1, 0xff];
        assert!(matches!(Font::new(&data, &FontOptions::default()), Err(Error::OutOfBounds { .. })));
    }
}
