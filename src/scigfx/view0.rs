use std::ops::Range;

use crate::error::{Error, Result};
use crate::scigfx::palette;
use crate::scires::stream::ByteCursor;

/// What image-cell offsets inside a cell header are relative to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellOffsetBase {
    Cell,
    View,
}

/// Which nibble of a run byte holds the colour; the other one is the count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunNibbles {
    ColorHigh,
    ColorLow,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FillOrder {
    ColumnMajor,
    RowMajor,
}

/// Layout details of the view format that differ between the descriptions
/// of it in circulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewOptions {
    pub offsets: CellOffsetBase,
    pub nibbles: RunNibbles,
    pub fill_order: FillOrder,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self { offsets: CellOffsetBase::Cell, nibbles: RunNibbles::ColorHigh, fill_order: FillOrder::ColumnMajor }
    }
}

impl ViewOptions {
    /// The layout the SCI0 interpreter itself reads.
    pub fn sci0_interpreter() -> Self {
        Self { offsets: CellOffsetBase::View, nibbles: RunNibbles::ColorLow, fill_order: FillOrder::RowMajor }
    }
}

#[derive(Debug)]
pub struct ImageCell {
    pub width: u16,
    pub height: u16,
    pub x_offset: i8,
    pub y_offset: i8,
    pub color_key: u8,
    /// Colour indices, row-major.
    pub visual: Vec<u8>,
    /// RGBA pixels, row-major; the colour key is fully transparent.
    pub rgba: Vec<u8>,
}

impl ImageCell {
    pub fn color_index(&self, x: u16, y: u16) -> u8 {
        self.visual[y as usize * self.width as usize + x as usize]
    }

    pub fn pixel(&self, x: u16, y: u16) -> [u8; 4] {
        let n = (y as usize * self.width as usize + x as usize) * 4;
        [self.rgba[n], self.rgba[n + 1], self.rgba[n + 2], self.rgba[n + 3]]
    }
}

#[derive(Debug)]
pub struct Cell {
    /// Byte range of the cell within the view resource.
    pub span: Range<usize>,
    pub image_cells: Vec<ImageCell>,
}

#[derive(Debug)]
pub struct View0 {
    pub mirror_mask: u16,
    pub cells: Vec<Cell>,
}

/// Pairs every start offset with the next higher distinct offset, the end
/// offset included. Groups may share a start offset and then get the same span.
fn pair_spans(starts: &[usize], end: usize) -> Result<Vec<Range<usize>>> {
    let mut bounds: Vec<usize> = starts.to_vec();
    bounds.push(end);
    bounds.sort_unstable();
    bounds.dedup();

    starts
        .iter()
        .map(|&start| {
            if start >= end {
                return Err(Error::format(format!("offset {} is beyond end {}", start, end)));
            }
            let next = bounds.partition_point(|&b| b <= start);
            Ok(start..bounds[next])
        })
        .collect()
}

fn read_offsets(rdr: &mut ByteCursor, count: usize) -> Result<Vec<usize>> {
    (0..count).map(|_| rdr.get_u16().map(usize::from)).collect()
}

fn decode_image_cell(data: &[u8], options: &ViewOptions) -> Result<ImageCell> {
    let mut rdr = ByteCursor::new(data);
    let width = rdr.get_u16()?;
    let height = rdr.get_u16()?;
    let x_offset = rdr.get_i8()?;
    let y_offset = rdr.get_i8()?;
    let color_key = rdr.get()?; // transparency value

    let num_pixels = width as usize * height as usize;
    // a run byte covers at most 15 pixels
    let min_run_bytes = num_pixels.div_ceil(15);
    if min_run_bytes > rdr.remaining() {
        return Err(Error::OutOfBounds { offset: rdr.position() + min_run_bytes, length: data.len() });
    }
    let mut visual = vec![color_key; num_pixels];
    let mut n = 0;
    while n < num_pixels {
        let byte = rdr.get()?;
        let (color, repeat) = match options.nibbles {
            RunNibbles::ColorHigh => (byte >> 4, byte & 0xf),
            RunNibbles::ColorLow => (byte & 0xf, byte >> 4),
        };
        for _ in 0..repeat {
            if n == num_pixels {
                break;
            }
            let pos = match options.fill_order {
                FillOrder::RowMajor => n,
                FillOrder::ColumnMajor => (n % height as usize) * width as usize + n / height as usize,
            };
            visual[pos] = color;
            n += 1;
        }
    }

    let rgba = visual
        .iter()
        .flat_map(|&color| if color == color_key { [0; 4] } else { palette::ega_rgba(color) })
        .collect();
    Ok(ImageCell { width, height, x_offset, y_offset, color_key, visual, rgba })
}

fn decode_cell(data: &[u8], span: Range<usize>, options: &ViewOptions) -> Result<Cell> {
    let mut rdr = ByteCursor::new(&data[span.clone()]);
    let num_image_cells = rdr.get_u16()? as usize;
    rdr.skip(2)?;
    let offsets = read_offsets(&mut rdr, num_image_cells)?;

    let (base, end) = match options.offsets {
        CellOffsetBase::Cell => (span.start, span.end),
        CellOffsetBase::View => (0, data.len()),
    };
    let starts: Vec<usize> = offsets.iter().map(|&o| base + o).collect();
    let image_cells = pair_spans(&starts, end)?
        .into_iter()
        .map(|image_span| decode_image_cell(&data[image_span], options))
        .collect::<Result<Vec<_>>>()?;
    Ok(Cell { span, image_cells })
}

impl View0 {
    pub fn new(data: &[u8], options: &ViewOptions) -> Result<Self> {
        let mut rdr = ByteCursor::new(data);
        let num_groups = rdr.get_u16()? as usize;
        let mirror_mask = rdr.get_u16()?;
        rdr.skip(4)?;
        let cell_offsets = read_offsets(&mut rdr, num_groups)?;

        let cells = pair_spans(&cell_offsets, data.len())?
            .into_iter()
            .map(|span| decode_cell(data, span, options))
            .collect::<Result<Vec<_>>>()?;
        log::debug!("view: {} cells, mirror mask 0x{:04x}", cells.len(), mirror_mask);
        Ok(Self { mirror_mask, cells })
    }

    pub fn is_mirrored(&self, cell: usize) -> bool {
        cell < 16 && (self.mirror_mask >> cell) & 1 != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Three groups, the first two sharing one cell.
    fn shared_start_view() -> Vec<u8> {
        let mut data = vec![3, 0, 0b10, 0, 0, 0, 0, 0];
        data.extend_from_slice(&[14, 0, 14, 0, 28, 0]);
        // cell at 14: one image cell at relative offset 6
        data.extend_from_slice(&[1, 0, 0, 0, 6, 0]);
        data.extend_from_slice(&[2, 0, 1, 0, 0, 0, 0, 0x52]);
        // cell at 28: 1x2 image, colour 3 is the key
        data.extend_from_slice(&[1, 0, 0, 0, 6, 0]);
        data.extend_from_slice(&[1, 0, 2, 0, 0xff, 1, 3, 0x32]);
        data
    }

    #[test]
    fn shared_start_offsets_get_same_span() {
        let data = shared_start_view();
        let view = View0::new(&data, &ViewOptions::default()).unwrap();
        assert_eq!(view.cells.len(), 3);
        assert_eq!(view.cells[0].span, 14..28);
        assert_eq!(view.cells[1].span, 14..28);
        assert_eq!(view.cells[2].span, 28..42);
        assert!(view.is_mirrored(1));
        assert!(!view.is_mirrored(0));
    }

    #[test]
    fn run_length_expansion() {
        let data = shared_start_view();
        let view = View0::new(&data, &ViewOptions::default()).unwrap();
        let image = &view.cells[0].image_cells[0];
        assert_eq!((image.width, image.height), (2, 1));
        assert_eq!(image.visual, vec![5, 5]);
        assert_eq!(image.pixel(1, 0), [0xaa, 0x00, 0xaa, 0xff]);

        let image = &view.cells[2].image_cells[0];
        assert_eq!((image.x_offset, image.y_offset), (-1, 1));
        assert_eq!(image.rgba, vec![0; 8]);
    }

    #[test]
    fn column_major_fill() {
        let mut data = vec![1, 0, 0, 0, 0, 0, 0, 0, 10, 0];
        data.extend_from_slice(&[1, 0, 0, 0, 6, 0]);
        data.extend_from_slice(&[2, 0, 2, 0, 0, 0, 0xff, 0x11, 0x21, 0x31, 0x41]);
        let view = View0::new(&data, &ViewOptions::default()).unwrap();
        let image = &view.cells[0].image_cells[0];
        assert_eq!(image.color_index(0, 0), 1);
        assert_eq!(image.color_index(0, 1), 2);
        assert_eq!(image.color_index(1, 0), 3);
        assert_eq!(image.color_index(1, 1), 4);
    }

    #[test]
    fn interpreter_layout() {
        // Absolute image offsets, count in the high nibble, row-major.
        let mut data = vec![1, 0, 0, 0, 0, 0, 0, 0, 10, 0];
        data.extend_from_slice(&[1, 0, 0, 0, 16, 0]);
        data.extend_from_slice(&[3, 0, 1, 0, 0, 0, 9, 0x24, 0x19]);
        let view = View0::new(&data, &ViewOptions::sci0_interpreter()).unwrap();
        let image = &view.cells[0].image_cells[0];
        assert_eq!(image.visual, vec![4, 4, 9]);
        assert_eq!(image.pixel(2, 0)[3], 0);
    }

    #[test]
    fn truncated_run_stream_fails() {
        let mut data = vec![1, 0, 0, 0, 0, 0, 0, 0, 10, 0];
        data.extend_from_slice(&[1, 0, 0, 0, 6, 0]);
        data.extend_from_slice(&[4, 0, 4, 0, 0, 0, 0, 0x12]);
        assert!(matches!(View0::new(&data, &ViewOptions::default()), Err(Error::OutOfBounds { .. })));
    }

    #[test]
    fn oversized_image_header_fails_before_expanding() {
        let mut data = vec![1, 0, 0, 0, 0, 0, 0, 0, 10, 0];
        data.extend_from_slice(&[1, 0, 0, 0, 6, 0]);
        data.extend_from_slice(&[0xff, 0xff, 0xff, 0xff, 0, 0, 0, 0x1f]);
        assert_eq!(data.len(), 24);
        assert!(matches!(View0::new(&data, &ViewOptions::default()), Err(Error::OutOfBounds { .. })));
    }

    #[test]
    fn group_offset_past_end_fails() {
        let data = vec![1, 0, 0, 0, 0, 0, 0, 0, 99, 0];
        assert!(matches!(View0::new(&data, &ViewOptions::default()), Err(Error::Format(_))));
    }
}
