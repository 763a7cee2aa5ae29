/// The 16 EGA colours as RGB.
pub const EGA_COLOURS: [[u8; 3]; 16] = [
    [0x00, 0x00, 0x00],
    [0x00, 0x00, 0xaa],
    [0x00, 0xaa, 0x00],
    [0x00, 0xaa, 0xaa],
    [0xaa, 0x00, 0x00],
    [0xaa, 0x00, 0xaa],
    [0xaa, 0x55, 0x00],
    [0xaa, 0xaa, 0xaa],
    [0x55, 0x55, 0x55],
    [0x55, 0x55, 0xff],
    [0x55, 0xff, 0x55],
    [0x55, 0xff, 0xff],
    [0xff, 0x55, 0x55],
    [0xff, 0x55, 0xff],
    [0xff, 0xff, 0x55],
    [0xff, 0xff, 0xff],
];

/// Fills the first 16 entries of a 256-colour RGB palette with the EGA colours.
pub fn fill_ega_colours(palette: &mut [u8; 768]) {
    for (n, rgb) in EGA_COLOURS.iter().enumerate() {
        palette[n * 3..n * 3 + 3].copy_from_slice(rgb);
    }
}

/// Opaque RGBA for an EGA colour index; only the low nibble is used.
pub fn ega_rgba(index: u8) -> [u8; 4] {
    let [r, g, b] = EGA_COLOURS[(index & 0xf) as usize];
    [r, g, b, 0xff]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brown_and_white() {
        assert_eq!(ega_rgba(6), [0xaa, 0x55, 0x00, 0xff]);
        assert_eq!(ega_rgba(0x1f), [0xff, 0xff, 0xff, 0xff]);
        let mut palette = [0u8; 768];
        fill_ega_colours(&mut palette);
        assert_eq!(&palette[9 * 3..10 * 3], &[0x55, 0x55, 0xff]);
        assert_eq!(&palette[16 * 3..17 * 3], &[0, 0, 0]);
    }
}
