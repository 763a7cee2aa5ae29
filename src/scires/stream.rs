use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};

/// Sequential reader over a byte slice. Every read is bounds checked and an
/// exhausted cursor is an error: running out of input means the resource is
/// truncated.
#[derive(Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn out_of_bounds(&self, offset: usize) -> Error {
        Error::OutOfBounds { offset, length: self.data.len() }
    }

    pub fn peek(&self) -> Result<u8> {
        self.data.get(self.pos).copied().ok_or_else(|| self.out_of_bounds(self.pos))
    }

    pub fn get(&mut self) -> Result<u8> {
        let value = self.peek()?;
        self.pos += 1;
        Ok(value)
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        let new_pos = self.pos.checked_add(n).ok_or_else(|| self.out_of_bounds(usize::MAX))?;
        if new_pos > self.data.len() {
            return Err(self.out_of_bounds(new_pos));
        }
        self.pos = new_pos;
        Ok(())
    }

    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(self.out_of_bounds(pos));
        }
        self.pos = pos;
        Ok(())
    }

    pub fn get_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let start = self.pos;
        self.skip(n)?;
        Ok(&self.data[start..self.pos])
    }

    pub fn get_i8(&mut self) -> Result<i8> {
        Ok(self.get()? as i8)
    }

    pub fn get_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.get_bytes(2)?))
    }

    pub fn get_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.get_bytes(4)?))
    }
}

/// Bit reader used by the decompressors. LZW reads codes LSB first, the
/// Huffman coder reads MSB first; a single stream only ever uses one order.
pub struct Streamer<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> Streamer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    fn next_bit(&mut self, msb_first: bool) -> Result<u32> {
        let byte = *self.data.get(self.bit_pos / 8).ok_or(Error::OutOfBounds {
            offset: self.bit_pos / 8,
            length: self.data.len(),
        })?;
        let shift = if msb_first { 7 - (self.bit_pos % 8) } else { self.bit_pos % 8 };
        self.bit_pos += 1;
        Ok(((byte >> shift) & 1) as u32)
    }

    pub fn get_bits_lsb(&mut self, num_bits: u32) -> Result<u32> {
        let mut value = 0;
        for n in 0..num_bits {
            value |= self.next_bit(false)? << n;
        }
        Ok(value)
    }

    pub fn get_bits_msb(&mut self, num_bits: u32) -> Result<u32> {
        let mut value = 0;
        for _ in 0..num_bits {
            value = (value << 1) | self.next_bit(true)?;
        }
        Ok(value)
    }

    pub fn get_byte(&mut self) -> Result<u8> {
        Ok(self.get_bits_msb(8)? as u8)
    }
}
