use crate::error::{Error, Result};
use crate::scires::resource::CompressionMethod;
use crate::scires::stream::Streamer;

/// Decompresses `input` with the given method. The result is exactly
/// `expected_len` bytes long or the call fails.
pub fn decompress(method: CompressionMethod, input: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    match method {
        CompressionMethod::None => decompress_none(input, expected_len),
        CompressionMethod::LZW => decompress_lzw(input, expected_len),
        CompressionMethod::Huffman => decompress_huffman(input, expected_len),
    }
}

/// Same as [`decompress`] but taking the raw method number from a record header.
pub fn decompress_raw(method: u16, input: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    decompress(CompressionMethod::new(method)?, input, expected_len)
}

fn exhausted(what: &'static str) -> impl Fn(Error) -> Error {
    move |_| Error::corrupt(format!("{} bitstream exhausted", what))
}

pub fn decompress_none(input: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    if input.len() != expected_len {
        return Err(Error::corrupt(format!("stored resource has {} bytes, expected {}", input.len(), expected_len)));
    }
    Ok(input.to_vec())
}

#[derive(Copy, Clone)]
struct Token {
    offset: usize,
    length: usize,
}

const LZW_TOKEN_RESET: u32 = 0x100;
const LZW_TOKEN_END_OF_STREAM: u32 = 0x101;
const LZW_TOKEN_INITIAL: u32 = 0x102;
const LZW_BITS_INITIAL: u32 = 9;
const LZW_BITS_MAX: u32 = 12;

fn lzw_end_token(num_bits: u32) -> u32 {
    (1 << num_bits) - 1
}

pub fn decompress_lzw(input: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    let mut stream = Streamer::new(input);
    let mut output: Vec<u8> = Vec::with_capacity(expected_len);
    let mut tokens = vec![Token { offset: 0, length: 0 }; (1 << LZW_BITS_MAX) as usize];

    let mut token_lastlength: usize;
    let mut num_bits: u32 = LZW_BITS_INITIAL;
    let mut cur_token: u32 = LZW_TOKEN_INITIAL;
    while output.len() < expected_len {
        let token = stream.get_bits_lsb(num_bits).map_err(exhausted("LZW"))?;
        match token {
            LZW_TOKEN_RESET => {
                num_bits = LZW_BITS_INITIAL;
                cur_token = LZW_TOKEN_INITIAL;
                continue;
            }
            LZW_TOKEN_END_OF_STREAM => break,
            0x00..=0xff => {
                token_lastlength = 1;
                output.push(token as u8);
            }
            _ => {
                if token >= cur_token {
                    return Err(Error::corrupt(format!(
                        "LZW token 0x{:03x} refers past dictionary end 0x{:03x}",
                        token, cur_token
                    )));
                }
                let ref_token = tokens[token as usize];
                token_lastlength = ref_token.length + 1;
                // The source may overlap what this copy produces, so go byte by byte.
                for n in 0..token_lastlength {
                    let b = *output
                        .get(ref_token.offset + n)
                        .ok_or_else(|| Error::corrupt(format!("LZW token 0x{:03x} copies past output", token)))?;
                    output.push(b);
                }
            }
        }

        if cur_token > lzw_end_token(num_bits) && num_bits < LZW_BITS_MAX {
            num_bits += 1;
        }

        if cur_token <= lzw_end_token(num_bits) {
            tokens[cur_token as usize] = Token { offset: output.len() - token_lastlength, length: token_lastlength };
            cur_token += 1;
        }
    }

    if output.len() != expected_len {
        return Err(Error::corrupt(format!("LZW produced {} bytes, expected {}", output.len(), expected_len)));
    }
    Ok(output)
}

struct HuffmanNode {
    value: u8,
    index_delta_0: usize,
    index_delta_1: usize,
}

impl HuffmanNode {
    fn is_leaf(&self) -> bool {
        self.index_delta_0 == 0 && self.index_delta_1 == 0
    }
}

/// Returns a leaf value (< 0x100) or an escaped literal (0x100 | byte).
fn get_huffman_code(stream: &mut Streamer, nodes: &[HuffmanNode]) -> Result<u16> {
    let mut index: usize = 0;
    while !nodes[index].is_leaf() {
        let delta = if stream.get_bits_msb(1).map_err(exhausted("Huffman"))? == 0 {
            nodes[index].index_delta_0
        } else {
            nodes[index].index_delta_1
        };
        if delta == 0 {
            let literal = stream.get_bits_msb(8).map_err(exhausted("Huffman"))?;
            return Ok(0x100 | literal as u16);
        }
        index += delta;
        if index >= nodes.len() {
            return Err(Error::corrupt(format!("Huffman node {} out of range ({} nodes)", index, nodes.len())));
        }
    }
    Ok(nodes[index].value as u16)
}

pub fn decompress_huffman(input: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    let mut stream = Streamer::new(input);
    let num_nodes = stream.get_byte().map_err(exhausted("Huffman header"))? as usize;
    let terminator: u16 = 0x100 | stream.get_byte().map_err(exhausted("Huffman header"))? as u16;

    let mut nodes: Vec<HuffmanNode> = Vec::with_capacity(num_nodes);
    for _ in 0..num_nodes {
        let value = stream.get_byte().map_err(exhausted("Huffman tree"))?;
        let next = stream.get_byte().map_err(exhausted("Huffman tree"))?;
        let index_delta_0 = (next >> 4) as usize; // 4 hi bits
        let index_delta_1 = (next & 0xf) as usize; // 4 lo bits
        nodes.push(HuffmanNode { value, index_delta_0, index_delta_1 });
    }

    let mut output: Vec<u8> = Vec::with_capacity(expected_len);
    // A tree whose root is a leaf cannot encode anything, not even the terminator.
    if nodes.first().is_some_and(|root| !root.is_leaf()) {
        loop {
            let c = get_huffman_code(&mut stream, &nodes)?;
            if c == terminator {
                break;
            }
            if output.len() == expected_len {
                return Err(Error::corrupt(format!("Huffman output exceeds {} bytes", expected_len)));
            }
            output.push(c as u8);
        }
    }

    if output.len() != expected_len {
        return Err(Error::corrupt(format!("Huffman produced {} bytes, expected {}", output.len(), expected_len)));
    }
    Ok(output)
}
