use std::fmt;
use std::fmt::Formatter;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::{Error, Result};
use crate::scires::decompress;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum ResourceType {
    View = 0,
    Picture = 1,
    Script = 2,
    Text = 3,
    Sound = 4,
    Unused = 5,
    Vocab = 6,
    Font = 7,
    Cursor = 8,
    Patch = 9,
}

impl ResourceType {
    pub const ALL: [ResourceType; 10] = [
        ResourceType::View,
        ResourceType::Picture,
        ResourceType::Script,
        ResourceType::Text,
        ResourceType::Sound,
        ResourceType::Unused,
        ResourceType::Vocab,
        ResourceType::Font,
        ResourceType::Cursor,
        ResourceType::Patch,
    ];

    pub fn index(self) -> usize {
        u8::from(self) as usize
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceType::View => "view",
            ResourceType::Picture => "pic",
            ResourceType::Script => "script",
            ResourceType::Text => "text",
            ResourceType::Sound => "sound",
            ResourceType::Unused => "memory",
            ResourceType::Vocab => "vocab",
            ResourceType::Font => "font",
            ResourceType::Cursor => "cursor",
            ResourceType::Patch => "patch",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u16)]
pub enum CompressionMethod {
    None = 0,
    LZW = 1,
    Huffman = 2,
}

impl CompressionMethod {
    pub fn new(value: u16) -> Result<CompressionMethod> {
        CompressionMethod::try_from(value).map_err(|_| Error::UnsupportedCodec(value))
    }
}

impl fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            CompressionMethod::None => write!(f, "none"),
            CompressionMethod::LZW => write!(f, "lzw"),
            CompressionMethod::Huffman => write!(f, "huffman"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct ResourceID {
    pub rtype: ResourceType,
    pub num: u16,
}

impl ResourceID {
    pub fn new(rtype: ResourceType, num: u16) -> Self {
        ResourceID { rtype, num }
    }

    /// Packed form used by the map and the data record headers: type in the
    /// top 5 bits, number in the low 11 bits.
    pub fn from_packed(value: u16) -> Result<Self> {
        let rtype = (value >> 11) as u8;
        let rtype = ResourceType::try_from(rtype)
            .map_err(|_| Error::format(format!("unknown resource type {} in packed id 0x{:04x}", rtype, value)))?;
        Ok(ResourceID { rtype, num: value & 0x7ff })
    }

    pub fn packed(&self) -> u16 {
        (u16::from(u8::from(self.rtype)) << 11) | (self.num & 0x7ff)
    }
}

impl fmt::Display for ResourceID {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03}", self.rtype, self.num)
    }
}

/// A directory record: where a resource lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceEntry {
    pub id: ResourceID,
    pub volume: u8,
    pub offset: u32,
}

/// The payload of a data record as stored on disk.
#[derive(Debug, Clone)]
pub struct CompressedBlock {
    pub method: CompressionMethod,
    pub compressed_size: u16,
    pub decompressed_size: u16,
    pub data: Vec<u8>,
}

impl CompressedBlock {
    pub fn decompress(&self) -> Result<Vec<u8>> {
        decompress::decompress(self.method, &self.data, self.decompressed_size as usize)
    }
}

/// A fully decompressed resource.
#[derive(Debug)]
pub struct ResourceData {
    pub id: ResourceID,
    pub method: CompressionMethod,
    pub compressed_size: u16,
    pub data: Vec<u8>,
}
