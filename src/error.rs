use std::io;

use crate::scires::resource::{ResourceID, ResourceType};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("format error: {0}")]
    Format(String),
    #[error("corrupt stream: {0}")]
    CorruptStream(String),
    #[error("unsupported compression method {0}")]
    UnsupportedCodec(u16),
    #[error("resource {0} not found")]
    NotFound(ResourceID),
    #[error("read past end of data at offset {offset} (length {length})")]
    OutOfBounds { offset: usize, length: usize },
    #[error("no decoder for {0} resources")]
    NotImplemented(ResourceType),
}

impl Error {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Error::Format(msg.into())
    }

    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        Error::CorruptStream(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
