//! Decoders for the SCI0 resource archive: the `resource.map` directory,
//! the three compression codecs and the view, picture, font, sound and text
//! resource formats.

pub mod error;
pub mod scires;
pub mod scigfx;
pub mod scisound;

pub use error::{Error, Result};
