use crate::error::{Error, Result};
use crate::scigfx::font::{Font, FontOptions};
use crate::scigfx::picture::Picture;
use crate::scigfx::view0::{View0, ViewOptions};
use crate::scires::resource::ResourceType;
use crate::scires::text::Text;
use crate::scisound::sound0::Sound0;

#[derive(Debug)]
pub enum DecodedResource {
    View(View0),
    Picture(Picture),
    Font(Font),
    Sound(Sound0),
    Text(Text),
}

pub type DecodeFn = fn(&[u8]) -> Result<DecodedResource>;

fn decode_view(data: &[u8]) -> Result<DecodedResource> {
    View0::new(data, &ViewOptions::default()).map(DecodedResource::View)
}

fn decode_picture(data: &[u8]) -> Result<DecodedResource> {
    Picture::decode(data).map(DecodedResource::Picture)
}

fn decode_text(data: &[u8]) -> Result<DecodedResource> {
    Ok(DecodedResource::Text(Text::new(data)))
}

fn decode_sound(data: &[u8]) -> Result<DecodedResource> {
    Sound0::new(data).map(DecodedResource::Sound)
}

fn decode_font(data: &[u8]) -> Result<DecodedResource> {
    Font::new(data, &FontOptions::default()).map(DecodedResource::Font)
}

// Indexed by resource type number.
static DECODERS: [Option<DecodeFn>; 10] = [
    Some(decode_view),
    Some(decode_picture),
    None, // script
    Some(decode_text),
    Some(decode_sound),
    None, // memory
    None, // vocab
    Some(decode_font),
    None, // cursor
    None, // patch
];

pub fn decoder_for(rtype: ResourceType) -> Option<DecodeFn> {
    DECODERS[rtype.index()]
}

/// Decodes resource data with the default decoder options for its type.
pub fn decode(rtype: ResourceType, data: &[u8]) -> Result<DecodedResource> {
    let decoder = decoder_for(rtype).ok_or(Error::NotImplemented(rtype))?;
    decoder(data)
}
