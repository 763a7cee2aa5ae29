pub mod decode;
pub mod decompress;
pub mod resource;
pub mod resource0;
pub mod stream;
pub mod text;
