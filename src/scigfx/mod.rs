pub mod font;
pub mod palette;
pub mod picture;
pub mod planes;
pub mod view0;
