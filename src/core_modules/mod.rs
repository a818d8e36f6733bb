pub mod catalog;
pub mod dominant_hue;
pub mod filter;
pub mod in_place;
pub mod kernel;
pub mod mosaic;
pub mod pixel;
pub mod pixel_buffer;
pub mod region;
pub mod scheduler;
