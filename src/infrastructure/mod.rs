pub mod image_source;

pub use image_source::{ImageSource, LocalImageSource, NamePattern, RemoteImageSource};
