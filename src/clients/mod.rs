pub mod mathpix_client;

pub use mathpix_client::MathpixClient;
