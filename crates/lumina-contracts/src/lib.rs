pub mod chat;
pub mod config;
pub mod errors;
pub mod events;
pub mod export;
pub mod image_handle;
pub mod models;
pub mod session;

pub use errors::{GatewayError, GatewayErrorKind};
pub use image_handle::ImageHandle;
