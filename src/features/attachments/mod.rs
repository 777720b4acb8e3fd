pub mod dtos;
pub mod models;
pub mod repositories;
pub mod services;
pub mod upload;

pub use services::AttachmentCoordinator;
