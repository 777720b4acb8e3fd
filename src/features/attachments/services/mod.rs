mod attachment_coordinator;

pub use attachment_coordinator::{AttachmentConfig, AttachmentCoordinator};
