pub mod attachments;
pub mod auth;
pub mod evaluations;
pub mod reports;
