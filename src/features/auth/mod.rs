//! Caller identity and the ownership rules built on it.
//!
//! Tokens are verified upstream; this service only reads the identity the
//! gateway forwards (see `core::middleware::identity_middleware`).

pub mod guards;
pub mod model;
