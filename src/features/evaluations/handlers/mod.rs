mod evaluation_handler;

pub use evaluation_handler::*;
