mod evaluation_dto;

pub use evaluation_dto::*;
