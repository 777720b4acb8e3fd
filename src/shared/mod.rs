pub mod constants;
pub mod status;
#[cfg(test)]
pub mod test_helpers;
pub mod types;
pub mod validation;
