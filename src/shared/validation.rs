use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for validating vehicle plates
    /// Uppercase letters, digits and single hyphens between groups
    /// - Valid: "ABC1D23", "ABC-1234", "7XYZ123"
    /// - Invalid: "-ABC123", "ABC-", "AB--12", "abc1234", "ABC 1234"
    pub static ref VEHICLE_PLATE_REGEX: Regex = Regex::new(r"^[A-Z0-9]+(?:-[A-Z0-9]+)*$").unwrap();
}
