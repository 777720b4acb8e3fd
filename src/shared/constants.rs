/// Default page size for pagination
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Maximum page size allowed
pub const MAX_PAGE_SIZE: i64 = 100;

// =============================================================================
// IDENTITY HEADERS
// =============================================================================

/// Numeric id of the caller, set by the gateway after token verification
pub const USER_ID_HEADER: &str = "x-user-id";

/// Role of the caller ("user", "evaluator" or "admin"), set by the gateway
pub const USER_ROLE_HEADER: &str = "x-user-role";

// =============================================================================
// ROLE CONSTANTS
// =============================================================================

/// Regular user - requests evaluations for their vehicles
pub const ROLE_USER: &str = "user";

/// Evaluator - accepts evaluation requests and writes reports
pub const ROLE_EVALUATOR: &str = "evaluator";

/// Admin - may act on any evaluation
pub const ROLE_ADMIN: &str = "admin";
