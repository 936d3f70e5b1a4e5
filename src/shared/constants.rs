/// Smallest result limit the list endpoint honors
pub const MIN_LIST_LIMIT: i64 = 1;

/// Largest result limit the list endpoint honors; anything outside
/// [MIN_LIST_LIMIT, MAX_LIST_LIMIT] means "no limit"
pub const MAX_LIST_LIMIT: i64 = 100;

/// Display name recorded when the uploader's token carries no name claim
pub const UNKNOWN_UPLOADER: &str = "Unknown";
