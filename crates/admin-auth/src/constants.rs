//! Auth endpoint paths and timing defaults

/// Refresh endpoint, relative to the API base URL.
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";

pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const LOGOUT_PATH: &str = "/auth/logout";
pub const ME_PATH: &str = "/auth/me";

/// A token expiring within this many seconds is refreshed before sending.
pub const DEFAULT_TOKEN_SKEW_SECS: u64 = 20;

/// Lifetime of a persisted access token (matches the backend's 15 minute
/// access-token cookie).
pub const DEFAULT_TOKEN_MAX_AGE_SECS: u64 = 15 * 60;
