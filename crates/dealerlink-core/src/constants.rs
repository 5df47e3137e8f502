//! Application-wide constants.

/// Base URL of the dealer-management REST API.
pub const DEFAULT_API_BASE_URL: &str = "https://api.dealer-manager.com/v1";

/// OAuth token endpoint used for the password-grant exchange.
pub const DEFAULT_TOKEN_URL: &str = "https://auth.dealer-manager.com/oauth/token";

/// Client identifier registered with the dealer-management platform.
pub const DEFAULT_CLIENT_ID: &str = "dealerlink-agent";

/// A credential is treated as expired this many seconds before its real expiry,
/// so a request is never sent with a token that lapses mid-flight.
pub const DEFAULT_TOKEN_SAFETY_MARGIN_SECS: u64 = 60;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Simultaneous in-flight image uploads per batch.
pub const DEFAULT_MAX_CONCURRENT_UPLOADS: usize = 3;

/// Media types accepted for vehicle photos.
pub const SUPPORTED_IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];
