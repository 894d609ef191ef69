//! Domain-level constants.
//!
//! These constants define business rules and validation requirements.

// =============================================================================
// Validation
// =============================================================================

/// Upper bound on plaintext password size, keeps hashing cost bounded
pub const MAX_PASSWORD_LENGTH: usize = 1024;

// =============================================================================
// Authentication
// =============================================================================

/// Default access token lifetime
pub const DEFAULT_ACCESS_TOKEN_EXPIRY: &str = "15m";

/// Default refresh token lifetime
pub const DEFAULT_REFRESH_TOKEN_EXPIRY: &str = "10d";

/// Minimum signing secret length (security requirement)
pub const MIN_SIGNING_SECRET_LENGTH: usize = 32;

/// Authorization header prefix for Bearer tokens
pub const BEARER_TOKEN_PREFIX: &str = "Bearer ";

/// JWT token type identifier
pub const TOKEN_TYPE_BEARER: &str = "Bearer";

// =============================================================================
// Uploads
// =============================================================================

/// Where staged uploads are written when no directory is configured
pub const DEFAULT_UPLOAD_TEMP_DIR: &str = "./public/temp";

/// Longest file name kept from client input
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Cloudinary REST endpoint
pub const DEFAULT_CLOUDINARY_API_BASE: &str = "https://api.cloudinary.com";

/// Per-request timeout for remote store calls, in seconds
pub const DEFAULT_REMOTE_TIMEOUT_SECONDS: u64 = 60;
