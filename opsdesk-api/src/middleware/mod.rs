/// Middleware for the API server
///
/// - `identity`: resolves the bearer token into a `Caller` extension
/// - `preflight`: answers bare `OPTIONS` requests

pub mod identity;
pub mod preflight;
