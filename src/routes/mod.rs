/// Router Module Index
///
/// Organizes the application's routing logic into security-segregated modules.
/// Access control is applied explicitly at the module level (via Axum layers),
/// preventing accidental exposure of protected endpoints.

/// Routes accessible to all clients (login, registration, health, lookup data).
pub mod public;

/// API routes protected by the `AuthUser` extractor middleware.
/// Requires a validated session token.
pub mod authenticated;

/// API routes restricted exclusively to the ADMIN role.
pub mod admin;

/// Browser-facing page routes, protected by the page gate middleware.
/// Failures here are redirects, never JSON.
pub mod pages;
