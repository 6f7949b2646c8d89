/// Router Module Index
///
/// Splits the routing table by access level. Each module maps to one gate:
/// none, a verified session, or a verified session plus the admin role.

/// Routes open to anonymous clients.
pub mod public;

/// Routes wrapped in the `AuthSession` middleware layer.
pub mod authenticated;

/// Routes nested under `/admin`. Each handler takes an `AdminSession`.
pub mod admin;
