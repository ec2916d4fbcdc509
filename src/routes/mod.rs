/// Router Module Index
///
/// Routes are split by the access they demand. The guard for each group is
/// applied as a route layer in `create_router`, so a handler cannot be mounted
/// in a group without inheriting its guard.

/// Routes open to anonymous callers: health, login, registration.
pub mod public;

/// Catalog reads behind the user guard (any valid token).
pub mod authenticated;

/// Catalog reads and mutations behind the admin guard.
pub mod admin;
