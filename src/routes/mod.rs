/// Router Module Index
///
/// Groups the routes by who may call them. Enforcement itself happens in the access
/// gate middleware, which classifies every request by path and method; the grouping
/// here mirrors that classification so a reader can see each route's access level.

/// Routes accessible to everyone: the public blog, health, contact, login/logout.
pub mod public;

/// Writes to the posts API. The gate answers 401 without an admin session.
pub mod authenticated;

/// The admin area. The gate redirects visitors without a session to the login page.
pub mod admin;
