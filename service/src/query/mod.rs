//! [`Query`] definition.

pub mod list_users;

/// [`Query`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Query;

pub use self::list_users::ListUsers;
