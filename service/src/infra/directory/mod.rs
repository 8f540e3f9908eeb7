//! Account [`Directory`] the session delegates credential checks and user
//! management to.

pub mod mock;

use derive_more::{Display, Error as StdError};
use secrecy::SecretBox;

#[cfg(doc)]
use crate::domain::user::Status;
use crate::domain::{user, User};

pub use self::mock::Mock;

/// Account directory operation.
///
/// Implementations are expected to handle:
/// - `Perform<Authenticate>` checking credentials, resolving into
///   `Option<User>` ([`None`] if the credentials are rejected);
/// - `Select<By<Option<User>, user::Id>>` looking up a [`User`] by ID;
/// - `Select<By<Option<User>, &user::IdentityNumber>>` looking up a [`User`]
///   by its [`user::IdentityNumber`];
/// - `Select<By<Vec<User>, ()>>` listing all the [`User`]s;
/// - `Insert<Account>` registering a new [`Account`];
/// - `Update<User>` replacing the stored [`User`] with the same ID.
pub use common::Handler as Directory;

/// Credentials to authenticate a [`User`] with.
#[derive(Debug)]
pub struct Authenticate {
    /// [`user::IdentityNumber`] of the [`User`].
    pub identity_number: user::IdentityNumber,

    /// [`user::Password`] of the [`User`].
    pub password: SecretBox<user::Password>,
}

/// Newly registered account.
#[derive(Debug)]
pub struct Account {
    /// [`User`] owning this [`Account`].
    pub user: User,

    /// [`user::Password`] chosen for this [`Account`].
    pub password: SecretBox<user::Password>,
}

/// [`Directory`] error.
///
/// Note that rejected credentials or a [`Status::Banned`] account are not
/// errors of the [`Directory`] itself.
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// [`Directory`] cannot be reached.
    #[display("`Directory` is unavailable")]
    Unavailable,
}
