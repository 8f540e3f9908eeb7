//! Persistent [`Storage`] of the session.

#[cfg(feature = "fs")]
pub mod file;
pub mod memory;

use std::io;

use derive_more::{Display, Error as StdError, From};

use crate::domain::{user::session, User};

#[cfg(feature = "fs")]
pub use self::file::File;
pub use self::memory::Memory;

/// Persistent string-keyed storage operation.
///
/// Implementations are expected to handle:
/// - `Select<By<Option<String>, Key>>` reading an entry;
/// - `Insert<Entry>` writing an entry;
/// - `Delete<Key>` removing an entry (absent entries are not an error).
pub use common::Handler as Storage;

/// Fixed key of a [`Storage`] entry.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum Key {
    /// Key of the session [`session::Token`].
    #[display("session.token")]
    Token,

    /// Key of the JSON-serialized signed in [`User`].
    #[display("session.user")]
    User,
}

impl Key {
    /// All the [`Key`]s used by a session.
    pub const ALL: [Self; 2] = [Self::Token, Self::User];
}

/// [`Storage`] entry.
#[derive(Clone, Debug)]
pub struct Entry {
    /// [`Key`] of this [`Entry`].
    pub key: Key,

    /// Value of this [`Entry`].
    pub value: String,
}

impl Entry {
    /// Creates a new [`Key::Token`] [`Entry`].
    #[must_use]
    pub fn token(token: &session::Token) -> Self {
        Self {
            key: Key::Token,
            value: token.to_string(),
        }
    }

    /// Creates a new [`Key::User`] [`Entry`] by serializing the provided
    /// [`User`] into JSON.
    ///
    /// # Errors
    ///
    /// If the [`User`] cannot be serialized.
    pub fn user(user: &User) -> Result<Self, Error> {
        Ok(Self {
            key: Key::User,
            value: serde_json::to_string(user)?,
        })
    }
}

/// [`Storage`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// I/O error.
    #[display("I/O operation failed: {_0}")]
    Io(io::Error),

    /// JSON encoding error.
    #[display("Failed to encode JSON: {_0}")]
    Json(serde_json::Error),
}
