//! Service manages the campus session: who is signed in, what they are
//! allowed to do, and how it survives an application restart.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod domain;
pub mod infra;
pub mod query;
pub mod state;

use std::{sync::Arc, time::Duration};

use derive_more::Debug;
use tokio::sync::watch;

#[cfg(doc)]
use infra::{Directory, Storage};
#[cfg(test)]
use tempfile as _;

pub use self::{command::Command, query::Query, state::State};

/// [`Service`] configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// [JWT] encoding key for signing session tokens.
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    #[debug(skip)]
    pub jwt_encoding_key: jsonwebtoken::EncodingKey,

    /// [JWT] decoding key for validating restored session tokens.
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    #[debug(skip)]
    pub jwt_decoding_key: jsonwebtoken::DecodingKey,

    /// Lifetime of a session since signing in.
    pub session_ttl: Duration,
}

impl Config {
    /// Default lifetime of a session.
    pub const DEFAULT_SESSION_TTL: Duration =
        Duration::from_secs(30 * 24 * 60 * 60);

    /// Creates a new [`Config`] signing session tokens with the provided
    /// HMAC `secret`.
    #[must_use]
    pub fn with_secret(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();
        Self {
            jwt_encoding_key: jsonwebtoken::EncodingKey::from_secret(secret),
            jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(secret),
            session_ttl: Self::DEFAULT_SESSION_TTL,
        }
    }
}

/// Session manager.
///
/// Holds the current [`State`], persists it into the [`Storage`] and
/// delegates credential checks to the [`Directory`]. Clones share the same
/// [`State`].
///
/// Operations are not mutually excluded: callers are expected to serialize
/// them (for example, by not issuing a new one while
/// [`State::is_loading`]), otherwise the last one to finish wins.
#[derive(Clone, Debug)]
pub struct Service<St, Dir> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Storage`] of this [`Service`].
    storage: St,

    /// [`Directory`] of this [`Service`].
    directory: Dir,

    /// Current [`State`] published to subscribers.
    #[debug(skip)]
    state: Arc<watch::Sender<State>>,
}

impl<St, Dir> Service<St, Dir> {
    /// Creates a new [`Service`] in the [`state::Phase::Uninitialized`].
    ///
    /// Execute [`command::Restore`] to bring back a previously persisted
    /// session.
    #[must_use]
    pub fn new(config: Config, storage: St, directory: Dir) -> Self {
        Self {
            config,
            storage,
            directory,
            state: Arc::new(watch::Sender::new(State::default())),
        }
    }

    /// Returns [`Config`] of this [`Service`].
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Storage`] of this [`Service`].
    #[must_use]
    pub fn storage(&self) -> &St {
        &self.storage
    }

    /// Returns [`Directory`] of this [`Service`].
    #[must_use]
    pub fn directory(&self) -> &Dir {
        &self.directory
    }

    /// Returns a snapshot of the current [`State`].
    #[must_use]
    pub fn state(&self) -> State {
        self.state.borrow().clone()
    }

    /// Subscribes to [`State`] changes.
    ///
    /// The returned [`watch::Receiver`] borrows the current [`State`] right
    /// away and is notified about every following change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<State> {
        self.state.subscribe()
    }

    /// Indicates whether the signed in [`User`] is an administrator.
    ///
    /// [`User`]: domain::User
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.state.borrow().is_admin()
    }

    /// Indicates whether the signed in [`User`] is a moderator.
    ///
    /// [`User`]: domain::User
    #[must_use]
    pub fn is_moderator(&self) -> bool {
        self.state.borrow().is_moderator()
    }

    /// Returns the [`watch::Sender`] of the [`State`].
    pub(crate) fn publisher(&self) -> &watch::Sender<State> {
        &self.state
    }
}
