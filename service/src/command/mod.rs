//! [`Command`] definition.

pub mod ban_user;
pub mod restore;
pub mod sign_in;
pub mod sign_out;
pub mod sign_up;
pub mod unban_user;
pub mod update_user_role;

use std::time::Duration;

use common::{
    operations::{Delete, Insert},
    DateTime,
};
use derive_more::{Display, Error, From};
use futures::future;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        user::{self, session},
        User,
    },
    infra::{
        storage::{self, Entry, Key},
        Storage,
    },
    state, Service,
};

/// Error of issuing a new [`state::Session`].
#[derive(Debug, Display, Error, From)]
pub enum IssueError {
    /// Session TTL moves the expiration out of the supported date range.
    #[display("Session TTL of {_0:?} overflows the expiration date")]
    TtlOverflow(#[error(not(source))] Duration),

    /// [`jsonwebtoken`] encoding error.
    #[display("Failed to encode a JSON Web Token: {_0}")]
    #[from]
    JsonWebTokenEncodeError(jsonwebtoken::errors::Error),
}

/// [`Command`] of the [`Service`].
pub use common::Handler as Command;

pub use self::{
    ban_user::BanUser, restore::Restore, sign_in::SignIn, sign_out::SignOut,
    sign_up::SignUp, unban_user::UnbanUser, update_user_role::UpdateUserRole,
};

impl<St, Dir> Service<St, Dir> {
    /// Issues a new [`state::Session`] for the provided [`User`].
    ///
    /// # Errors
    ///
    /// If the configured session TTL overflows the expiration date, or the
    /// [`session::Token`] cannot be encoded.
    pub(crate) fn issue_session(
        &self,
        user: User,
    ) -> Result<state::Session, IssueError> {
        let ttl = self.config().session_ttl;
        let issued_at = DateTime::now();
        let expires_at = issued_at
            .checked_add(ttl)
            .ok_or(IssueError::TtlOverflow(ttl))?
            .coerce();
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &session::Claims {
                user_id: user.id,
                issued_at: issued_at.coerce(),
                expires_at,
            },
            &self.config().jwt_encoding_key,
        )
        .map_err(IssueError::JsonWebTokenEncodeError)?;

        // SAFETY: `jsonwebtoken::encode` always returns a valid
        //         `session::Token`.
        #[expect(unsafe_code, reason = "invariants are preserved")]
        let token = unsafe { session::Token::new_unchecked(token) };

        Ok(state::Session {
            token,
            user,
            expires_at,
        })
    }

    /// Returns the signed in [`User`] if its [`user::Role`] is `permitted`.
    pub(crate) fn privileged_user(
        &self,
        permitted: impl FnOnce(user::Role) -> bool,
    ) -> Option<User> {
        self.publisher()
            .borrow()
            .current_user()
            .filter(|u| permitted(u.role))
            .cloned()
    }

    /// Replaces the signed in [`User`] with its `updated` version, if it's
    /// the same [`User`].
    ///
    /// Persisting the `updated` [`User`] is best-effort: a failure is logged
    /// and the previously persisted record stays in place.
    pub(crate) async fn refresh_current_user(&self, updated: &User)
    where
        St: Storage<Insert<Entry>, Ok = (), Err = Traced<storage::Error>>,
    {
        let refreshed = self.publisher().send_if_modified(|s| {
            match &mut s.phase {
                state::Phase::Authenticated(session)
                    if session.user.id == updated.id =>
                {
                    session.user = updated.clone();
                    true
                }
                state::Phase::Authenticated(_)
                | state::Phase::Uninitialized
                | state::Phase::Restoring
                | state::Phase::Unauthenticated => false,
            }
        });
        if !refreshed {
            return;
        }

        let res = match Entry::user(updated) {
            Ok(entry) => self.storage().execute(Insert(entry)).await,
            Err(e) => Err(tracerr::new!(e)),
        };
        if let Err(e) = res {
            log::warn!(
                "failed to persist refreshed `User(id: {})`: {e}",
                updated.id,
            );
        }
    }
}

/// Persists the provided [`state::Session`] into the [`Storage`].
///
/// The [`Key::Token`] entry is written last, so it is never present without
/// its [`Key::User`] entry. If any write fails, both entries are
/// [`discard`]ed.
pub(crate) async fn persist<St>(
    storage: &St,
    session: &state::Session,
) -> Result<(), Traced<storage::Error>>
where
    St: Storage<Insert<Entry>, Ok = (), Err = Traced<storage::Error>>
        + Storage<Delete<Key>, Ok = (), Err = Traced<storage::Error>>,
{
    let user = Entry::user(&session.user).map_err(tracerr::wrap!())?;

    let mut res = storage.execute(Insert(user)).await;
    if res.is_ok() {
        res = storage
            .execute(Insert(Entry::token(&session.token)))
            .await;
    }
    if res.is_err() {
        _ = discard(storage).await;
    }
    res.map_err(tracerr::wrap!())
}

/// Removes all the session entries from the [`Storage`].
///
/// Failures are logged and absorbed. Returns `false` if any entry failed to
/// be removed.
pub(crate) async fn discard<St>(storage: &St) -> bool
where
    St: Storage<Delete<Key>, Ok = (), Err = Traced<storage::Error>>,
{
    let results =
        future::join_all(Key::ALL.map(|key| storage.execute(Delete(key))))
            .await;

    let mut all_removed = true;
    for (key, res) in Key::ALL.into_iter().zip(results) {
        if let Err(e) = res {
            log::warn!("failed to remove `{key}` session entry: {e}");
            all_removed = false;
        }
    }
    all_removed
}

#[cfg(test)]
mod spec {
    use std::io;

    use common::{
        operations::{By, Delete, Insert, Select},
        Handler,
    };
    use secrecy::SecretString;
    use tracerr::Traced;

    use crate::{
        command::{sign_in, SignIn},
        infra::{
            directory,
            storage::{self, Entry, Key},
        },
        state::Phase,
        Config, Service,
    };

    /// [`storage::Memory`] failing to write [`Key::Token`] entries.
    #[derive(Clone, Debug, Default)]
    struct TokenlessStorage(storage::Memory);

    impl Handler<Insert<Entry>> for TokenlessStorage {
        type Ok = ();
        type Err = Traced<storage::Error>;

        async fn execute(
            &self,
            Insert(entry): Insert<Entry>,
        ) -> Result<Self::Ok, Self::Err> {
            if entry.key == Key::Token {
                return Err(tracerr::new!(storage::Error::Io(
                    io::Error::other("disk is full"),
                )));
            }
            self.0.execute(Insert(entry)).await
        }
    }

    impl Handler<Delete<Key>> for TokenlessStorage {
        type Ok = ();
        type Err = Traced<storage::Error>;

        async fn execute(
            &self,
            Delete(key): Delete<Key>,
        ) -> Result<Self::Ok, Self::Err> {
            self.0.execute(Delete(key)).await
        }
    }

    #[tokio::test]
    async fn discards_partially_persisted_session() {
        let storage = TokenlessStorage::default();
        let service = Service::new(
            Config::with_secret("test"),
            storage.clone(),
            directory::Mock::default(),
        );

        let err = service
            .execute(SignIn {
                identity_number: "STU123456".into(),
                password: SecretString::from("password"),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), sign_in::ExecutionError::Storage(_)));
        assert_eq!(service.state().phase, Phase::Unauthenticated);
        assert_eq!(
            storage.0.execute(Select(By::new(Key::User))).await.unwrap(),
            None,
        );
    }
}
