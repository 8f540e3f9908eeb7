//! [`Command`] for restoring a persisted session.

use std::convert::Infallible;

use common::operations::{By, Delete, Select};
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
        storage::{self, Key},
        Storage,
    },
    state::{self, Loading, Phase},
    Service, State,
};

use super::Command;

/// [`Command`] for restoring the session persisted in the [`Storage`].
///
/// Never fails: any unreadable, partial, expired, banned or otherwise
/// invalid persisted session is discarded and the [`Service`] becomes
/// [`Phase::Unauthenticated`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Restore;

impl<St, Dir> Command<Restore> for Service<St, Dir>
where
    St: Storage<
            Select<By<Option<String>, Key>>,
            Ok = Option<String>,
            Err = Traced<storage::Error>,
        > + Storage<Delete<Key>, Ok = (), Err = Traced<storage::Error>>,
{
    type Ok = State;
    type Err = Infallible;

    async fn execute(&self, _: Restore) -> Result<Self::Ok, Self::Err> {
        let loading = Loading::start(self.publisher(), Some(Phase::Restoring));

        let phase = match self.load().await {
            Ok(Some(session)) => {
                log::debug!(
                    "restored session of `User(id: {})`",
                    session.user.id,
                );
                Phase::Authenticated(session)
            }
            Ok(None) => Phase::Unauthenticated,
            Err(e) => {
                log::warn!("discarding persisted session: {e}");
                _ = super::discard(self.storage()).await;
                Phase::Unauthenticated
            }
        };
        loading.finish(phase);

        Ok(self.state())
    }
}

impl<St, Dir> Service<St, Dir>
where
    St: Storage<
        Select<By<Option<String>, Key>>,
        Ok = Option<String>,
        Err = Traced<storage::Error>,
    >,
{
    /// Loads the persisted [`state::Session`], if there is a complete one.
    async fn load(&self) -> Result<Option<state::Session>, Traced<Rejection>> {
        use Rejection as E;

        let (token, user) = future::join(
            self.storage().execute(Select(By::new(Key::Token))),
            self.storage().execute(Select(By::new(Key::User))),
        )
        .await;
        let token = token.map_err(tracerr::map_from_and_wrap!(=> E))?;
        let user = user.map_err(tracerr::map_from_and_wrap!(=> E))?;

        let (token, user) = match (token, user) {
            (Some(token), Some(user)) => (token, user),
            (None, None) => return Ok(None),
            (Some(_), None) | (None, Some(_)) => {
                return Err(tracerr::new!(E::Partial));
            }
        };

        let user = serde_json::from_str::<User>(&user)
            .map_err(tracerr::from_and_wrap!(=> E))?;
        if !user.is_consistent() {
            return Err(tracerr::new!(E::InconsistentUser(user.id)));
        }
        if user.is_banned() {
            return Err(tracerr::new!(E::BannedUser(user.id)));
        }

        let claims = jsonwebtoken::decode::<session::Claims>(
            &token,
            &self.config().jwt_decoding_key,
            &jsonwebtoken::Validation::default(),
        )
        .map_err(tracerr::from_and_wrap!(=> E))?
        .claims;
        if claims.user_id != user.id {
            return Err(tracerr::new!(E::UserMismatch(user.id)));
        }

        // SAFETY: `jsonwebtoken::decode` has just validated it.
        #[expect(unsafe_code, reason = "invariants are preserved")]
        let token = unsafe { session::Token::new_unchecked(token) };

        Ok(Some(state::Session {
            token,
            user,
            expires_at: claims.expires_at,
        }))
    }
}

/// Reason of a persisted session being discarded by [`Restore`].
#[derive(Debug, Display, Error, From)]
enum Rejection {
    /// [`Storage`] error.
    #[display("`Storage` operation failed: {_0}")]
    #[from]
    Storage(storage::Error),

    /// Only one of the session entries is persisted.
    #[display("Session is persisted partially")]
    Partial,

    /// Persisted [`User`] cannot be decoded.
    #[display("Failed to decode the persisted `User`: {_0}")]
    #[from]
    JsonDecodeError(serde_json::Error),

    /// Persisted [`User`] violates its invariants.
    #[display("Persisted `User(id: {_0})` is inconsistent")]
    InconsistentUser(#[error(not(source))] user::Id),

    /// Persisted [`User`] is banned.
    #[display("Persisted `User(id: {_0})` is banned")]
    BannedUser(#[error(not(source))] user::Id),

    /// Persisted [`session::Token`] is invalid or expired.
    #[display("Invalid session token: {_0}")]
    #[from]
    JsonWebTokenDecodeError(jsonwebtoken::errors::Error),

    /// Persisted [`session::Token`] belongs to another [`User`].
    #[display("Session token does not belong to `User(id: {_0})`")]
    UserMismatch(#[error(not(source))] user::Id),
}
