//! [`Command`] for signing in.

use common::operations::{Delete, Insert, Perform};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret as _, SecretBox, SecretString};
use tracerr::Traced;
use tracing as log;

#[cfg(doc)]
use crate::state::Session;
use crate::{
    domain::{user, User},
    infra::{
        directory::{self, Authenticate},
        storage::{self, Entry, Key},
        Directory, Storage,
    },
    state::{Loading, Phase},
    Service,
};

use super::Command;

/// [`Command`] for signing in with [`User`] credentials.
///
/// Replaces the current [`Session`], if any.
#[derive(Clone, Debug)]
pub struct SignIn {
    /// [`user::IdentityNumber`] of the [`User`], as entered.
    ///
    /// Surrounding whitespace is ignored.
    pub identity_number: String,

    /// [`user::Password`] of the [`User`], as entered.
    pub password: SecretString,
}

impl<St, Dir> Command<SignIn> for Service<St, Dir>
where
    St: Storage<Insert<Entry>, Ok = (), Err = Traced<storage::Error>>
        + Storage<Delete<Key>, Ok = (), Err = Traced<storage::Error>>,
    Dir: Directory<
        Perform<Authenticate>,
        Ok = Option<User>,
        Err = Traced<directory::Error>,
    >,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: SignIn) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let identity_number =
            user::IdentityNumber::new(cmd.identity_number.trim())
                .ok_or(E::InvalidCredentials)
                .map_err(tracerr::wrap!())?;
        let password = user::Password::new(cmd.password.expose_secret())
            .ok_or(E::InvalidCredentials)
            .map_err(tracerr::wrap!())?;

        let loading = Loading::start(self.publisher(), None);

        let user = self
            .directory()
            .execute(Perform(Authenticate {
                identity_number,
                password: SecretBox::new(Box::new(password)),
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::InvalidCredentials)
            .map_err(tracerr::wrap!())?;
        if user.is_banned() {
            return Err(tracerr::new!(E::AccountBanned(user.id)));
        }

        let session = self
            .issue_session(user)
            .map_err(tracerr::from_and_wrap!(=> E))?;
        if let Err(e) = super::persist(self.storage(), &session).await {
            loading.finish(Phase::Unauthenticated);
            return Err(e).map_err(tracerr::map_from_and_wrap!(=> E));
        }

        log::debug!("`User(id: {})` signed in", session.user.id);
        let user = session.user.clone();
        loading.finish(Phase::Authenticated(session));
        Ok(user)
    }
}

/// Error of [`SignIn`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Directory`] error.
    #[display("`Directory` operation failed: {_0}")]
    #[from]
    Directory(directory::Error),

    /// [`Storage`] error.
    #[display("`Storage` operation failed: {_0}")]
    #[from]
    Storage(storage::Error),

    /// [`Session`] issuing error.
    #[display("Failed to issue a `Session`: {_0}")]
    #[from]
    Session(super::IssueError),

    /// [`SignIn`] contains malformed or rejected credentials.
    #[display("Invalid `User` credentials")]
    InvalidCredentials,

    /// [`User`] is banned.
    #[display("`User(id: {_0})` is banned")]
    AccountBanned(#[error(not(source))] user::Id),
}
