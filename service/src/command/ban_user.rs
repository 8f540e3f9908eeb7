//! [`Command`] for banning a [`User`].

use common::operations::{By, Delete, Select, Update};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{user, User},
    infra::{directory, storage, Directory, Storage},
    state::Phase,
    Service,
};

use super::Command;

/// [`Command`] for banning a [`User`] from signing in.
///
/// Only administrators and moderators are allowed to execute it. Banning the
/// signed in [`User`] ends its session.
#[derive(Clone, Copy, Debug)]
pub struct BanUser {
    /// ID of the [`User`] to ban.
    pub user_id: user::Id,
}

impl<St, Dir> Command<BanUser> for Service<St, Dir>
where
    St: Storage<Delete<storage::Key>, Ok = (), Err = Traced<storage::Error>>,
    Dir: Directory<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<directory::Error>,
        > + Directory<Update<User>, Ok = (), Err = Traced<directory::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        BanUser { user_id }: BanUser,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let actor = self
            .privileged_user(user::Role::can_ban)
            .ok_or(E::Unauthorized)
            .map_err(tracerr::wrap!())?;

        let mut user = self
            .directory()
            .execute(Select(By::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())?;
        user.status = user::Status::Banned;
        self.directory()
            .execute(Update(user.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        log::info!("`User(id: {})` banned `User(id: {user_id})`", actor.id);

        if actor.id == user.id {
            if !super::discard(self.storage()).await {
                log::error!("failed to discard the session of a banned `User`");
            }
            self.publisher().send_modify(|s| s.phase = Phase::Unauthenticated);
            log::info!("banned `User(id: {user_id})` is signed out");
        }
        Ok(user)
    }
}

/// Error of [`BanUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Directory`] error.
    #[display("`Directory` operation failed: {_0}")]
    #[from]
    Directory(directory::Error),

    /// Signed in [`User`] is neither an administrator nor a moderator, or
    /// nobody is signed in.
    #[display("Only administrators and moderators are allowed to ban users")]
    Unauthorized,

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}
