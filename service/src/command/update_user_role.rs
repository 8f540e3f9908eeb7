//! [`Command`] for updating a [`user::Role`].

use common::operations::{By, Insert, Select, Update};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{user, User},
    infra::{directory, storage, Directory, Storage},
    Service,
};

use super::Command;

/// [`Command`] for granting a [`user::Role`] to a [`User`].
///
/// Only administrators are allowed to execute it.
#[derive(Clone, Copy, Debug)]
pub struct UpdateUserRole {
    /// ID of the [`User`] to update the [`user::Role`] of.
    pub user_id: user::Id,

    /// New [`user::Role`] of the [`User`].
    pub role: user::Role,
}

impl<St, Dir> Command<UpdateUserRole> for Service<St, Dir>
where
    St: Storage<
        Insert<storage::Entry>,
        Ok = (),
        Err = Traced<storage::Error>,
    >,
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
        cmd: UpdateUserRole,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateUserRole { user_id, role } = cmd;

        let admin = self
            .privileged_user(user::Role::can_manage_roles)
            .ok_or(E::Unauthorized)
            .map_err(tracerr::wrap!())?;

        let mut user = self
            .directory()
            .execute(Select(By::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())?;
        user.role = role;
        self.directory()
            .execute(Update(user.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        log::info!(
            "`User(id: {})` granted `{role}` role to `User(id: {user_id})`",
            admin.id,
        );
        self.refresh_current_user(&user).await;
        Ok(user)
    }
}

/// Error of [`UpdateUserRole`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Directory`] error.
    #[display("`Directory` operation failed: {_0}")]
    #[from]
    Directory(directory::Error),

    /// Signed in [`User`] is not an administrator, or nobody is signed in.
    #[display("Only administrators are allowed to update roles")]
    Unauthorized,

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}
