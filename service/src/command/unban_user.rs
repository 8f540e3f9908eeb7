//! [`Command`] for lifting a [`User`] ban.

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

/// [`Command`] for lifting a ban of a [`User`], making it
/// [`user::Status::Active`] again.
///
/// Only administrators are allowed to execute it.
#[derive(Clone, Copy, Debug)]
pub struct UnbanUser {
    /// ID of the [`User`] to unban.
    pub user_id: user::Id,
}

impl<St, Dir> Command<UnbanUser> for Service<St, Dir>
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
        UnbanUser { user_id }: UnbanUser,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let admin = self
            .privileged_user(user::Role::can_unban)
            .ok_or(E::Unauthorized)
            .map_err(tracerr::wrap!())?;

        let mut user = self
            .directory()
            .execute(Select(By::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())?;
        if !user.is_banned() {
            return Ok(user);
        }
        user.status = user::Status::Active;
        self.directory()
            .execute(Update(user.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        log::info!("`User(id: {})` unbanned `User(id: {user_id})`", admin.id);
        self.refresh_current_user(&user).await;
        Ok(user)
    }
}

/// Error of [`UnbanUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Directory`] error.
    #[display("`Directory` operation failed: {_0}")]
    #[from]
    Directory(directory::Error),

    /// Signed in [`User`] is not an administrator, or nobody is signed in.
    #[display("Only administrators are allowed to unban users")]
    Unauthorized,

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use std::collections::HashSet;

    use common::Handler as _;
    use secrecy::SecretString;

    use crate::{
        command::{BanUser, SignIn},
        domain::{user, User},
        infra::{directory, storage},
        Config, Service,
    };

    use super::{ExecutionError, UnbanUser};

    fn service() -> Service<storage::Memory, directory::Mock> {
        Service::new(
            Config::with_secret("test"),
            storage::Memory::new(),
            directory::Mock::new(directory::mock::Config {
                admins: HashSet::from([
                    user::IdentityNumber::new("STF000001").unwrap()
                ]),
                moderators: HashSet::from([
                    user::IdentityNumber::new("STF000002").unwrap()
                ]),
            }),
        )
    }

    fn sign_in(number: &str) -> SignIn {
        SignIn {
            identity_number: number.into(),
            password: SecretString::from("password"),
        }
    }

    #[tokio::test]
    async fn only_admins_lift_bans() {
        let service = service();
        let member: User =
            service.execute(sign_in("STU123456")).await.unwrap();
        _ = service.execute(sign_in("STF000002")).await.unwrap();
        _ = service
            .execute(BanUser { user_id: member.id })
            .await
            .unwrap();

        let err = service
            .execute(UnbanUser { user_id: member.id })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::Unauthorized));

        _ = service.execute(sign_in("STF000001")).await.unwrap();
        let unbanned = service
            .execute(UnbanUser { user_id: member.id })
            .await
            .unwrap();
        assert_eq!(unbanned.status, user::Status::Active);

        let signed_in: User =
            service.execute(sign_in("STU123456")).await.unwrap();
        assert_eq!(signed_in.id, member.id);
    }

    #[tokio::test]
    async fn rejects_unknown_user() {
        let service = service();
        _ = service.execute(sign_in("STF000001")).await.unwrap();

        let err = service
            .execute(UnbanUser {
                user_id: user::Id::new(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::UserNotExists(_)));
    }
}
