//! [`Query`] for listing all the [`User`]s.

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{user, User},
    infra::{directory, Directory},
    Service,
};

use super::Query;

/// [`Query`] for listing all the [`User`]s registered in the [`Directory`],
/// ordered by their [`user::IdentityNumber`].
///
/// Only administrators and moderators are allowed to execute it.
#[derive(Clone, Copy, Debug, Default)]
pub struct ListUsers;

impl<St, Dir> Query<ListUsers> for Service<St, Dir>
where
    Dir: Directory<
        Select<By<Vec<User>, ()>>,
        Ok = Vec<User>,
        Err = Traced<directory::Error>,
    >,
{
    type Ok = Vec<User>;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, _: ListUsers) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        _ = self
            .privileged_user(user::Role::can_list_users)
            .ok_or(E::Unauthorized)
            .map_err(tracerr::wrap!())?;

        self.directory()
            .execute(Select(By::new(())))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
    }
}

/// Error of [`ListUsers`] [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Directory`] error.
    #[display("`Directory` operation failed: {_0}")]
    #[from]
    Directory(directory::Error),

    /// Signed in [`User`] is neither an administrator nor a moderator, or
    /// nobody is signed in.
    #[display("Only administrators and moderators are allowed to list users")]
    Unauthorized,
}

#[cfg(test)]
mod spec {
    use std::collections::HashSet;

    use common::Handler as _;
    use secrecy::SecretString;

    use crate::{
        command::SignIn,
        domain::{user, User},
        infra::{directory, storage},
        Config, Service,
    };

    use super::{ExecutionError, ListUsers};

    fn service() -> Service<storage::Memory, directory::Mock> {
        Service::new(
            Config::with_secret("test"),
            storage::Memory::new(),
            directory::Mock::new(directory::mock::Config {
                admins: HashSet::from([
                    user::IdentityNumber::new("STF000001").unwrap()
                ]),
                moderators: HashSet::new(),
            }),
        )
    }

    async fn sign_in(
        service: &Service<storage::Memory, directory::Mock>,
        number: &str,
    ) -> User {
        service
            .execute(SignIn {
                identity_number: number.into(),
                password: SecretString::from("password"),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn lists_users_for_admins() {
        let service = service();
        let member = sign_in(&service, "STU123456").await;
        let admin = sign_in(&service, "STF000001").await;

        let users = service.execute(ListUsers).await.unwrap();

        assert_eq!(users, vec![admin, member]);
    }

    #[tokio::test]
    async fn rejects_regular_members_and_guests() {
        let service = service();

        let err = service.execute(ListUsers).await.unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::Unauthorized));

        _ = sign_in(&service, "STU123456").await;
        let err = service.execute(ListUsers).await.unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::Unauthorized));
    }
}
