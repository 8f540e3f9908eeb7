//! [`Command`] for signing out.

use std::convert::Infallible;

use common::operations::Delete;
use tracerr::Traced;
use tracing as log;

#[cfg(doc)]
use crate::state::Session;
use crate::{
    infra::{
        storage::{self, Key},
        Storage,
    },
    state::{Loading, Phase},
    Service,
};

use super::Command;

/// [`Command`] for ending the current [`Session`].
///
/// Never fails and may be executed repeatedly: entries that cannot be removed
/// from the [`Storage`] are logged and otherwise ignored.
#[derive(Clone, Copy, Debug, Default)]
pub struct SignOut;

impl<St, Dir> Command<SignOut> for Service<St, Dir>
where
    St: Storage<Delete<Key>, Ok = (), Err = Traced<storage::Error>>,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(&self, _: SignOut) -> Result<Self::Ok, Self::Err> {
        let loading = Loading::start(self.publisher(), None);

        if !super::discard(self.storage()).await {
            log::error!("signed out, but the session may still be persisted");
        }
        loading.finish(Phase::Unauthenticated);

        Ok(())
    }
}

#[cfg(test)]
mod spec {
    use common::{
        operations::{By, Select},
        Handler as _,
    };
    use secrecy::SecretString;

    use crate::{
        command::SignIn,
        infra::{
            directory,
            storage::{self, Key},
        },
        state::Phase,
        Config, Service, State,
    };

    use super::SignOut;

    fn service() -> Service<storage::Memory, directory::Mock> {
        Service::new(
            Config::with_secret("test"),
            storage::Memory::new(),
            directory::Mock::default(),
        )
    }

    #[tokio::test]
    async fn is_idempotent() {
        let service = service();
        _ = service
            .execute(SignIn {
                identity_number: "STU123456".into(),
                password: SecretString::from("password"),
            })
            .await
            .unwrap();

        service.execute(SignOut).await.unwrap();
        service.execute(SignOut).await.unwrap();

        assert_eq!(
            service.state(),
            State {
                phase: Phase::Unauthenticated,
                is_loading: false,
            },
        );
        for key in Key::ALL {
            assert_eq!(
                service
                    .storage()
                    .execute(Select(By::new(key)))
                    .await
                    .unwrap(),
                None,
            );
        }
    }

    #[tokio::test]
    async fn succeeds_despite_unavailable_storage() {
        let service = service();
        _ = service
            .execute(SignIn {
                identity_number: "STF000042".into(),
                password: SecretString::from("password"),
            })
            .await
            .unwrap();
        service.storage().set_unavailable(true);

        service.execute(SignOut).await.unwrap();

        assert_eq!(service.state().phase, Phase::Unauthenticated);
        assert!(!service.is_admin());
        assert!(!service.is_moderator());
    }
}
