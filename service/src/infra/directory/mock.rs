//! In-memory [`Directory`] standing in for a real account authority.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use common::operations::{By, Insert, Perform, Select, Update};
use secrecy::ExposeSecret as _;
use tokio::sync::RwLock;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{user, User},
    infra::{
        directory::{self, Account, Authenticate},
        Directory,
    },
};

/// Configuration of a [`Mock`] [`Directory`].
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// [`user::IdentityNumber`]s provisioned with [`user::Role::Admin`].
    pub admins: HashSet<user::IdentityNumber>,

    /// [`user::IdentityNumber`]s provisioned with [`user::Role::Moderator`].
    pub moderators: HashSet<user::IdentityNumber>,
}

/// In-memory [`Directory`] without a real credential check.
///
/// Accepts any non-empty password, and provisions a new account on the first
/// authentication of an unknown [`user::IdentityNumber`].
#[derive(Clone, Debug, Default)]
pub struct Mock {
    /// [`Config`] of this [`Mock`].
    config: Arc<Config>,

    /// Registered [`User`]s.
    users: Arc<RwLock<HashMap<user::Id, User>>>,

    /// Indicator whether this [`Mock`] is unreachable.
    offline: Arc<AtomicBool>,
}

impl Mock {
    /// Creates a new empty [`Mock`] [`Directory`].
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            ..Self::default()
        }
    }

    /// Makes this [`Mock`] (and all its clones) fail every operation with
    /// [`directory::Error::Unavailable`] until brought back online.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    /// Errors if this [`Mock`] is offline.
    fn ensure_online(&self) -> Result<(), Traced<directory::Error>> {
        if self.offline.load(Ordering::Relaxed) {
            return Err(tracerr::new!(directory::Error::Unavailable));
        }
        Ok(())
    }

    /// Returns the [`user::Role`] a new account with the provided
    /// [`user::IdentityNumber`] is provisioned with.
    fn provisioned_role(&self, number: &user::IdentityNumber) -> user::Role {
        if self.config.admins.contains(number) {
            user::Role::Admin
        } else if self.config.moderators.contains(number) {
            user::Role::Moderator
        } else {
            user::Role::User
        }
    }

    /// Builds a new [`User`] for the provided [`user::IdentityNumber`].
    fn provision(&self, number: user::IdentityNumber) -> Option<User> {
        let email = user::Email::new(format!(
            "{}@campus.edu",
            number.as_ref().to_lowercase(),
        ))?;
        Some(User {
            id: user::Id::new(),
            username: user::Username::from(&email),
            email,
            full_name: user::FullName::new(number.as_ref())?,
            affiliation: number.affiliation(),
            role: self.provisioned_role(&number),
            identity_number: number,
            department: None,
            year_level: None,
            position: None,
            status: user::Status::Active,
        })
    }
}

impl Directory<Perform<Authenticate>> for Mock {
    type Ok = Option<User>;
    type Err = Traced<directory::Error>;

    async fn execute(
        &self,
        Perform(creds): Perform<Authenticate>,
    ) -> Result<Self::Ok, Self::Err> {
        self.ensure_online().map_err(tracerr::wrap!())?;

        let Authenticate {
            identity_number,
            password,
        } = creds;
        let password: &str = password.expose_secret().as_ref();
        if password.is_empty() {
            return Ok(None);
        }

        let mut users = self.users.write().await;
        if let Some(u) =
            users.values().find(|u| u.identity_number == identity_number)
        {
            return Ok(Some(u.clone()));
        }

        let Some(user) = self.provision(identity_number) else {
            return Ok(None);
        };
        log::debug!(
            "provisioned `User(id: {})` for `{}`",
            user.id,
            user.identity_number,
        );
        drop(users.insert(user.id, user.clone()));
        Ok(Some(user))
    }
}

impl Directory<Select<By<Option<User>, user::Id>>> for Mock {
    type Ok = Option<User>;
    type Err = Traced<directory::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.ensure_online().map_err(tracerr::wrap!())?;

        Ok(self.users.read().await.get(by.as_inner()).cloned())
    }
}

impl<'n> Directory<Select<By<Option<User>, &'n user::IdentityNumber>>>
    for Mock
{
    type Ok = Option<User>;
    type Err = Traced<directory::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &'n user::IdentityNumber>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.ensure_online().map_err(tracerr::wrap!())?;

        let number = by.into_inner();
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| &u.identity_number == number)
            .cloned())
    }
}

impl Directory<Select<By<Vec<User>, ()>>> for Mock {
    type Ok = Vec<User>;
    type Err = Traced<directory::Error>;

    async fn execute(
        &self,
        _: Select<By<Vec<User>, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.ensure_online().map_err(tracerr::wrap!())?;

        let mut users =
            self.users.read().await.values().cloned().collect::<Vec<_>>();
        users.sort_by(|a, b| {
            a.identity_number.as_ref().cmp(b.identity_number.as_ref())
        });
        Ok(users)
    }
}

impl Directory<Insert<Account>> for Mock {
    type Ok = ();
    type Err = Traced<directory::Error>;

    async fn execute(
        &self,
        Insert(account): Insert<Account>,
    ) -> Result<Self::Ok, Self::Err> {
        self.ensure_online().map_err(tracerr::wrap!())?;

        // Passwords are not checked by this `Directory`, so not stored either.
        let Account { user, password: _ } = account;
        drop(self.users.write().await.insert(user.id, user));
        Ok(())
    }
}

impl Directory<Update<User>> for Mock {
    type Ok = ();
    type Err = Traced<directory::Error>;

    async fn execute(
        &self,
        Update(user): Update<User>,
    ) -> Result<Self::Ok, Self::Err> {
        self.ensure_online().map_err(tracerr::wrap!())?;

        if let Some(stored) = self.users.write().await.get_mut(&user.id) {
            *stored = user;
        }
        Ok(())
    }
}

#[cfg(test)]
mod spec {
    use std::collections::HashSet;

    use common::{
        operations::{By, Perform, Select},
        Handler as _,
    };
    use secrecy::SecretBox;

    use crate::domain::{user, User};

    use super::{Authenticate, Config, Mock};

    fn creds(number: &str, password: &str) -> Authenticate {
        Authenticate {
            identity_number: user::IdentityNumber::new(number).unwrap(),
            password: SecretBox::init_with(|| password.into()),
        }
    }

    #[tokio::test]
    async fn provisions_accounts_once() {
        let directory = Mock::new(Config {
            admins: HashSet::from([user::IdentityNumber::new("STF000001")
                .unwrap()]),
            moderators: HashSet::new(),
        });

        let first = directory
            .execute(Perform(creds("STF000001", "pw")))
            .await
            .unwrap()
            .unwrap();
        let second = directory
            .execute(Perform(creds("STF000001", "other")))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first.role, user::Role::Admin);
        assert_eq!(first.affiliation, user::Affiliation::Staff);
        assert!(first.is_consistent());

        let all = directory
            .execute(Select(By::<Vec<User>, _>::new(())))
            .await
            .unwrap();
        assert_eq!(all, vec![first]);
    }

    #[tokio::test]
    async fn fails_while_offline() {
        let directory = Mock::default();
        directory.set_offline(true);

        assert!(directory
            .execute(Perform(creds("STU123456", "pw")))
            .await
            .is_err());

        directory.set_offline(false);
        assert!(directory
            .execute(Perform(creds("STU123456", "pw")))
            .await
            .unwrap()
            .is_some());
    }
}
