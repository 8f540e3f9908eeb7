//! [`Command`] for registering a new [`User`].

use std::fmt;

use common::{
    define_kind,
    operations::{By, Delete, Insert, Select},
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret as _, SecretBox, SecretString};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{user, User},
    infra::{
        directory::{self, Account},
        storage::{self, Entry, Key},
        Directory, Storage,
    },
    state::{Loading, Phase},
    Service,
};

use super::Command;

/// [`Command`] for registering a new [`User`] and signing it in.
#[derive(Clone, Debug, From)]
pub struct SignUp(pub Registration);

/// Registration form of a new [`User`], as entered.
#[derive(Clone, Debug)]
pub struct Registration {
    /// [`user::Email`] of the new [`User`].
    pub email: String,

    /// [`user::Password`] of the new [`User`].
    pub password: SecretString,

    /// Declared [`user::Affiliation`] of the new [`User`].
    pub affiliation: user::Affiliation,

    /// [`user::IdentityNumber`] of the new [`User`].
    pub identity_number: String,

    /// [`user::FullName`] of the new [`User`].
    pub full_name: String,

    /// [`user::Department`] of the new [`User`], if any.
    pub department: Option<String>,

    /// [`user::YearLevel`] of the new [`User`], if a student.
    pub year_level: Option<u8>,

    /// [`user::Position`] of the new [`User`], if a staff member.
    pub position: Option<String>,
}

impl Registration {
    /// Validates this [`Registration`] and builds the [`Account`] it
    /// describes.
    ///
    /// # Errors
    ///
    /// With every [`Violation`] found, if any.
    pub fn validate(self) -> Result<Account, Violations> {
        let mut violations = Violations::default();

        let email = user::Email::new(self.email.trim());
        if email.is_none() {
            violations.push(Field::Email, "must be a valid email address");
        }

        let password = user::Password::new(self.password.expose_secret())
            .filter(user::Password::is_acceptable_for_registration);
        if password.is_none() {
            violations
                .push(Field::Password, "must be 8 to 128 characters long");
        }

        let identity_number =
            user::IdentityNumber::new(self.identity_number.trim());
        match &identity_number {
            None => violations.push(
                Field::IdentityNumber,
                "must be `STU` or `STF` followed by 6 digits",
            ),
            Some(n) if n.affiliation() != self.affiliation => violations
                .push(Field::IdentityNumber, "does not match the affiliation"),
            Some(_) => {}
        }

        let full_name = user::FullName::new(self.full_name.trim());
        if full_name.is_none() {
            violations.push(Field::FullName, "must be at least 3 characters");
        }

        let department = non_blank(self.department).map(user::Department::new);
        if matches!(department, Some(None)) {
            violations
                .push(Field::Department, "must be at most 128 characters");
        }

        let year_level = match (self.affiliation, self.year_level) {
            (user::Affiliation::Student, Some(y)) => {
                let year = user::YearLevel::new(y);
                if year.is_none() {
                    violations.push(Field::YearLevel, "must be from 1 to 8");
                }
                year
            }
            (user::Affiliation::Student, None) => {
                violations.push(Field::YearLevel, "is required for students");
                None
            }
            (user::Affiliation::Staff, Some(_)) => {
                violations.push(Field::YearLevel, "is only for students");
                None
            }
            (user::Affiliation::Staff, None) => None,
        };

        let position = match (self.affiliation, non_blank(self.position)) {
            (user::Affiliation::Staff, Some(p)) => {
                let position = user::Position::new(p);
                if position.is_none() {
                    violations.push(
                        Field::Position,
                        "must be at most 128 characters",
                    );
                }
                position
            }
            (user::Affiliation::Staff, None) => {
                violations.push(Field::Position, "is required for staff");
                None
            }
            (user::Affiliation::Student, Some(_)) => {
                violations.push(Field::Position, "is only for staff");
                None
            }
            (user::Affiliation::Student, None) => None,
        };

        let (
            Some(email),
            Some(password),
            Some(identity_number),
            Some(full_name),
            true,
        ) = (
            email,
            password,
            identity_number,
            full_name,
            violations.is_empty(),
        )
        else {
            return Err(violations);
        };

        Ok(Account {
            user: User {
                id: user::Id::new(),
                username: user::Username::from(&email),
                email,
                identity_number,
                full_name,
                affiliation: self.affiliation,
                role: user::Role::User,
                department: department.flatten(),
                year_level,
                position,
                status: user::Status::Active,
            },
            password: SecretBox::new(Box::new(password)),
        })
    }
}

/// Trims the provided `value`, treating a blank one as absent.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

define_kind! {
    #[doc = "Field of a [`Registration`]."]
    enum Field {
        #[doc = "[`Registration::email`] field."]
        Email = 1,

        #[doc = "[`Registration::password`] field."]
        Password = 2,

        #[doc = "[`Registration::identity_number`] field."]
        IdentityNumber = 3,

        #[doc = "[`Registration::full_name`] field."]
        FullName = 4,

        #[doc = "[`Registration::department`] field."]
        Department = 5,

        #[doc = "[`Registration::year_level`] field."]
        YearLevel = 6,

        #[doc = "[`Registration::position`] field."]
        Position = 7,
    }
}

/// Single rule a [`Registration`] violates.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
#[display("`{field}` {reason}")]
pub struct Violation {
    /// Violating [`Field`].
    pub field: Field,

    /// Human-readable reason of this [`Violation`].
    pub reason: &'static str,
}

/// All the [`Violation`]s of a [`Registration`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Violations(Vec<Violation>);

impl Violations {
    /// Records a new [`Violation`] of the provided [`Field`].
    fn push(&mut self, field: Field, reason: &'static str) {
        self.0.push(Violation { field, reason });
    }

    /// Indicates whether no [`Violation`]s are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the recorded [`Violation`]s.
    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.0.iter()
    }

    /// Indicates whether the provided [`Field`] is violated.
    #[must_use]
    pub fn contains(&self, field: Field) -> bool {
        self.0.iter().any(|v| v.field == field)
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (n, v) in self.0.iter().enumerate() {
            if n > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

impl<St, Dir> Command<SignUp> for Service<St, Dir>
where
    St: Storage<Insert<Entry>, Ok = (), Err = Traced<storage::Error>>
        + Storage<Delete<Key>, Ok = (), Err = Traced<storage::Error>>,
    Dir: for<'n> Directory<
            Select<By<Option<User>, &'n user::IdentityNumber>>,
            Ok = Option<User>,
            Err = Traced<directory::Error>,
        > + Directory<Insert<Account>, Ok = (), Err = Traced<directory::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        SignUp(registration): SignUp,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let account = registration
            .validate()
            .map_err(tracerr::from_and_wrap!(=> E))?;

        let loading = Loading::start(self.publisher(), None);

        let occupied = self
            .directory()
            .execute(Select(By::new(&account.user.identity_number)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .is_some();
        if occupied {
            return Err(tracerr::new!(E::IdentityNumberOccupied(
                account.user.identity_number,
            )));
        }

        let user = account.user.clone();
        self.directory()
            .execute(Insert(account))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        log::debug!(
            "registered `User(id: {})` for `{}`",
            user.id,
            user.identity_number,
        );

        let session = self
            .issue_session(user)
            .map_err(tracerr::from_and_wrap!(=> E))?;
        if let Err(e) = super::persist(self.storage(), &session).await {
            loading.finish(Phase::Unauthenticated);
            return Err(e).map_err(tracerr::map_from_and_wrap!(=> E));
        }

        let user = session.user.clone();
        loading.finish(Phase::Authenticated(session));
        Ok(user)
    }
}

/// Error of [`SignUp`] [`Command`] execution.
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

    /// [`Session`](crate::state::Session) issuing error.
    #[display("Failed to issue a `Session`: {_0}")]
    #[from]
    Session(super::IssueError),

    /// [`Registration`] is invalid.
    #[display("Invalid registration: {_0}")]
    #[from]
    Validation(#[error(not(source))] Violations),

    /// [`user::IdentityNumber`] is registered already.
    #[display("`{_0}` is registered already")]
    IdentityNumberOccupied(#[error(not(source))] user::IdentityNumber),
}

#[cfg(test)]
mod spec {
    use common::Handler as _;
    use secrecy::SecretString;

    use crate::{
        command::{Restore, SignOut},
        domain::user,
        infra::{directory, storage},
        state::Phase,
        Config, Service,
    };

    use super::{ExecutionError, Field, Registration, SignUp};

    fn service(
        storage: storage::Memory,
    ) -> Service<storage::Memory, directory::Mock> {
        Service::new(
            Config::with_secret("test"),
            storage,
            directory::Mock::default(),
        )
    }

    fn student() -> Registration {
        Registration {
            email: "maria.santos@campus.edu".into(),
            password: SecretString::from("correct horse"),
            affiliation: user::Affiliation::Student,
            identity_number: "STU123456".into(),
            full_name: "Maria Santos".into(),
            department: Some("Computer Science".into()),
            year_level: Some(2),
            position: None,
        }
    }

    fn staff() -> Registration {
        Registration {
            email: "j.cruz@campus.edu".into(),
            password: SecretString::from("12345678"),
            affiliation: user::Affiliation::Staff,
            identity_number: "STF000042".into(),
            full_name: "Jose Cruz".into(),
            department: None,
            year_level: None,
            position: Some("Registrar".into()),
        }
    }

    #[test]
    fn builds_consistent_accounts() {
        for registration in [student(), staff()] {
            let account = registration.validate().unwrap();

            assert!(account.user.is_consistent());
            assert_eq!(account.user.role, user::Role::User);
            assert_eq!(account.user.status, user::Status::Active);
        }

        let account = student().validate().unwrap();
        assert_eq!(account.user.username.as_ref(), "maria.santos");
        assert_eq!(account.user.year_level.map(u8::from), Some(2));
        assert!(account.user.position.is_none());
    }

    #[test]
    fn cites_short_password() {
        let violations = Registration {
            password: SecretString::from("1234567"),
            ..student()
        }
        .validate()
        .unwrap_err();

        assert!(violations.contains(Field::Password));
        assert_eq!(violations.iter().count(), 1);
        assert_eq!(
            violations.to_string(),
            "`password` must be 8 to 128 characters long",
        );
    }

    #[test]
    fn counts_password_length_in_characters() {
        let account = Registration {
            password: SecretString::from("é".repeat(70)),
            ..student()
        }
        .validate()
        .unwrap();
        assert_eq!(account.user.identity_number.as_ref(), "STU123456");

        let violations = Registration {
            password: SecretString::from("é".repeat(129)),
            ..student()
        }
        .validate()
        .unwrap_err();
        assert!(violations.contains(Field::Password));
    }

    #[test]
    fn reports_all_violations_at_once() {
        let violations = Registration {
            email: "not-an-email".into(),
            password: SecretString::from(""),
            affiliation: user::Affiliation::Staff,
            identity_number: "STU123456".into(),
            full_name: "Al".into(),
            department: Some("   ".into()),
            year_level: Some(3),
            position: None,
        }
        .validate()
        .unwrap_err();

        for field in [
            Field::Email,
            Field::Password,
            Field::IdentityNumber,
            Field::FullName,
            Field::YearLevel,
            Field::Position,
        ] {
            assert!(violations.contains(field), "`{field}` is not violated");
        }
        assert!(!violations.contains(Field::Department));
    }

    #[test]
    fn checks_affiliation_specific_fields() {
        let no_year = Registration {
            year_level: None,
            ..student()
        };
        assert!(no_year.validate().unwrap_err().contains(Field::YearLevel));

        let too_senior = Registration {
            year_level: Some(9),
            ..student()
        };
        assert!(too_senior.validate().unwrap_err().contains(Field::YearLevel));

        let with_position = Registration {
            position: Some("Assistant".into()),
            ..student()
        };
        assert!(with_position
            .validate()
            .unwrap_err()
            .contains(Field::Position));

        let no_position = Registration {
            position: None,
            ..staff()
        };
        assert!(no_position.validate().unwrap_err().contains(Field::Position));
    }

    #[tokio::test]
    async fn signs_up_and_restores_same_user() {
        let storage = storage::Memory::new();
        let first = service(storage.clone());

        let user = first.execute(SignUp(student())).await.unwrap();
        assert_eq!(first.state().current_user(), Some(&user));

        let second = service(storage);
        let restored = second.execute(Restore).await.unwrap();
        assert_eq!(restored.current_user(), Some(&user));
    }

    #[tokio::test]
    async fn rejects_invalid_registration_without_side_effects() {
        let service = service(storage::Memory::new());

        let err = service
            .execute(SignUp(Registration {
                email: "broken".into(),
                ..student()
            }))
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::Validation(v) if v.contains(Field::Email),
        ));
        assert_eq!(service.state().phase, Phase::Uninitialized);
        assert!(!service.state().is_loading);
    }

    #[tokio::test]
    async fn rejects_occupied_identity_number() {
        let service = service(storage::Memory::new());
        _ = service.execute(SignUp(staff())).await.unwrap();
        service.execute(SignOut).await.unwrap();

        let err = service
            .execute(SignUp(Registration {
                email: "other@campus.edu".into(),
                ..staff()
            }))
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::IdentityNumberOccupied(_),
        ));
        assert_eq!(service.state().phase, Phase::Unauthenticated);
    }
}
