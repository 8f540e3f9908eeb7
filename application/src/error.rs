//! [`Error`]-related definitions.

use std::{convert::Infallible, fmt};

use derive_more::Error as StdError;
use itertools::Itertools as _;
use service::{
    command,
    infra::{directory, storage},
    query,
};
use tracerr::{Trace, Traced};

/// Defines a new error type.
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_error {
    (
        enum $name:ident {
            $(
                #[code = $code:literal]
                #[message = $message:literal]
                $variant:ident
            ),* $(,)?
        }
    ) => {
        /// Error type.
        #[derive(
            Clone,
            Copy,
            Debug,
            ::derive_more::Display,
            ::derive_more::Error
        )]
        #[repr(u16)]
        pub enum $name {
            $(
                #[display($message)]
                #[doc = $message]
                $variant,
            )*
        }

        impl From<$name> for $crate::Error {
            fn from(err: $name) -> Self {
                match err {
                    $(
                        $name::$variant => Self {
                            code: $code,
                            message: $message.to_string(),
                            backtrace: None,
                        },
                    )*
                }
            }
        }
    };
}

/// Presentable [`Error`] of an operation upon the session.
#[derive(Clone, Debug, StdError)]
pub struct Error {
    /// [`Error`] code.
    pub code: Code,

    /// Backtrace of this [`Error`].
    #[error(not(backtrace))]
    pub backtrace: Option<Trace>,

    /// [`Error`] message.
    pub message: String,
}

impl Error {
    /// Create a new [`Error`] representing an internal error.
    #[must_use]
    pub fn internal(msg: &impl ToString) -> Self {
        Self {
            code: "INTERNAL_ERROR",
            message: msg.to_string(),
            backtrace: None,
        }
    }

    /// Create a new [`Error`] representing a malformed input.
    #[must_use]
    pub fn bad_input(msg: &impl ToString) -> Self {
        Self {
            code: "BAD_INPUT",
            message: msg.to_string(),
            backtrace: None,
        }
    }

    /// Returns this [`Error`] without its backtrace.
    #[must_use]
    pub fn without_backtrace(self) -> Self {
        Self {
            backtrace: None,
            ..self
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            code,
            backtrace,
            message,
        } = self;

        write!(
            f,
            "[{code}]: {message}{}",
            backtrace
                .iter()
                .format_with("\n", |trace, f| f(&format_args!("\n{trace}"))),
        )
    }
}

/// [`Error`] code.
pub type Code = &'static str;

/// Helper trait for converting types into [`Error`]s.
pub trait AsError {
    /// Tries to convert the type into an [`Error`].
    ///
    /// [`None`] is returned if the type cannot be converted into an [`Error`].
    fn try_as_error(&self) -> Option<Error>;

    /// Converts the type into an [`Error`].
    fn as_error(&self) -> Error
    where
        Self: fmt::Display,
    {
        self.try_as_error()
            .unwrap_or_else(|| Error::internal(&self))
    }

    /// Converts the type into an [`Error`] by consuming it.
    fn into_error(self) -> Error
    where
        Self: fmt::Display + Sized,
    {
        self.as_error()
    }
}

impl<E: AsError> AsError for Traced<E> {
    fn try_as_error(&self) -> Option<Error> {
        let mut error = self.as_ref().try_as_error()?;
        error.backtrace = Some(self.trace().clone());
        Some(error)
    }
}

impl AsError for Infallible {
    fn try_as_error(&self) -> Option<Error> {
        match *self {}
    }
}

impl AsError for storage::Error {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "STORAGE_FAILED"]
                #[message = "Failed to persist the session"]
                Storage,
            }
        }

        Some(Error::Storage.into())
    }
}

impl AsError for directory::Error {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "DIRECTORY_UNAVAILABLE"]
                #[message = "Account directory is unavailable, try again \
                             later"]
                Unavailable,
            }
        }

        match self {
            Self::Unavailable => Some(Error::Unavailable.into()),
        }
    }
}

impl AsError for command::sign_in::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "INVALID_CREDENTIALS"]
                #[message = "Provided credentials do not match any account"]
                InvalidCredentials,

                #[code = "ACCOUNT_BANNED"]
                #[message = "Account is banned"]
                AccountBanned,
            }
        }

        match self {
            Self::Directory(e) => e.try_as_error(),
            Self::Storage(e) => e.try_as_error(),
            Self::Session(_) => None,
            Self::InvalidCredentials => Some(Error::InvalidCredentials.into()),
            Self::AccountBanned(_) => Some(Error::AccountBanned.into()),
        }
    }
}

impl AsError for command::sign_up::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "IDENTITY_NUMBER_OCCUPIED"]
                #[message = "Identity number is registered already"]
                IdentityNumberOccupied,
            }
        }

        match self {
            Self::Directory(e) => e.try_as_error(),
            Self::Storage(e) => e.try_as_error(),
            Self::Session(_) => None,
            Self::Validation(violations) => Some(crate::Error {
                code: "VALIDATION_FAILED",
                message: violations.to_string(),
                backtrace: None,
            }),
            Self::IdentityNumberOccupied(_) => {
                Some(Error::IdentityNumberOccupied.into())
            }
        }
    }
}

define_error! {
    enum PrivilegeError {
        #[code = "UNAUTHORIZED"]
        #[message = "Signed in account is not allowed to do this"]
        Unauthorized,

        #[code = "USER_NOT_EXISTS"]
        #[message = "Account with the provided ID does not exist"]
        UserNotExists,
    }
}

impl AsError for command::update_user_role::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Directory(e) => e.try_as_error(),
            Self::Unauthorized => Some(PrivilegeError::Unauthorized.into()),
            Self::UserNotExists(_) => {
                Some(PrivilegeError::UserNotExists.into())
            }
        }
    }
}

impl AsError for command::ban_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Directory(e) => e.try_as_error(),
            Self::Unauthorized => Some(PrivilegeError::Unauthorized.into()),
            Self::UserNotExists(_) => {
                Some(PrivilegeError::UserNotExists.into())
            }
        }
    }
}

impl AsError for command::unban_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Directory(e) => e.try_as_error(),
            Self::Unauthorized => Some(PrivilegeError::Unauthorized.into()),
            Self::UserNotExists(_) => {
                Some(PrivilegeError::UserNotExists.into())
            }
        }
    }
}

impl AsError for query::list_users::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Directory(e) => e.try_as_error(),
            Self::Unauthorized => Some(PrivilegeError::Unauthorized.into()),
        }
    }
}
