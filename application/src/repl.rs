//! Line-oriented front-end of the [`Service`].

use std::{convert::Infallible, fmt::Write as _};

use clap::{Parser, Subcommand};
use secrecy::SecretString;
use service::{
    command::{
        sign_up::Registration, BanUser, SignIn, SignOut, SignUp, UnbanUser,
        UpdateUserRole,
    },
    domain::{user, User},
    query::ListUsers,
    Command as _, State,
};

use crate::{AsError, Error, Service};

/// Single line entered into the prompt.
#[derive(Debug, Parser)]
#[command(no_binary_name = true, disable_version_flag = true)]
pub struct Line {
    /// [`Action`] requested by the line.
    #[command(subcommand)]
    pub action: Action,
}

impl Line {
    /// Parses the provided raw `line`, respecting quoted words.
    ///
    /// # Errors
    ///
    /// If the `line` is malformed or requests an unknown [`Action`].
    pub fn parse(line: &str) -> Result<Self, Error> {
        let words = split(line)?;
        <Self as Parser>::try_parse_from(words)
            .map_err(|e| Error::bad_input(&e.render()))
    }
}

/// Action upon the session.
#[derive(Debug, Subcommand)]
pub enum Action {
    /// Shows who is signed in.
    Status,

    /// Signs in with an identity number and a password.
    SignIn {
        /// Identity number, like `STU123456` or `STF000042`.
        identity_number: String,

        /// Password of the account.
        #[arg(value_parser = secret)]
        password: SecretString,
    },

    /// Registers a new account and signs it in.
    SignUp {
        /// Email address.
        #[arg(long)]
        email: String,

        /// Password, at least 8 characters long.
        #[arg(long, value_parser = secret)]
        password: SecretString,

        /// Affiliation: `student` or `staff`.
        #[arg(long)]
        affiliation: user::Affiliation,

        /// Identity number, like `STU123456` or `STF000042`.
        #[arg(long)]
        identity_number: String,

        /// Full name.
        #[arg(long)]
        full_name: String,

        /// Department.
        #[arg(long)]
        department: Option<String>,

        /// Year level, required for students.
        #[arg(long)]
        year_level: Option<u8>,

        /// Position, required for staff.
        #[arg(long)]
        position: Option<String>,
    },

    /// Signs out.
    SignOut,

    /// Lists all the accounts.
    Users,

    /// Grants a role to an account.
    SetRole {
        /// ID of the account.
        user_id: user::Id,

        /// Role to grant: `user`, `moderator` or `admin`.
        role: user::Role,
    },

    /// Bans an account.
    Ban {
        /// ID of the account.
        user_id: user::Id,
    },

    /// Lifts a ban of an account.
    Unban {
        /// ID of the account.
        user_id: user::Id,
    },

    /// Leaves the prompt.
    Quit,
}

/// Outcome of an executed [`Action`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Reply {
    /// Text to show.
    Text(String),

    /// Prompt should be left.
    Quit,
}

/// Executes the provided [`Action`] upon the [`Service`].
///
/// # Errors
///
/// If the [`Action`] fails.
#[tracing::instrument(skip(service))]
pub async fn execute(
    service: &Service,
    action: Action,
) -> Result<Reply, Error> {
    let text = match action {
        Action::Status => status(&service.state()),
        Action::SignIn {
            identity_number,
            password,
        } => {
            let user = service
                .execute(SignIn {
                    identity_number,
                    password,
                })
                .await
                .map_err(AsError::into_error)?;
            format!("Signed in as {}", describe(&user))
        }
        Action::SignUp {
            email,
            password,
            affiliation,
            identity_number,
            full_name,
            department,
            year_level,
            position,
        } => {
            let user = service
                .execute(SignUp(Registration {
                    email,
                    password,
                    affiliation,
                    identity_number,
                    full_name,
                    department,
                    year_level,
                    position,
                }))
                .await
                .map_err(AsError::into_error)?;
            format!("Registered and signed in as {}", describe(&user))
        }
        Action::SignOut => {
            service
                .execute(SignOut)
                .await
                .map_err(AsError::into_error)?;
            "Signed out".to_owned()
        }
        Action::Users => {
            let users = service
                .execute(ListUsers)
                .await
                .map_err(AsError::into_error)?;
            users.iter().fold(String::new(), |mut out, u| {
                _ = writeln!(out, "{}  {}", u.id, describe(u));
                out
            })
        }
        Action::SetRole { user_id, role } => {
            let user = service
                .execute(UpdateUserRole { user_id, role })
                .await
                .map_err(AsError::into_error)?;
            format!("Updated {}", describe(&user))
        }
        Action::Ban { user_id } => {
            let user = service
                .execute(BanUser { user_id })
                .await
                .map_err(AsError::into_error)?;
            format!("Banned {}", describe(&user))
        }
        Action::Unban { user_id } => {
            let user = service
                .execute(UnbanUser { user_id })
                .await
                .map_err(AsError::into_error)?;
            format!("Unbanned {}", describe(&user))
        }
        Action::Quit => return Ok(Reply::Quit),
    };
    Ok(Reply::Text(text))
}

/// Parses a [`SecretString`] argument.
#[expect(clippy::unnecessary_wraps, reason = "`clap` signature")]
fn secret(value: &str) -> Result<SecretString, Infallible> {
    Ok(value.into())
}

/// Describes the provided [`State`] for humans.
#[must_use]
pub fn status(state: &State) -> String {
    match state.session() {
        Some(session) => format!(
            "Signed in as {} until {}",
            describe(&session.user),
            session.expires_at.to_rfc3339(),
        ),
        None if state.is_loading => "Loading...".to_owned(),
        None => "Signed out".to_owned(),
    }
}

/// Describes the provided [`User`] in a single line.
fn describe(user: &User) -> String {
    format!(
        "{} <{}> [{}, {}, {}]",
        user.full_name,
        user.email,
        user.identity_number,
        user.role,
        user.status,
    )
}

/// Splits the provided `line` into words by whitespace, keeping quoted parts
/// together.
fn split(line: &str) -> Result<Vec<String>, Error> {
    let mut words = Vec::new();
    let mut word: Option<String> = None;
    let mut quote = None;

    for c in line.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => word.get_or_insert_with(String::new).push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                _ = word.get_or_insert_with(String::new);
            }
            (None, c) if c.is_whitespace() => words.extend(word.take()),
            (None, c) => word.get_or_insert_with(String::new).push(c),
        }
    }
    if quote.is_some() {
        return Err(Error::bad_input(&"unterminated quote"));
    }
    words.extend(word);

    Ok(words)
}
