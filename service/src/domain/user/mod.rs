//! [`User`] definitions.

pub mod session;

use std::sync::LazyLock;

use common::define_kind;
use derive_more::{AsRef, Display, From, FromStr, Into};
use regex::Regex;
use secrecy::{zeroize::Zeroize, CloneableSecret};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Member of the campus community.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct User {
    /// ID of this [`User`].
    pub id: Id,

    /// [`Email`] of this [`User`].
    pub email: Email,

    /// [`Username`] of this [`User`].
    pub username: Username,

    /// [`FullName`] of this [`User`], used as the display name.
    pub full_name: FullName,

    /// [`IdentityNumber`] issued to this [`User`] by the university.
    pub identity_number: IdentityNumber,

    /// [`Affiliation`] of this [`User`].
    pub affiliation: Affiliation,

    /// [`Role`] of this [`User`].
    pub role: Role,

    /// [`Department`] this [`User`] belongs to.
    pub department: Option<Department>,

    /// [`YearLevel`] of this [`User`], if a student.
    pub year_level: Option<YearLevel>,

    /// [`Position`] of this [`User`], if a staff member.
    pub position: Option<Position>,

    /// [`Status`] of this [`User`] account.
    pub status: Status,
}

impl User {
    /// Checks whether this [`User`] upholds its invariants:
    /// - [`Affiliation`] matches the [`IdentityNumber`] prefix;
    /// - [`YearLevel`] is only present for students;
    /// - [`Position`] is only present for staff.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let affiliation_matches =
            self.identity_number.affiliation() == self.affiliation;
        let details_match = match self.affiliation {
            Affiliation::Student => self.position.is_none(),
            Affiliation::Staff => self.year_level.is_none(),
        };
        affiliation_matches && details_match
    }

    /// Indicates whether this [`User`] is banned.
    #[must_use]
    pub fn is_banned(&self) -> bool {
        self.status == Status::Banned
    }
}

/// ID of a [`User`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Identity number issued by the university.
///
/// Consists of an [`Affiliation`] prefix (`STU` for students, `STF` for
/// staff) followed by exactly 6 ASCII digits.
#[derive(
    AsRef, Clone, Debug, Deserialize, Display, Eq, Hash, Into, PartialEq, Serialize,
)]
#[as_ref(str)]
#[serde(try_from = "String", into = "String")]
pub struct IdentityNumber(String);

impl IdentityNumber {
    /// Prefix of student [`IdentityNumber`]s.
    pub const STUDENT_PREFIX: &'static str = "STU";

    /// Prefix of staff [`IdentityNumber`]s.
    pub const STAFF_PREFIX: &'static str = "STF";

    /// Creates a new [`IdentityNumber`] if the given `number` is valid.
    #[must_use]
    pub fn new(number: impl Into<String>) -> Option<Self> {
        let number = number.into();
        Self::check(&number).then_some(Self(number))
    }

    /// Returns the [`Affiliation`] encoded in this [`IdentityNumber`] prefix.
    #[must_use]
    pub fn affiliation(&self) -> Affiliation {
        if self.0.starts_with(Self::STAFF_PREFIX) {
            Affiliation::Staff
        } else {
            Affiliation::Student
        }
    }

    /// Checks whether the given `number` is a valid [`IdentityNumber`].
    fn check(number: impl AsRef<str>) -> bool {
        /// Regular expression checking [`IdentityNumber`] format.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^ST[UF][0-9]{6}$").expect("valid regex")
        });

        REGEX.is_match(number.as_ref())
    }
}

impl FromStr for IdentityNumber {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `IdentityNumber`")
    }
}

impl TryFrom<String> for IdentityNumber {
    type Error = &'static str;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s).ok_or("invalid `IdentityNumber`")
    }
}

/// Email address of a [`User`].
#[derive(
    AsRef, Clone, Debug, Deserialize, Display, Eq, Into, PartialEq, Serialize,
)]
#[as_ref(str)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Creates a new [`Email`] if the given `address` is valid.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Option<Self> {
        let address = address.into();
        Self::check(&address).then_some(Self(address))
    }

    /// Returns the local part (before `@`) of this [`Email`].
    #[must_use]
    pub fn local_part(&self) -> &str {
        self.0.split('@').next().unwrap_or_default()
    }

    /// Checks whether the given `address` is a valid [`Email`].
    fn check(address: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Email`] shape: a non-empty local
        /// part, a single `@` and a dotted domain, all without whitespace.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^[^\s@]+@[^\s@.]+(\.[^\s@.]+)+$").expect("valid regex")
        });

        let address = address.as_ref();
        address.len() <= 254 && REGEX.is_match(address)
    }
}

impl FromStr for Email {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Email`")
    }
}

impl TryFrom<String> for Email {
    type Error = &'static str;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s).ok_or("invalid `Email`")
    }
}

/// Username of a [`User`], derived from the local part of its [`Email`].
#[derive(
    AsRef, Clone, Debug, Deserialize, Display, Eq, Into, PartialEq, Serialize,
)]
#[as_ref(str)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Creates a new [`Username`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        Self::check(&name).then_some(Self(name))
    }

    /// Checks whether the given `name` is a valid [`Username`].
    fn check(name: impl AsRef<str>) -> bool {
        let name = name.as_ref();
        !name.is_empty()
            && name.len() <= 254
            && !name.chars().any(|c| c.is_whitespace() || c == '@')
    }
}

impl From<&Email> for Username {
    fn from(email: &Email) -> Self {
        // Valid `Email` always has a non-empty local part without whitespace
        // and `@`.
        Self(email.local_part().to_owned())
    }
}

impl TryFrom<String> for Username {
    type Error = &'static str;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s).ok_or("invalid `Username`")
    }
}

/// Full name of a [`User`].
#[derive(
    AsRef, Clone, Debug, Deserialize, Display, Eq, Into, PartialEq, Serialize,
)]
#[as_ref(str)]
#[serde(try_from = "String", into = "String")]
pub struct FullName(String);

impl FullName {
    /// Minimal number of characters in a [`FullName`].
    pub const MIN_LEN: usize = 3;

    /// Creates a new [`FullName`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        Self::check(&name).then_some(Self(name))
    }

    /// Checks whether the given `name` is a valid [`FullName`].
    fn check(name: impl AsRef<str>) -> bool {
        let name = name.as_ref();
        name.trim() == name
            && name.chars().count() >= Self::MIN_LEN
            && name.len() <= 512
    }
}

impl FromStr for FullName {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `FullName`")
    }
}

impl TryFrom<String> for FullName {
    type Error = &'static str;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s).ok_or("invalid `FullName`")
    }
}

/// Department of a [`User`].
#[derive(
    AsRef, Clone, Debug, Deserialize, Display, Eq, Into, PartialEq, Serialize,
)]
#[as_ref(str)]
#[serde(try_from = "String", into = "String")]
pub struct Department(String);

impl Department {
    /// Creates a new [`Department`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        check_label(&name).then_some(Self(name))
    }
}

impl TryFrom<String> for Department {
    type Error = &'static str;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s).ok_or("invalid `Department`")
    }
}

/// Position of a staff [`User`].
#[derive(
    AsRef, Clone, Debug, Deserialize, Display, Eq, Into, PartialEq, Serialize,
)]
#[as_ref(str)]
#[serde(try_from = "String", into = "String")]
pub struct Position(String);

impl Position {
    /// Creates a new [`Position`] if the given `title` is valid.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Option<Self> {
        let title = title.into();
        check_label(&title).then_some(Self(title))
    }
}

impl TryFrom<String> for Position {
    type Error = &'static str;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s).ok_or("invalid `Position`")
    }
}

/// Checks whether the given `label` is a trimmed, non-empty and reasonably
/// short free-form text.
fn check_label(label: &str) -> bool {
    label.trim() == label && !label.is_empty() && label.len() <= 128
}

/// Year level of a student [`User`].
#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, Into, Ord, PartialEq,
    PartialOrd, Serialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct YearLevel(u8);

impl YearLevel {
    /// Highest possible [`YearLevel`].
    pub const MAX: u8 = 8;

    /// Creates a new [`YearLevel`] if the given `year` is within
    /// `1..=`[`YearLevel::MAX`].
    #[must_use]
    pub fn new(year: u8) -> Option<Self> {
        (1..=Self::MAX).contains(&year).then_some(Self(year))
    }
}

impl TryFrom<u8> for YearLevel {
    type Error = &'static str;

    fn try_from(year: u8) -> Result<Self, Self::Error> {
        Self::new(year).ok_or("invalid `YearLevel`")
    }
}

/// Password of a [`User`].
#[derive(AsRef, Clone, Debug, Display, Eq, From, PartialEq)]
#[as_ref(str)]
#[from(&str, String)]
pub struct Password(String);

impl Password {
    /// Minimal length of a [`Password`] chosen on registration, in
    /// characters.
    pub const MIN_LEN: usize = 8;

    /// Maximal length of a [`Password`], in characters.
    pub const MAX_LEN: usize = 128;

    /// Creates a new [`Password`] if the given `password` is non-empty and
    /// not longer than [`Password::MAX_LEN`].
    ///
    /// [`Password::MIN_LEN`] is only enforced on registration, so existing
    /// accounts with shorter passwords are still able to sign in.
    #[must_use]
    pub fn new(password: impl Into<String>) -> Option<Self> {
        let password = password.into();
        Self::check(&password).then_some(Self(password))
    }

    /// Indicates whether this [`Password`] is strong enough to be chosen on
    /// registration.
    #[must_use]
    pub fn is_acceptable_for_registration(&self) -> bool {
        self.0.chars().count() >= Self::MIN_LEN
    }

    /// Checks whether the given `password` is a valid [`Password`].
    fn check(password: impl AsRef<str>) -> bool {
        let password = password.as_ref();
        !password.is_empty() && password.chars().count() <= Self::MAX_LEN
    }
}

impl FromStr for Password {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Password`")
    }
}

impl CloneableSecret for Password {}
impl Zeroize for Password {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

define_kind! {
    #[doc = "Affiliation of a [`User`] with the university."]
    enum Affiliation {
        #[doc = "Enrolled student."]
        Student = 1,

        #[doc = "Faculty or administrative staff member."]
        Staff = 2,
    }
}

define_kind! {
    #[doc = "Role of a [`User`] granting privileges."]
    enum Role {
        #[doc = "Regular member without any privileges."]
        User = 1,

        #[doc = "Community moderator, able to ban members."]
        Moderator = 2,

        #[doc = "Administrator, able to manage roles and bans."]
        Admin = 3,
    }
}

impl Role {
    /// Indicates whether this [`Role`] is able to update [`Role`]s of other
    /// [`User`]s.
    #[must_use]
    pub fn can_manage_roles(self) -> bool {
        self == Self::Admin
    }

    /// Indicates whether this [`Role`] is able to ban [`User`]s.
    #[must_use]
    pub fn can_ban(self) -> bool {
        matches!(self, Self::Admin | Self::Moderator)
    }

    /// Indicates whether this [`Role`] is able to lift bans.
    #[must_use]
    pub fn can_unban(self) -> bool {
        self == Self::Admin
    }

    /// Indicates whether this [`Role`] is able to browse all [`User`]s.
    #[must_use]
    pub fn can_list_users(self) -> bool {
        matches!(self, Self::Admin | Self::Moderator)
    }
}

define_kind! {
    #[doc = "Status of a [`User`] account."]
    enum Status {
        #[doc = "Account in good standing."]
        Active = 1,

        #[doc = "Account not used anymore."]
        Inactive = 2,

        #[doc = "Account banned by a moderator or an administrator."]
        Banned = 3,
    }
}

#[cfg(test)]
mod spec {
    use super::{
        Affiliation, Email, FullName, IdentityNumber, Password, Role, Status,
        User, Username, YearLevel,
    };

    fn student() -> User {
        let email = Email::new("jane.doe@campus.edu").unwrap();
        User {
            id: super::Id::new(),
            username: Username::from(&email),
            email,
            full_name: FullName::new("Jane Doe").unwrap(),
            identity_number: IdentityNumber::new("STU123456").unwrap(),
            affiliation: Affiliation::Student,
            role: Role::User,
            department: None,
            year_level: YearLevel::new(2),
            position: None,
            status: Status::Active,
        }
    }

    #[test]
    fn identity_number_format() {
        assert!(IdentityNumber::new("STU123456").is_some());
        assert!(IdentityNumber::new("STF000001").is_some());

        for invalid in [
            "",
            "XYZ000000",
            "ADM123456",
            "STU12345",
            "STU1234567",
            "stu123456",
            " STU123456",
            "STU12345a",
            "STU١٢٣٤٥٦",
        ] {
            assert!(
                IdentityNumber::new(invalid).is_none(),
                "`{invalid}` must be rejected",
            );
        }
    }

    #[test]
    fn affiliation_is_derived_from_prefix() {
        assert_eq!(
            IdentityNumber::new("STU123456").unwrap().affiliation(),
            Affiliation::Student,
        );
        assert_eq!(
            IdentityNumber::new("STF654321").unwrap().affiliation(),
            Affiliation::Staff,
        );
    }

    #[test]
    fn email_shape() {
        assert!(Email::new("a@b.com").is_some());
        assert!(Email::new("first.last@dept.campus.edu").is_some());

        assert!(Email::new("").is_none());
        assert!(Email::new("a@b").is_none());
        assert!(Email::new("@b.com").is_none());
        assert!(Email::new("a b@c.com").is_none());
        assert!(Email::new("a@@b.com").is_none());
        assert!(Email::new("a@b..com").is_none());
    }

    #[test]
    fn username_is_email_local_part() {
        let email = Email::new("jane.doe@campus.edu").unwrap();

        assert_eq!(Username::from(&email).as_ref(), "jane.doe");
    }

    #[test]
    fn password_length() {
        assert!(Password::new("").is_none());
        assert!(Password::new("x".repeat(Password::MAX_LEN + 1)).is_none());

        let short = Password::new("pw").unwrap();
        assert!(!short.is_acceptable_for_registration());

        let long = Password::new("correct horse").unwrap();
        assert!(long.is_acceptable_for_registration());

        let multibyte = Password::new("é".repeat(Password::MAX_LEN)).unwrap();
        assert!(multibyte.is_acceptable_for_registration());
        assert!(Password::new("é".repeat(Password::MAX_LEN + 1)).is_none());
        assert!(!Password::new("é".repeat(Password::MIN_LEN - 1))
            .unwrap()
            .is_acceptable_for_registration());
    }

    #[test]
    fn full_name_and_year_level() {
        assert!(FullName::new("Jo").is_none());
        assert!(FullName::new(" Jane").is_none());
        assert!(FullName::new("Jane Doe").is_some());

        assert!(YearLevel::new(0).is_none());
        assert!(YearLevel::new(1).is_some());
        assert!(YearLevel::new(YearLevel::MAX + 1).is_none());
    }

    #[test]
    fn role_privileges() {
        assert!(Role::Admin.can_manage_roles());
        assert!(Role::Admin.can_ban());
        assert!(Role::Admin.can_unban());

        assert!(!Role::Moderator.can_manage_roles());
        assert!(Role::Moderator.can_ban());
        assert!(!Role::Moderator.can_unban());

        assert!(!Role::User.can_manage_roles());
        assert!(!Role::User.can_ban());
        assert!(!Role::User.can_list_users());
    }

    #[test]
    fn consistency() {
        let mut user = student();
        assert!(user.is_consistent());

        user.position = super::Position::new("Professor");
        assert!(!user.is_consistent());

        let mut user = student();
        user.affiliation = Affiliation::Staff;
        assert!(!user.is_consistent());
    }

    #[test]
    fn serializes_with_validation() {
        let user = student();
        let json = serde_json::to_string(&user).unwrap();

        assert!(json.contains(r#""affiliation":"student""#));
        assert!(json.contains(r#""role":"user""#));
        assert_eq!(serde_json::from_str::<User>(&json).unwrap(), user);

        let tampered = json.replace("STU123456", "ADM123456");
        assert!(serde_json::from_str::<User>(&tampered).is_err());
    }
}
