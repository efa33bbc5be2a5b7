//! Domain library for the User Directory.
//!
//! This crate holds the domain types, the storage port (trait), the directory
//! service and error definitions. Keep HTTP and other IO concerns out of this
//! crate; the only external dependencies are `uuid` for identifiers and
//! `serde` for their wire representation.

use std::error::Error;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque unique identifier of a stored user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Generate a fresh random (v4) identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an identifier from its textual (hyphenated UUID) form.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| CoreError::InvalidInput(format!("malformed user id '{}'", s)))
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Display name of a user. Never empty.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserName(String);

impl UserName {
    pub fn new<S: Into<String>>(s: S) -> Result<Self, CoreError> {
        let val = s.into();
        validate::validate_name(&val)?;
        Ok(Self(val))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Email address of a user. Compared exactly (case-sensitive).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserEmail(String);

impl UserEmail {
    pub fn new<S: Into<String>>(s: S) -> Result<Self, CoreError> {
        let val = s.into();
        validate::validate_email(&val)?;
        Ok(Self(val))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Candidate record for creation. The id is normally left unset so the store
/// assigns one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewUser {
    pub id: Option<UserId>,
    pub name: UserName,
    pub email: UserEmail,
}

impl NewUser {
    /// Validate raw name and email into a candidate without an id.
    pub fn new<N: Into<String>, E: Into<String>>(name: N, email: E) -> Result<Self, CoreError> {
        Ok(Self {
            id: None,
            name: UserName::new(name)?,
            email: UserEmail::new(email)?,
        })
    }

    /// Same as [`NewUser::new`] but with a caller-chosen id.
    pub fn with_id<N: Into<String>, E: Into<String>>(
        id: UserId,
        name: N,
        email: E,
    ) -> Result<Self, CoreError> {
        let mut user = Self::new(name, email)?;
        user.id = Some(id);
        Ok(user)
    }
}

/// Stored user record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: UserName,
    pub email: UserEmail,
}

/// Storage port for user records.
///
/// Implementations own the collection exclusively and hand out clones; every
/// call must be atomic with respect to every other call on the same instance.
pub trait UserRepository: Send + Sync {
    /// Store a user, assigning a fresh id when none is supplied.
    fn save(&self, user: NewUser) -> Result<User, CoreError>;
    /// All users in insertion order.
    fn find_all(&self) -> Result<Vec<User>, CoreError>;
    fn find_by_id(&self, id: &UserId) -> Result<Option<User>, CoreError>;
    /// Case-insensitive substring match on name. `None` or a blank query
    /// behaves like `find_all`.
    fn search_by_name(&self, query: Option<&str>) -> Result<Vec<User>, CoreError>;
    /// Exact, case-sensitive email match. `None` is rejected as invalid input.
    fn exists_by_email(&self, email: Option<&str>) -> Result<bool, CoreError>;
}

/// Core domain errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    InvalidInput(String),
    EmailConflict(String),
    NotFound(UserId),
    Repository(String),
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
            CoreError::EmailConflict(email) => write!(f, "email already registered: {}", email),
            CoreError::NotFound(id) => write!(f, "user not found: {}", id),
            CoreError::Repository(msg) => write!(f, "repository error: {}", msg),
        }
    }
}

impl Error for CoreError {}

/// Return a short about/version line for the binary to print.
pub fn about() -> String {
    let pkg = env!("CARGO_PKG_NAME");
    let ver = env!("CARGO_PKG_VERSION");
    format!("{} v{} - user directory core", pkg, ver)
}

pub mod adapters;
pub mod service;
pub mod validate;
