use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::validate::is_blank_query;
use crate::{CoreError, NewUser, User, UserId, UserRepository};

/// In-memory user store. A single mutex guards both the id index and the
/// insertion-ordered records, so every operation sees a consistent snapshot.
pub struct InMemoryUserStore {
    inner: Mutex<Records>,
}

#[derive(Default)]
struct Records {
    // id -> position in `users`
    index: HashMap<UserId, usize>,
    users: Vec<User>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Records::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Records>, CoreError> {
        self.inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))
    }

    /// Number of stored users.
    pub fn len(&self) -> Result<usize, CoreError> {
        Ok(self.lock()?.users.len())
    }

    pub fn is_empty(&self) -> Result<bool, CoreError> {
        Ok(self.len()? == 0)
    }
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

impl UserRepository for InMemoryUserStore {
    fn save(&self, user: NewUser) -> Result<User, CoreError> {
        let mut records = self.lock()?;
        let id = match user.id {
            Some(id) => {
                if records.index.contains_key(&id) {
                    return Err(CoreError::InvalidInput(format!(
                        "user id {} is already assigned",
                        id
                    )));
                }
                id
            }
            // v4 collisions are not expected; loop only guards the invariant
            None => loop {
                let candidate = UserId::generate();
                if !records.index.contains_key(&candidate) {
                    break candidate;
                }
            },
        };
        let stored = User {
            id,
            name: user.name,
            email: user.email,
        };
        let pos = records.users.len();
        records.users.push(stored.clone());
        records.index.insert(id, pos);
        Ok(stored)
    }

    fn find_all(&self) -> Result<Vec<User>, CoreError> {
        Ok(self.lock()?.users.clone())
    }

    fn find_by_id(&self, id: &UserId) -> Result<Option<User>, CoreError> {
        let records = self.lock()?;
        Ok(records
            .index
            .get(id)
            .and_then(|&pos| records.users.get(pos))
            .cloned())
    }

    fn search_by_name(&self, query: Option<&str>) -> Result<Vec<User>, CoreError> {
        let records = self.lock()?;
        let q = match query {
            Some(q) if !is_blank_query(Some(q)) => q.to_lowercase(),
            _ => return Ok(records.users.clone()),
        };
        Ok(records
            .users
            .iter()
            .filter(|u| u.name.as_str().to_lowercase().contains(&q))
            .cloned()
            .collect())
    }

    fn exists_by_email(&self, email: Option<&str>) -> Result<bool, CoreError> {
        let email =
            email.ok_or_else(|| CoreError::InvalidInput("the email is invalid".into()))?;
        let records = self.lock()?;
        Ok(records.users.iter().any(|u| u.email.as_str() == email))
    }
}
