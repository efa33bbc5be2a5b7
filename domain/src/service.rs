use std::sync::Mutex;

use crate::{CoreError, NewUser, User, UserId, UserRepository};

/// Application service enforcing the directory's business rules on top of a
/// [`UserRepository`].
///
/// It stays generic over the repository so tests can substitute recording or
/// failing stores. Creation holds `create_lock` across the email check and the
/// save, so two concurrent creates with the same email cannot both succeed.
pub struct UserDirectory<R: UserRepository> {
    repo: R,
    create_lock: Mutex<()>,
}

impl<R: UserRepository> UserDirectory<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            create_lock: Mutex::new(()),
        }
    }

    /// Create a user after checking that its email is not registered yet.
    pub fn create_user(&self, candidate: NewUser) -> Result<User, CoreError> {
        let _guard = self
            .create_lock
            .lock()
            .map_err(|_| CoreError::Repository("create lock poisoned".into()))?;
        if self.repo.exists_by_email(Some(candidate.email.as_str()))? {
            return Err(CoreError::EmailConflict(candidate.email.as_str().to_string()));
        }
        self.repo.save(candidate)
    }

    pub fn get_user_by_id(&self, id: &UserId) -> Result<User, CoreError> {
        self.repo.find_by_id(id)?.ok_or(CoreError::NotFound(*id))
    }

    pub fn list_users(&self) -> Result<Vec<User>, CoreError> {
        self.repo.find_all()
    }

    /// Case-insensitive name search; a missing or blank query lists everyone.
    pub fn search_users(&self, query: Option<&str>) -> Result<Vec<User>, CoreError> {
        self.repo.search_by_name(query)
    }

    pub fn is_email_registered(&self, email: Option<&str>) -> Result<bool, CoreError> {
        self.repo.exists_by_email(email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_repo::InMemoryUserStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn directory() -> UserDirectory<InMemoryUserStore> {
        UserDirectory::new(InMemoryUserStore::new())
    }

    /// Wraps the in-memory store and counts calls to `save` and
    /// `exists_by_email`.
    #[derive(Default)]
    struct RecordingRepo {
        inner: InMemoryUserStore,
        saves: AtomicUsize,
        email_checks: AtomicUsize,
    }

    impl UserRepository for Arc<RecordingRepo> {
        fn save(&self, user: NewUser) -> Result<User, CoreError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            self.inner.save(user)
        }
        fn find_all(&self) -> Result<Vec<User>, CoreError> {
            self.inner.find_all()
        }
        fn find_by_id(&self, id: &UserId) -> Result<Option<User>, CoreError> {
            self.inner.find_by_id(id)
        }
        fn search_by_name(&self, query: Option<&str>) -> Result<Vec<User>, CoreError> {
            self.inner.search_by_name(query)
        }
        fn exists_by_email(&self, email: Option<&str>) -> Result<bool, CoreError> {
            self.email_checks.fetch_add(1, Ordering::SeqCst);
            self.inner.exists_by_email(email)
        }
    }

    /// A store whose every call fails.
    struct BrokenRepo;

    impl UserRepository for BrokenRepo {
        fn save(&self, _user: NewUser) -> Result<User, CoreError> {
            Err(CoreError::Repository("down".into()))
        }
        fn find_all(&self) -> Result<Vec<User>, CoreError> {
            Err(CoreError::Repository("down".into()))
        }
        fn find_by_id(&self, _id: &UserId) -> Result<Option<User>, CoreError> {
            Err(CoreError::Repository("down".into()))
        }
        fn search_by_name(&self, _query: Option<&str>) -> Result<Vec<User>, CoreError> {
            Err(CoreError::Repository("down".into()))
        }
        fn exists_by_email(&self, _email: Option<&str>) -> Result<bool, CoreError> {
            Err(CoreError::Repository("down".into()))
        }
    }

    #[test]
    fn create_returns_user_with_fresh_id() {
        let dir = directory();
        let ada = dir
            .create_user(NewUser::new("Ada Lovelace", "ada@example.com").unwrap())
            .expect("created");
        assert_eq!(ada.name.as_str(), "Ada Lovelace");
        assert_eq!(ada.email.as_str(), "ada@example.com");

        let grace = dir
            .create_user(NewUser::new("Grace Hopper", "grace@example.com").unwrap())
            .unwrap();
        assert_ne!(ada.id, grace.id);
    }

    #[test]
    fn duplicate_email_conflicts_and_leaves_store_unchanged() {
        let dir = directory();
        let first = dir
            .create_user(NewUser::new("Ada Lovelace", "ada@example.com").unwrap())
            .unwrap();

        let err = dir
            .create_user(NewUser::new("Someone Else", "ada@example.com").unwrap())
            .unwrap_err();
        assert_eq!(err, CoreError::EmailConflict("ada@example.com".into()));

        let all = dir.list_users().unwrap();
        assert_eq!(all, vec![first]);
    }

    #[test]
    fn email_uniqueness_is_case_sensitive() {
        let dir = directory();
        dir.create_user(NewUser::new("Ada", "ada@example.com").unwrap())
            .unwrap();
        dir.create_user(NewUser::new("Ada Upper", "ADA@example.com").unwrap())
            .expect("different case is a different email");
        assert_eq!(dir.list_users().unwrap().len(), 2);
    }

    #[test]
    fn conflict_never_calls_save() {
        let repo = Arc::new(RecordingRepo::default());
        let dir = UserDirectory::new(repo.clone());
        dir.create_user(NewUser::new("John Doe", "john@example.com").unwrap())
            .unwrap();
        assert_eq!(repo.saves.load(Ordering::SeqCst), 1);

        let err = dir
            .create_user(NewUser::new("John Doe", "john@example.com").unwrap())
            .unwrap_err();
        assert!(matches!(err, CoreError::EmailConflict(_)));
        assert_eq!(repo.saves.load(Ordering::SeqCst), 1);
        assert_eq!(repo.email_checks.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn get_round_trips_and_reports_not_found() {
        let dir = directory();
        let created = dir
            .create_user(NewUser::new("Ada Lovelace", "ada@example.com").unwrap())
            .unwrap();
        let fetched = dir.get_user_by_id(&created.id).unwrap();
        assert_eq!(fetched.name.as_str(), "Ada Lovelace");
        assert_eq!(fetched.email.as_str(), "ada@example.com");

        let missing = UserId::generate();
        assert_eq!(
            dir.get_user_by_id(&missing).unwrap_err(),
            CoreError::NotFound(missing)
        );
    }

    #[test]
    fn search_scenarios() {
        let dir = directory();
        dir.create_user(NewUser::new("Joan", "joan@x.com").unwrap())
            .unwrap();
        dir.create_user(NewUser::new("María", "maria@x.com").unwrap())
            .unwrap();

        let found = dir.search_users(Some("jo")).unwrap();
        let names: Vec<_> = found.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Joan"]);

        let all = dir.list_users().unwrap();
        assert_eq!(dir.search_users(None).unwrap(), all);
        assert_eq!(dir.search_users(Some("")).unwrap(), all);
        assert_eq!(dir.search_users(Some("   ")).unwrap(), all);
    }

    #[test]
    fn search_case_variants_agree() {
        let dir = directory();
        dir.create_user(NewUser::new("John Doe", "john@example.com").unwrap())
            .unwrap();
        let a = dir.search_users(Some("john")).unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a, dir.search_users(Some("JOHN")).unwrap());
        assert_eq!(a, dir.search_users(Some("JoHn")).unwrap());
    }

    #[test]
    fn is_email_registered_delegates() {
        let dir = directory();
        assert!(!dir.is_email_registered(Some("ada@example.com")).unwrap());
        dir.create_user(NewUser::new("Ada", "ada@example.com").unwrap())
            .unwrap();
        assert!(dir.is_email_registered(Some("ada@example.com")).unwrap());
        assert!(matches!(
            dir.is_email_registered(None),
            Err(CoreError::InvalidInput(_))
        ));
        assert!(!dir.is_email_registered(Some("")).unwrap());
    }

    #[test]
    fn repository_errors_propagate_untouched() {
        let dir = UserDirectory::new(BrokenRepo);
        let candidate = NewUser::new("Ada", "ada@example.com").unwrap();
        assert!(matches!(
            dir.create_user(candidate),
            Err(CoreError::Repository(_))
        ));
        assert!(matches!(dir.list_users(), Err(CoreError::Repository(_))));
        assert!(matches!(
            dir.get_user_by_id(&UserId::generate()),
            Err(CoreError::Repository(_))
        ));
        assert!(matches!(dir.search_users(None), Err(CoreError::Repository(_))));
    }

    #[test]
    fn concurrent_creates_with_same_email_yield_one_user() {
        let dir = directory();
        let successes = AtomicUsize::new(0);
        std::thread::scope(|s| {
            for i in 0..16 {
                let dir = &dir;
                let successes = &successes;
                s.spawn(move || {
                    let candidate =
                        NewUser::new(format!("User {}", i), "shared@example.com").unwrap();
                    if dir.create_user(candidate).is_ok() {
                        successes.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });
        assert_eq!(successes.load(Ordering::SeqCst), 1);
        assert_eq!(dir.list_users().unwrap().len(), 1);
    }
}
