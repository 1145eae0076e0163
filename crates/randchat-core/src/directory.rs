//! Session directory: the process-wide map from user identity to the one
//! live record for that user.
//!
//! Every component reaches user records through the directory, so two
//! lookups of the same id always yield the same [`UserHandle`]. Partner and
//! referrer links are stored as ids and resolved here as well.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use randchat_types::error::{RepositoryError, UserError};
use randchat_types::invitation::Invitation;
use randchat_types::user::{User, UserId};
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::repository::user::UserRepository;

/// Attempts at drawing an unused invitation before giving up.
const MAX_INVITATION_ATTEMPTS: u32 = 10;

/// The live, shared instance of one user record.
///
/// The inner lock guards a single record only. It may be held across that
/// record's own save, never across notifications or while locking another
/// record.
#[derive(Debug)]
pub struct UserHandle {
    id: UserId,
    record: Mutex<User>,
}

impl UserHandle {
    fn new(user: User) -> Self {
        Self {
            id: user.id,
            record: Mutex::new(user),
        }
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> User {
        self.record.lock().await.clone()
    }
}

/// Identity map over the user repository.
pub struct Directory<U: UserRepository> {
    repo: Arc<U>,
    cache: DashMap<UserId, Arc<UserHandle>>,
}

impl<U: UserRepository> Directory<U> {
    pub fn new(repo: Arc<U>) -> Self {
        Self {
            repo,
            cache: DashMap::new(),
        }
    }

    pub fn repository(&self) -> &U {
        &self.repo
    }

    /// Number of records currently held in memory.
    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    /// Keep the first instance registered for an id; later loads are dropped.
    fn intern(&self, user: User) -> Arc<UserHandle> {
        self.cache
            .entry(user.id)
            .or_insert_with(|| Arc::new(UserHandle::new(user)))
            .value()
            .clone()
    }

    /// Look up a user, loading it from storage on a cache miss.
    pub async fn get(&self, id: UserId) -> Result<Option<Arc<UserHandle>>, UserError> {
        let cached = self.cache.get(&id).map(|entry| entry.value().clone());
        if let Some(handle) = cached {
            return Ok(Some(handle));
        }

        Ok(self.repo.get_by_id(id).await?.map(|user| self.intern(user)))
    }

    /// Look up a user, creating the record on first contact.
    pub async fn get_or_create(&self, id: UserId) -> Result<Arc<UserHandle>, UserError> {
        if let Some(handle) = self.get(id).await? {
            return Ok(handle);
        }

        let user = self.create(id).await?;
        Ok(self.intern(user))
    }

    /// Insert a fresh record, drawing a new invitation until one is unused.
    async fn create(&self, id: UserId) -> Result<User, UserError> {
        for attempt in 1..=MAX_INVITATION_ATTEMPTS {
            let user = User::new(id, Invitation::generate());
            match self.repo.create(&user).await {
                Ok(created) => {
                    debug!(user_id = %id, "created user");
                    return Ok(created);
                }
                Err(RepositoryError::Conflict(msg)) => {
                    // A concurrent first contact may have inserted the row.
                    if let Some(existing) = self.repo.get_by_id(id).await? {
                        return Ok(existing);
                    }
                    debug!(user_id = %id, attempt, %msg, "invitation collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(UserError::StorageError(format!(
            "no unused invitation found for user {id} after {MAX_INVITATION_ATTEMPTS} attempts"
        )))
    }

    /// Find the owner of an invitation token.
    ///
    /// Tokens of the wrong length are rejected without touching storage.
    pub async fn get_by_invitation(&self, token: &str) -> Result<Arc<UserHandle>, UserError> {
        let invitation = Invitation::parse(token)?;
        let user = self
            .repo
            .get_by_invitation(&invitation)
            .await?
            .ok_or(UserError::NotFound)?;
        Ok(self.intern(user))
    }

    /// Apply `mutate` to a copy of the record and persist it.
    ///
    /// The live record only changes once the save succeeds. A mutation that
    /// returns an error, or leaves the record unchanged, saves nothing.
    pub async fn update<F, R>(&self, handle: &UserHandle, mutate: F) -> Result<R, UserError>
    where
        F: FnOnce(&mut User) -> Result<R, UserError> + Send,
        R: Send,
    {
        let mut record = handle.record.lock().await;
        let mut draft = record.clone();
        let outcome = mutate(&mut draft)?;

        if draft != *record {
            if let Err(e) = self.repo.save(&draft).await {
                error!(user_id = %handle.id, error = %e, "failed to save user, change rolled back");
                return Err(e.into());
            }
            *record = draft;
        }

        Ok(outcome)
    }

    /// Resolve who invited `user`.
    ///
    /// Walks the referral chain above the inviter; a link that leads back to
    /// an already visited user is dropped in memory and logged.
    pub async fn referrer(&self, user: &UserHandle) -> Result<Option<Arc<UserHandle>>, UserError> {
        let Some(inviter_id) = user.snapshot().await.invited_by else {
            return Ok(None);
        };

        if inviter_id == user.id {
            error!(user_id = %user.id, "User references itself as inviter, dropping the reference");
            user.record.lock().await.invited_by = None;
            return Ok(None);
        }

        let Some(inviter) = self.get(inviter_id).await? else {
            warn!(user_id = %user.id, inviter_id = %inviter_id, "inviter not found");
            return Ok(None);
        };

        let mut visited = HashSet::from([user.id, inviter_id]);
        let mut current = inviter.clone();
        loop {
            let Some(next_id) = current.snapshot().await.invited_by else {
                break;
            };
            if !visited.insert(next_id) {
                error!(
                    user_id = %current.id,
                    invited_by = %next_id,
                    "Circular reference between invited users, dropping the reference"
                );
                current.record.lock().await.invited_by = None;
                break;
            }
            match self.get(next_id).await? {
                Some(next) => current = next,
                None => break,
            }
        }

        Ok(Some(inviter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryUsers;

    fn directory() -> (Arc<InMemoryUsers>, Directory<InMemoryUsers>) {
        let users = Arc::new(InMemoryUsers::default());
        (users.clone(), Directory::new(users))
    }

    #[tokio::test]
    async fn test_get_or_create_returns_same_instance() {
        let (_, directory) = directory();
        let first = directory.get_or_create(UserId(31416)).await.unwrap();
        let second = directory.get_or_create(UserId(31416)).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(directory.cache_size(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_contact_converges() {
        let (users, directory) = directory();
        let directory = Arc::new(directory);
        let a = tokio::spawn({
            let directory = directory.clone();
            async move { directory.get_or_create(UserId(7)).await.unwrap() }
        });
        let b = tokio::spawn({
            let directory = directory.clone();
            async move { directory.get_or_create(UserId(7)).await.unwrap() }
        });
        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(users.len(), 1);
    }

    #[tokio::test]
    async fn test_get_loads_from_storage() {
        let (users, directory) = directory();
        users.insert(User::new(UserId(5), Invitation::generate()));
        let handle = directory.get(UserId(5)).await.unwrap().unwrap();
        assert_eq!(handle.id(), UserId(5));
        assert!(directory.get(UserId(6)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_by_invitation_checks_length() {
        let (_, directory) = directory();
        let err = directory.get_by_invitation("short").await.unwrap_err();
        assert!(matches!(err, UserError::InvalidInvitation(_)));
    }

    #[tokio::test]
    async fn test_get_by_invitation_returns_cached_instance() {
        let (_, directory) = directory();
        let handle = directory.get_or_create(UserId(1)).await.unwrap();
        let token = handle.snapshot().await.invitation.to_string();
        let found = directory.get_by_invitation(&token).await.unwrap();
        assert!(Arc::ptr_eq(&handle, &found));

        let err = directory.get_by_invitation("0123456789").await.unwrap_err();
        assert!(matches!(err, UserError::NotFound));
    }

    #[tokio::test]
    async fn test_update_rolls_back_on_save_failure() {
        let (users, directory) = directory();
        let handle = directory.get_or_create(UserId(1)).await.unwrap();

        users.fail_saves(true);
        let result = directory
            .update(&handle, |user| {
                user.bonus_count = 5;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(UserError::StorageError(_))));
        assert_eq!(handle.snapshot().await.bonus_count, 0);

        users.fail_saves(false);
        directory
            .update(&handle, |user| {
                user.bonus_count = 5;
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(handle.snapshot().await.bonus_count, 5);
        assert_eq!(users.stored(UserId(1)).unwrap().bonus_count, 5);
    }

    #[tokio::test]
    async fn test_update_validation_error_leaves_record() {
        let (users, directory) = directory();
        let handle = directory.get_or_create(UserId(1)).await.unwrap();
        let saves = users.save_count();

        let result: Result<(), _> = directory
            .update(&handle, |user| {
                user.bonus_count = 9;
                Err(UserError::EmptyLanguages)
            })
            .await;
        assert!(result.is_err());
        assert_eq!(handle.snapshot().await.bonus_count, 0);
        assert_eq!(users.save_count(), saves);
    }

    #[tokio::test]
    async fn test_referrer_resolves_inviter() {
        let (users, directory) = directory();
        let inviter = User::new(UserId(1), Invitation::generate());
        let mut invited = User::new(UserId(2), Invitation::generate());
        invited.invited_by = Some(UserId(1));
        users.insert(inviter);
        users.insert(invited);

        let invited = directory.get(UserId(2)).await.unwrap().unwrap();
        let inviter = directory.referrer(&invited).await.unwrap().unwrap();
        let cached = directory.get(UserId(1)).await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&inviter, &cached));
    }

    #[tokio::test]
    async fn test_referrer_breaks_two_cycle() {
        let (users, directory) = directory();
        let mut a = User::new(UserId(1), Invitation::generate());
        let mut b = User::new(UserId(2), Invitation::generate());
        a.invited_by = Some(UserId(2));
        b.invited_by = Some(UserId(1));
        users.insert(a);
        users.insert(b);

        let a = directory.get(UserId(1)).await.unwrap().unwrap();
        let inviter = directory.referrer(&a).await.unwrap().unwrap();
        assert_eq!(inviter.id(), UserId(2));
        // The back-reference is gone, so resolution from B terminates.
        assert_eq!(inviter.snapshot().await.invited_by, None);
        assert!(directory.referrer(&inviter).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_referrer_drops_self_reference() {
        let (users, directory) = directory();
        let mut a = User::new(UserId(1), Invitation::generate());
        a.invited_by = Some(UserId(1));
        users.insert(a);

        let a = directory.get(UserId(1)).await.unwrap().unwrap();
        assert!(directory.referrer(&a).await.unwrap().is_none());
        assert_eq!(a.snapshot().await.invited_by, None);
    }
}
