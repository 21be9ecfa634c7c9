use async_trait::async_trait;
use quiz_core::model::{Attempt, AttemptId, UserId};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// The backing store cannot be opened or used at all.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("write failed: {0}")]
    WriteFailed(String),

    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Durable store of quiz attempts, scoped by user.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Persist a new attempt and return its store-assigned id.
    ///
    /// The attempt itself is not modified; callers record the id via
    /// `Attempt::assign_id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the attempt already carries an id,
    /// `StorageError::WriteFailed` if the write is rejected.
    async fn create(&self, attempt: &Attempt) -> Result<AttemptId, StorageError>;

    /// Overwrite the stored record at the attempt's id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the attempt has no id or no record
    /// exists for it, `StorageError::WriteFailed` on write errors.
    async fn update(&self, attempt: &Attempt) -> Result<(), StorageError>;

    /// Fetch one attempt by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get(&self, id: AttemptId) -> Result<Attempt, StorageError>;

    /// All attempts for `user_id`, in store order. Unreadable records are skipped.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the store cannot be queried.
    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Attempt>, StorageError>;

    /// The most recently written incomplete attempt for `user_id`.
    ///
    /// Equal timestamps resolve to the most recently inserted record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the store cannot be queried.
    async fn latest_incomplete(&self, user_id: &UserId) -> Result<Option<Attempt>, StorageError>;
}

/// Persistence for the local user identifier, kept apart from attempts.
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the identity cannot be read.
    async fn load_user_id(&self) -> Result<Option<UserId>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::WriteFailed` if the identity cannot be stored.
    async fn save_user_id(&self, user_id: &UserId) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and degraded mode.
///
/// Attempts are kept in insertion order; ids are assigned from 1.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    attempts: Arc<Mutex<AttemptTable>>,
    identity: Arc<Mutex<Option<UserId>>>,
}

#[derive(Default)]
struct AttemptTable {
    rows: Vec<Attempt>,
    next_id: u64,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: ToString>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn create(&self, attempt: &Attempt) -> Result<AttemptId, StorageError> {
        if let Some(existing) = attempt.id() {
            return Err(StorageError::Conflict(format!(
                "attempt already persisted as {existing}"
            )));
        }
        let mut guard = self.attempts.lock().map_err(poisoned)?;
        guard.next_id += 1;
        let id = AttemptId::new(guard.next_id);
        let mut stored = attempt.clone();
        stored
            .assign_id(id)
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        guard.rows.push(stored);
        Ok(id)
    }

    async fn update(&self, attempt: &Attempt) -> Result<(), StorageError> {
        let id = attempt.id().ok_or(StorageError::NotFound)?;
        let mut guard = self.attempts.lock().map_err(poisoned)?;
        let slot = guard
            .rows
            .iter_mut()
            .find(|row| row.id() == Some(id))
            .ok_or(StorageError::NotFound)?;
        *slot = attempt.clone();
        Ok(())
    }

    async fn get(&self, id: AttemptId) -> Result<Attempt, StorageError> {
        let guard = self.attempts.lock().map_err(poisoned)?;
        guard
            .rows
            .iter()
            .find(|row| row.id() == Some(id))
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Attempt>, StorageError> {
        let guard = self.attempts.lock().map_err(poisoned)?;
        Ok(guard
            .rows
            .iter()
            .filter(|row| row.user_id() == user_id)
            .cloned()
            .collect())
    }

    async fn latest_incomplete(&self, user_id: &UserId) -> Result<Option<Attempt>, StorageError> {
        let guard = self.attempts.lock().map_err(poisoned)?;
        // `max_by_key` keeps the last maximum, so later insertions win ties.
        Ok(guard
            .rows
            .iter()
            .filter(|row| row.user_id() == user_id && !row.is_complete())
            .max_by_key(|row| row.timestamp())
            .cloned())
    }
}

#[async_trait]
impl IdentityRepository for InMemoryRepository {
    async fn load_user_id(&self) -> Result<Option<UserId>, StorageError> {
        let guard = self.identity.lock().map_err(poisoned)?;
        Ok(guard.clone())
    }

    async fn save_user_id(&self, user_id: &UserId) -> Result<(), StorageError> {
        let mut guard = self.identity.lock().map_err(poisoned)?;
        *guard = Some(user_id.clone());
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub attempts: Arc<dyn AttemptRepository>,
    pub identity: Arc<dyn IdentityRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let attempts: Arc<dyn AttemptRepository> = Arc::new(repo.clone());
        let identity: Arc<dyn IdentityRepository> = Arc::new(repo);
        Self { attempts, identity }
    }
}
