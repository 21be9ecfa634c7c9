use std::sync::Arc;

use quiz_core::model::UserId;
use storage::repository::IdentityRepository;

use crate::Clock;
use crate::error::IdentityError;

/// Resolves the local user id, generating and persisting it on first run.
#[derive(Clone)]
pub struct UserIdentityService {
    clock: Clock,
    repo: Arc<dyn IdentityRepository>,
}

impl UserIdentityService {
    #[must_use]
    pub fn new(clock: Clock, repo: Arc<dyn IdentityRepository>) -> Self {
        Self { clock, repo }
    }

    /// Load the persisted user id, or create one.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError` if the id cannot be read or stored.
    pub async fn ensure_user_id(&self) -> Result<UserId, IdentityError> {
        if let Some(existing) = self.repo.load_user_id().await? {
            return Ok(existing);
        }
        let user_id = UserId::generate(&mut rand::rng(), self.clock.now());
        self.repo.save_user_id(&user_id).await?;
        tracing::info!(%user_id, "generated local user id");
        Ok(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::time::fixed_clock;
    use storage::repository::InMemoryRepository;

    #[tokio::test]
    async fn user_id_is_stable_across_calls() {
        let repo = InMemoryRepository::new();
        let svc = UserIdentityService::new(fixed_clock(), Arc::new(repo.clone()));

        let first = svc.ensure_user_id().await.unwrap();
        let second = svc.ensure_user_id().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(repo.load_user_id().await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn existing_id_is_reused() {
        let repo = InMemoryRepository::new();
        let known = UserId::new("known-user").unwrap();
        repo.save_user_id(&known).await.unwrap();

        let svc = UserIdentityService::new(fixed_clock(), Arc::new(repo));
        assert_eq!(svc.ensure_user_id().await.unwrap(), known);
    }
}
