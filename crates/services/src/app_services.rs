use std::sync::Arc;

use quiz_core::model::{QuestionBank, QuizSettings, UserId};
use storage::repository::Storage;

use crate::Clock;
use crate::error::AppServicesError;
use crate::history::AttemptHistoryService;
use crate::identity::UserIdentityService;
use crate::sessions::QuizLoopService;

/// Opening the database is retried this many times before degrading.
const SQLITE_OPEN_ATTEMPTS: usize = 2;

/// Assembles app-facing services and resolves the local user id.
#[derive(Clone)]
pub struct AppServices {
    user_id: UserId,
    settings: QuizSettings,
    quiz_loop: Arc<QuizLoopService>,
    history: Arc<AttemptHistoryService>,
    degraded_reason: Option<String>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or identity setup fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        questions: QuestionBank,
        settings: QuizSettings,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::from_storage(storage, clock, questions, settings).await
    }

    /// Build non-persistent services; attempts live only as long as the process.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if identity setup fails.
    pub async fn in_memory(
        clock: Clock,
        questions: QuestionBank,
        settings: QuizSettings,
    ) -> Result<Self, AppServicesError> {
        Self::from_storage(Storage::in_memory(), clock, questions, settings).await
    }

    /// Open `SQLite`, retrying once, and fall back to in-memory storage if it
    /// stays unavailable. The failure is kept in [`AppServices::degraded_reason`].
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` only if the in-memory fallback cannot start.
    pub async fn bootstrap(
        db_url: &str,
        clock: Clock,
        questions: QuestionBank,
        settings: QuizSettings,
    ) -> Result<Self, AppServicesError> {
        let mut last_err = None;
        for attempt in 1..=SQLITE_OPEN_ATTEMPTS {
            match Self::new_sqlite(db_url, clock, questions.clone(), settings).await {
                Ok(services) => return Ok(services),
                Err(err) => {
                    tracing::warn!(attempt, error = %err, "attempt store unavailable");
                    last_err = Some(err);
                }
            }
        }

        let reason = last_err.map_or_else(|| "unknown error".to_owned(), |e| e.to_string());
        tracing::warn!(%reason, "continuing without persistence");
        let mut services = Self::in_memory(clock, questions, settings).await?;
        services.degraded_reason = Some(reason);
        Ok(services)
    }

    async fn from_storage(
        storage: Storage,
        clock: Clock,
        questions: QuestionBank,
        settings: QuizSettings,
    ) -> Result<Self, AppServicesError> {
        let identity = UserIdentityService::new(clock, Arc::clone(&storage.identity));
        let user_id = identity.ensure_user_id().await?;

        let quiz_loop = Arc::new(QuizLoopService::new(
            clock,
            Arc::new(questions),
            Arc::clone(&storage.attempts),
        ));
        let history = Arc::new(AttemptHistoryService::new(Arc::clone(&storage.attempts)));

        Ok(Self {
            user_id,
            settings,
            quiz_loop,
            history,
            degraded_reason: None,
        })
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn settings(&self) -> QuizSettings {
        self.settings
    }

    #[must_use]
    pub fn quiz_loop(&self) -> Arc<QuizLoopService> {
        Arc::clone(&self.quiz_loop)
    }

    #[must_use]
    pub fn history(&self) -> Arc<AttemptHistoryService> {
        Arc::clone(&self.history)
    }

    /// Why persistence is off, when running on the in-memory fallback.
    #[must_use]
    pub fn degraded_reason(&self) -> Option<&str> {
        self.degraded_reason.as_deref()
    }

    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded_reason.is_some()
    }
}
