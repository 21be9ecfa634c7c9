use std::sync::Arc;

use quiz_core::model::{AnswerRecord, AttemptId, QuestionBank, UserId};
use storage::repository::AttemptRepository;

use super::progress::SessionProgress;
use super::service::QuizSession;
use crate::Clock;
use crate::error::SessionError;

/// Result of answering (or timing out on) a single question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizAnswerResult {
    pub answer: AnswerRecord,
    pub progress: SessionProgress,
    pub is_complete: bool,
    pub attempt_id: Option<AttemptId>,
    /// False when the write failed; the in-memory session still holds the answer.
    pub persisted: bool,
}

/// How a session was obtained at startup.
#[derive(Debug, Clone)]
pub struct SessionStart {
    pub session: QuizSession,
    pub resumed: bool,
}

/// Orchestrates session start/resume and persisted answering.
#[derive(Clone)]
pub struct QuizLoopService {
    clock: Clock,
    questions: Arc<QuestionBank>,
    attempts: Arc<dyn AttemptRepository>,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        questions: Arc<QuestionBank>,
        attempts: Arc<dyn AttemptRepository>,
    ) -> Self {
        Self {
            clock,
            questions,
            attempts,
        }
    }

    #[must_use]
    pub fn questions(&self) -> &Arc<QuestionBank> {
        &self.questions
    }

    /// Resume the user's latest incomplete attempt, or begin a fresh one.
    ///
    /// Lookup failures and attempts that no longer fit the question bank are
    /// logged and fall back to a fresh session.
    pub async fn start_or_resume(&self, user_id: &UserId) -> SessionStart {
        match self.attempts.latest_incomplete(user_id).await {
            Ok(Some(attempt)) => {
                let id = attempt.id();
                match QuizSession::resume(attempt, Arc::clone(&self.questions)) {
                    Ok(session) => {
                        tracing::info!(
                            attempt_id = ?id,
                            index = session.current_index(),
                            "resuming attempt"
                        );
                        return SessionStart {
                            session,
                            resumed: true,
                        };
                    }
                    Err(err) => {
                        tracing::warn!(attempt_id = ?id, error = %err, "cannot resume attempt");
                    }
                }
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(error = %err, "failed to look up resumable attempt");
            }
        }

        SessionStart {
            session: self.start_new(user_id),
            resumed: false,
        }
    }

    /// Begin a fresh attempt. Nothing is written until the first answer.
    #[must_use]
    pub fn start_new(&self, user_id: &UserId) -> QuizSession {
        QuizSession::fresh(
            user_id.clone(),
            Arc::clone(&self.questions),
            self.clock.now(),
        )
    }

    /// Reopen an attempt picked from history, for review or continuation.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the attempt cannot be loaded,
    /// `SessionError::ForeignAttempt` if it belongs to another user, or
    /// `SessionError::ProgressOutOfRange` if it does not fit the question bank.
    pub async fn open_attempt(
        &self,
        user_id: &UserId,
        id: AttemptId,
    ) -> Result<QuizSession, SessionError> {
        let attempt = self.attempts.get(id).await?;
        if attempt.user_id() != user_id {
            return Err(SessionError::ForeignAttempt(id));
        }
        QuizSession::resume(attempt, Arc::clone(&self.questions))
    }

    /// Answer the current question with `option_id` and persist the attempt.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the answer is rejected. Persistence failures
    /// are logged and reported through `QuizAnswerResult::persisted`.
    pub async fn answer_current(
        &self,
        session: &mut QuizSession,
        option_id: &str,
    ) -> Result<QuizAnswerResult, SessionError> {
        let answer = session.answer(Some(option_id), self.clock.now())?;
        Ok(self.after_answer(session, answer).await)
    }

    /// Apply a timer expiry for `question_index` and persist the attempt.
    ///
    /// Returns `Ok(None)` for a stale expiry, which changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the timeout cannot be applied.
    pub async fn time_out(
        &self,
        session: &mut QuizSession,
        question_index: usize,
    ) -> Result<Option<QuizAnswerResult>, SessionError> {
        let Some(answer) = session.time_out(question_index, self.clock.now())? else {
            tracing::debug!(question_index, "ignoring stale timeout");
            return Ok(None);
        };
        Ok(Some(self.after_answer(session, answer).await))
    }

    /// Write the session's attempt now, surfacing any storage error.
    ///
    /// Useful to retry after a failed write reported by `answer_current`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the write fails.
    pub async fn flush(&self, session: &mut QuizSession) -> Result<AttemptId, SessionError> {
        match session.attempt_id() {
            Some(id) => {
                self.attempts.update(session.attempt()).await?;
                Ok(id)
            }
            None => {
                let id = self.attempts.create(session.attempt()).await?;
                session.assign_attempt_id(id)?;
                tracing::info!(attempt_id = %id, user_id = %session.user_id(), "attempt created");
                Ok(id)
            }
        }
    }

    async fn after_answer(&self, session: &mut QuizSession, answer: AnswerRecord) -> QuizAnswerResult {
        let persisted = match self.flush(session).await {
            Ok(id) => {
                if session.is_complete() {
                    tracing::info!(attempt_id = %id, score = session.attempt().score(), "attempt completed");
                }
                true
            }
            Err(err) => {
                tracing::warn!(
                    attempt_id = ?session.attempt_id(),
                    error = %err,
                    "failed to persist attempt; continuing in memory"
                );
                false
            }
        };

        QuizAnswerResult {
            answer,
            progress: session.progress(),
            is_complete: session.is_complete(),
            attempt_id: session.attempt_id(),
            persisted,
        }
    }
}
