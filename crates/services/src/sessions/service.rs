use std::sync::Arc;

use chrono::{DateTime, Utc};
use quiz_core::model::{AnswerRecord, Attempt, AttemptId, Question, QuestionBank, UserId};

use super::progress::SessionProgress;
use crate::error::SessionError;

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory state of one quiz run.
///
/// Owns the attempt being built and steps through the question bank in order.
/// Persistence is driven from outside by `QuizLoopService`; the session stays
/// authoritative even when a write fails.
#[derive(Debug, Clone)]
pub struct QuizSession {
    questions: Arc<QuestionBank>,
    attempt: Attempt,
}

impl QuizSession {
    /// Begin a fresh, unsaved run for `user_id`.
    #[must_use]
    pub fn fresh(user_id: UserId, questions: Arc<QuestionBank>, now: DateTime<Utc>) -> Self {
        Self {
            questions,
            attempt: Attempt::start(user_id, now),
        }
    }

    /// Continue (or review) a stored attempt.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ProgressOutOfRange` if the attempt answered more
    /// questions than the bank holds, or is incomplete with nothing left to ask.
    pub fn resume(attempt: Attempt, questions: Arc<QuestionBank>) -> Result<Self, SessionError> {
        let answered = attempt.answered();
        let total = questions.len();
        let exhausted = !attempt.is_complete() && answered >= total;
        if answered > total || exhausted {
            return Err(SessionError::ProgressOutOfRange { answered, total });
        }
        Ok(Self { questions, attempt })
    }

    #[must_use]
    pub fn attempt(&self) -> &Attempt {
        &self.attempt
    }

    #[must_use]
    pub fn attempt_id(&self) -> Option<AttemptId> {
        self.attempt.id()
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        self.attempt.user_id()
    }

    #[must_use]
    pub fn questions(&self) -> &QuestionBank {
        &self.questions
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    /// Zero-based index of the question being asked.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.attempt.answered()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        if self.attempt.is_complete() {
            return None;
        }
        self.questions.get(self.current_index())
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.attempt.is_complete()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.total_questions();
        let answered = self.attempt.answered();
        SessionProgress {
            total,
            answered,
            remaining: total.saturating_sub(answered),
            score: self.attempt.score(),
            is_complete: self.is_complete(),
        }
    }

    /// Answer the current question. `None` records a timeout.
    ///
    /// Marks the attempt complete after the last question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if nothing is left to answer and
    /// `SessionError::UnknownOption` if `choice` is not an option of the question.
    pub fn answer(
        &mut self,
        choice: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<AnswerRecord, SessionError> {
        if self.attempt.is_complete() {
            return Err(SessionError::Completed);
        }
        let question = self
            .questions
            .get(self.attempt.answered())
            .ok_or(SessionError::Completed)?;
        let record =
            AnswerRecord::grade(question, choice).ok_or_else(|| SessionError::UnknownOption {
                question_id: question.id().to_owned(),
                option_id: choice.unwrap_or_default().to_owned(),
            })?;

        self.attempt.record_answer(record.clone(), now)?;
        if self.attempt.answered() >= self.questions.len() {
            self.attempt.mark_complete(now)?;
        }
        Ok(record)
    }

    /// Apply a timer expiry for `question_index`.
    ///
    /// Returns `Ok(None)` for a stale expiry (a question that is no longer
    /// current, or a finished session).
    ///
    /// # Errors
    ///
    /// Propagates errors from [`QuizSession::answer`].
    pub fn time_out(
        &mut self,
        question_index: usize,
        now: DateTime<Utc>,
    ) -> Result<Option<AnswerRecord>, SessionError> {
        if self.is_complete() || question_index != self.current_index() {
            return Ok(None);
        }
        self.answer(None, now).map(Some)
    }

    pub(crate) fn assign_attempt_id(&mut self, id: AttemptId) -> Result<(), SessionError> {
        self.attempt.assign_id(id)?;
        Ok(())
    }
}
