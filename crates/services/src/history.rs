use chrono::{DateTime, Utc};
use std::sync::Arc;

use quiz_core::model::{AnswerRecord, Attempt, AttemptId, UserId};
use storage::repository::AttemptRepository;

use crate::error::HistoryError;

/// Presentation-agnostic row of the attempt history list.
///
/// No pre-formatted strings; the caller formats timestamps as it likes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptHistoryItem {
    pub id: AttemptId,
    pub timestamp: DateTime<Utc>,
    pub score: u32,
    pub answered: usize,
    pub total_questions: usize,
    pub is_complete: bool,
}

impl AttemptHistoryItem {
    /// Builds an item for a stored attempt; `None` if it was never persisted.
    #[must_use]
    pub fn from_attempt(attempt: &Attempt, total_questions: usize) -> Option<Self> {
        Some(Self {
            id: attempt.id()?,
            timestamp: attempt.timestamp(),
            score: attempt.score(),
            answered: attempt.answered(),
            total_questions,
            is_complete: attempt.is_complete(),
        })
    }
}

/// Numbers for the results screen of a finished attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptSummary {
    pub score: u32,
    pub total_questions: usize,
    pub percent: u32,
    pub answers: Vec<AnswerRecord>,
}

impl AttemptSummary {
    #[must_use]
    pub fn from_attempt(attempt: &Attempt, total_questions: usize) -> Self {
        let percent = if total_questions == 0 {
            0
        } else {
            let total = u64::try_from(total_questions).unwrap_or(u64::MAX);
            // Round half up.
            let scaled = (u64::from(attempt.score()) * 200 + total) / (total * 2);
            u32::try_from(scaled).unwrap_or(100)
        };
        Self {
            score: attempt.score(),
            total_questions,
            percent,
            answers: attempt.answers().to_vec(),
        }
    }
}

/// Read-side facade over stored attempts for one user.
#[derive(Clone)]
pub struct AttemptHistoryService {
    attempts: Arc<dyn AttemptRepository>,
}

impl AttemptHistoryService {
    #[must_use]
    pub fn new(attempts: Arc<dyn AttemptRepository>) -> Self {
        Self { attempts }
    }

    /// All of the user's attempts, newest first (ties: newest insert first).
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Storage` on repository failures.
    pub async fn list(
        &self,
        user_id: &UserId,
        total_questions: usize,
    ) -> Result<Vec<AttemptHistoryItem>, HistoryError> {
        let attempts = self.attempts.list_by_user(user_id).await?;
        let mut items: Vec<AttemptHistoryItem> = attempts
            .iter()
            .filter_map(|a| AttemptHistoryItem::from_attempt(a, total_questions))
            .collect();
        items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        Ok(items)
    }
}
