use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{AttemptId, Question, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("attempt already has id {existing}")]
    IdAlreadyAssigned { existing: AttemptId },

    #[error("attempt is already complete")]
    AlreadyComplete,

    #[error("answer count ({answers}) does not match question index ({index})")]
    ProgressMismatch { answers: usize, index: u32 },

    #[error("score ({score}) does not match correct answers ({correct})")]
    ScoreMismatch { score: u32, correct: u32 },

    #[error("too many answers for a single attempt: {len}")]
    TooManyAnswers { len: usize },
}

/// A single answered (or timed-out) question inside an attempt.
///
/// Texts are copied from the question at answer time so history stays
/// readable even if the bank changes later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question: String,
    pub user_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
}

impl AnswerRecord {
    /// Grade a choice against `question`. `None` means the timer expired.
    ///
    /// Returns `None` if `choice` names an option the question does not have.
    #[must_use]
    pub fn grade(question: &Question, choice: Option<&str>) -> Option<Self> {
        let user_answer = match choice {
            Some(option_id) => question.option(option_id)?.text.clone(),
            None => String::new(),
        };
        let is_correct = choice.is_some_and(|id| id == question.correct_option_id());
        Some(Self {
            question: question.text().to_owned(),
            user_answer,
            correct_answer: question.correct_text().to_owned(),
            is_correct,
        })
    }

    /// True when the record was produced by a timeout rather than a choice.
    #[must_use]
    pub fn timed_out(&self) -> bool {
        self.user_answer.is_empty()
    }
}

/// One run through the question sequence, complete or in progress.
///
/// `answers.len() == current_question_index` always holds, and `score` equals
/// the number of correct answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    id: Option<AttemptId>,
    user_id: UserId,
    timestamp: DateTime<Utc>,
    current_question_index: u32,
    score: u32,
    answers: Vec<AnswerRecord>,
    is_complete: bool,
}

impl Attempt {
    /// Start a fresh, unsaved attempt.
    #[must_use]
    pub fn start(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: None,
            user_id,
            timestamp: now,
            current_question_index: 0,
            score: 0,
            answers: Vec::new(),
            is_complete: false,
        }
    }

    /// Rehydrate an attempt from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::ProgressMismatch` or `AttemptError::ScoreMismatch`
    /// if the stored counters disagree with the answers.
    pub fn from_persisted(
        id: Option<AttemptId>,
        user_id: UserId,
        timestamp: DateTime<Utc>,
        current_question_index: u32,
        score: u32,
        answers: Vec<AnswerRecord>,
        is_complete: bool,
    ) -> Result<Self, AttemptError> {
        let answered = u32::try_from(answers.len())
            .map_err(|_| AttemptError::TooManyAnswers { len: answers.len() })?;
        if answered != current_question_index {
            return Err(AttemptError::ProgressMismatch {
                answers: answers.len(),
                index: current_question_index,
            });
        }
        let correct = count_correct(&answers);
        if correct != score {
            return Err(AttemptError::ScoreMismatch { score, correct });
        }

        Ok(Self {
            id,
            user_id,
            timestamp,
            current_question_index,
            score,
            answers,
            is_complete,
        })
    }

    #[must_use]
    pub fn id(&self) -> Option<AttemptId> {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[must_use]
    pub fn current_question_index(&self) -> u32 {
        self.current_question_index
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    /// Number of answered questions as a `usize`, for indexing into a bank.
    #[must_use]
    pub fn answered(&self) -> usize {
        self.answers.len()
    }

    /// Record the store-assigned id. Ids never change once set.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::IdAlreadyAssigned` if the attempt already has one.
    pub fn assign_id(&mut self, id: AttemptId) -> Result<(), AttemptError> {
        if let Some(existing) = self.id {
            return Err(AttemptError::IdAlreadyAssigned { existing });
        }
        self.id = Some(id);
        Ok(())
    }

    /// Append an answer and advance to the next question.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::AlreadyComplete` once the attempt is finished.
    pub fn record_answer(
        &mut self,
        answer: AnswerRecord,
        now: DateTime<Utc>,
    ) -> Result<(), AttemptError> {
        if self.is_complete {
            return Err(AttemptError::AlreadyComplete);
        }
        let next = self
            .current_question_index
            .checked_add(1)
            .ok_or(AttemptError::TooManyAnswers {
                len: self.answers.len(),
            })?;
        if answer.is_correct {
            self.score = self.score.saturating_add(1);
        }
        self.answers.push(answer);
        self.current_question_index = next;
        self.timestamp = now;
        Ok(())
    }

    /// Mark the attempt finished.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::AlreadyComplete` if called twice.
    pub fn mark_complete(&mut self, now: DateTime<Utc>) -> Result<(), AttemptError> {
        if self.is_complete {
            return Err(AttemptError::AlreadyComplete);
        }
        self.is_complete = true;
        self.timestamp = now;
        Ok(())
    }
}

fn count_correct(answers: &[AnswerRecord]) -> u32 {
    let n = answers.iter().filter(|a| a.is_correct).count();
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionOption;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn user() -> UserId {
        UserId::new("u1").unwrap()
    }

    fn question() -> Question {
        Question::new(
            "1",
            "2 + 2?",
            vec![QuestionOption::new("a", "3"), QuestionOption::new("b", "4")],
            "b",
        )
        .unwrap()
    }

    #[test]
    fn grading_copies_texts() {
        let q = question();
        let right = AnswerRecord::grade(&q, Some("b")).unwrap();
        assert!(right.is_correct);
        assert_eq!(right.user_answer, "4");
        assert_eq!(right.correct_answer, "4");

        let wrong = AnswerRecord::grade(&q, Some("a")).unwrap();
        assert!(!wrong.is_correct);
        assert_eq!(wrong.user_answer, "3");
    }

    #[test]
    fn timeout_is_graded_wrong_with_empty_answer() {
        let record = AnswerRecord::grade(&question(), None).unwrap();
        assert!(!record.is_correct);
        assert!(record.timed_out());
        assert_eq!(record.correct_answer, "4");
    }

    #[test]
    fn chosen_option_is_never_a_timeout() {
        let q = question();
        for option in q.options() {
            let record = AnswerRecord::grade(&q, Some(&option.id)).unwrap();
            assert!(!record.timed_out());
        }
        let blank = Question::new(
            "2",
            "Pick one",
            vec![QuestionOption::new("a", ""), QuestionOption::new("b", "x")],
            "a",
        );
        assert!(blank.is_err());
    }

    #[test]
    fn unknown_option_is_not_graded() {
        assert!(AnswerRecord::grade(&question(), Some("zzz")).is_none());
    }

    #[test]
    fn record_answer_advances_progress_and_score() {
        let now = fixed_now();
        let mut attempt = Attempt::start(user(), now);
        let later = now + Duration::seconds(5);

        attempt
            .record_answer(AnswerRecord::grade(&question(), Some("b")).unwrap(), later)
            .unwrap();
        attempt
            .record_answer(AnswerRecord::grade(&question(), None).unwrap(), later)
            .unwrap();

        assert_eq!(attempt.current_question_index(), 2);
        assert_eq!(attempt.score(), 1);
        assert_eq!(attempt.answers().len(), 2);
        assert_eq!(attempt.timestamp(), later);
        assert!(!attempt.is_complete());
    }

    #[test]
    fn completed_attempt_rejects_more_answers() {
        let now = fixed_now();
        let mut attempt = Attempt::start(user(), now);
        attempt.mark_complete(now).unwrap();

        let err = attempt
            .record_answer(AnswerRecord::grade(&question(), None).unwrap(), now)
            .unwrap_err();
        assert_eq!(err, AttemptError::AlreadyComplete);
        assert_eq!(attempt.mark_complete(now), Err(AttemptError::AlreadyComplete));
    }

    #[test]
    fn id_is_assigned_once() {
        let mut attempt = Attempt::start(user(), fixed_now());
        attempt.assign_id(AttemptId::new(1)).unwrap();
        let err = attempt.assign_id(AttemptId::new(2)).unwrap_err();
        assert_eq!(
            err,
            AttemptError::IdAlreadyAssigned {
                existing: AttemptId::new(1)
            }
        );
        assert_eq!(attempt.id(), Some(AttemptId::new(1)));
    }

    #[test]
    fn from_persisted_checks_counters() {
        let answers = vec![AnswerRecord::grade(&question(), Some("b")).unwrap()];

        let err = Attempt::from_persisted(None, user(), fixed_now(), 2, 1, answers.clone(), false)
            .unwrap_err();
        assert!(matches!(err, AttemptError::ProgressMismatch { .. }));

        let err = Attempt::from_persisted(None, user(), fixed_now(), 1, 0, answers.clone(), false)
            .unwrap_err();
        assert_eq!(err, AttemptError::ScoreMismatch { score: 0, correct: 1 });

        let ok =
            Attempt::from_persisted(Some(AttemptId::new(3)), user(), fixed_now(), 1, 1, answers, true)
                .unwrap();
        assert!(ok.is_complete());
        assert_eq!(ok.id(), Some(AttemptId::new(3)));
    }
}
