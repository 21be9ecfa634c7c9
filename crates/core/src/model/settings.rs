use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("time per question must be greater than zero")]
    ZeroTimePerQuestion,
}

/// Timing knobs for a quiz session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizSettings {
    time_per_question: Duration,
    feedback_delay: Duration,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            time_per_question: Duration::from_secs(Self::DEFAULT_TIME_PER_QUESTION_SECS),
            feedback_delay: Duration::from_secs(2),
        }
    }
}

impl QuizSettings {
    pub const DEFAULT_TIME_PER_QUESTION_SECS: u64 = 30;

    /// Creates custom settings.
    ///
    /// `feedback_delay` is the pause between answering and advancing; zero
    /// disables it.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::ZeroTimePerQuestion` for a zero countdown.
    pub fn new(time_per_question: Duration, feedback_delay: Duration) -> Result<Self, SettingsError> {
        if time_per_question.is_zero() {
            return Err(SettingsError::ZeroTimePerQuestion);
        }
        Ok(Self {
            time_per_question,
            feedback_delay,
        })
    }

    #[must_use]
    pub fn time_per_question(&self) -> Duration {
        self.time_per_question
    }

    #[must_use]
    pub fn feedback_delay(&self) -> Duration {
        self.feedback_delay
    }
}
