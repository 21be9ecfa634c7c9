mod attempt;
mod ids;
mod question;
mod settings;

pub use ids::{AttemptId, ParseIdError, UserId, UserIdError};

pub use attempt::{AnswerRecord, Attempt, AttemptError};
pub use question::{Question, QuestionBank, QuestionError, QuestionOption};
pub use settings::{QuizSettings, SettingsError};
