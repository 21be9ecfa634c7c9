#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod history;
pub mod identity;
pub mod sessions;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, HistoryError, IdentityError, SessionError};
pub use history::{AttemptHistoryItem, AttemptHistoryService, AttemptSummary};
pub use identity::UserIdentityService;

pub use sessions::{
    QuestionTimer, QuizAnswerResult, QuizLoopService, QuizSession, SessionProgress, SessionStart,
    TimerEvent, TimerEvents,
};
