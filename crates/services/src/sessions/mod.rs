mod progress;
mod service;
mod timer;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use progress::SessionProgress;
pub use service::QuizSession;
pub use timer::{QuestionTimer, TimerEvent, TimerEvents};
pub use workflow::{QuizAnswerResult, QuizLoopService, SessionStart};
