mod progress;
mod service;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use progress::SessionProgress;
pub use service::{
    COMPLETED_FEEDBACK, CORRECT_FEEDBACK, EXERCISES_FAILED_WARNING, Feedback,
    INCORRECT_FEEDBACK, LIVES_FAILED_WARNING, OUT_OF_LIVES_FEEDBACK, PracticeSession,
    RESET_FAILED_WARNING, RestartRejection, SUBMIT_FAILED_FEEDBACK, SessionEffect,
    SessionPhase, SubmitRejection,
};
pub use workflow::{PracticeLoopService, SessionAnswerResult};
