#![forbid(unsafe_code)]

pub mod authoring_service;
pub mod error;
pub mod lives_clock;
pub mod overview_service;
pub mod sessions;

pub use practice_core::Clock;
pub use sessions as session;

pub use authoring_service::{AuthoringService, BulkImportReport};
pub use error::{AuthoringError, OverviewError, SessionError};
pub use lives_clock::{LivesClock, RegenHook};
pub use overview_service::{LevelSummary, SubjectOverview, SubjectOverviewService};
pub use sessions::{
    Feedback, PracticeLoopService, PracticeSession, RestartRejection, SessionAnswerResult,
    SessionEffect, SessionPhase, SessionProgress, SubmitRejection,
};
