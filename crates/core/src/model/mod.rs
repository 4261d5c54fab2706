mod exercise;
mod ids;
mod lives;
mod topic;

pub use exercise::{AnswerLetter, CorrectAnswer, Exercise, MIN_USABLE_OPTIONS};
pub use ids::{ExerciseId, ParseIdError, SubjectId, TopicId};
pub use lives::{DEFAULT_MAX_LIVES, LivesError, LivesState, RegenSchedule};
pub use topic::{COMPLETE_PERCENTAGE, TopicNode};
