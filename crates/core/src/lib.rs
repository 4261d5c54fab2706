#![forbid(unsafe_code)]

pub mod bulk_import;
pub mod error;
pub mod model;
pub mod progress;
pub mod sequencer;
pub mod time;
pub mod unlock;

pub use error::Error;
pub use sequencer::{ExerciseSequencer, SequencerError, SequencerProgress};
pub use time::Clock;
pub use unlock::UnlockGraph;
