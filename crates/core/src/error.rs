use thiserror::Error;

use crate::model::LivesError;
use crate::sequencer::SequencerError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Lives(#[from] LivesError),
    #[error(transparent)]
    Sequencer(#[from] SequencerError),
}
