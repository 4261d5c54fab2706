use practice_core::SequencerProgress;
use practice_core::model::LivesState;
use practice_core::progress::progress_segments;

use super::service::SessionPhase;

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub phase: SessionPhase,
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub correct: usize,
    pub accuracy: u32,
    pub percent: u32,
    pub streak: u32,
    pub best_streak: u32,
    /// Fill of each weighted progress-bar segment, 0..=100.
    pub segments: [u32; 3],
    /// One entry per life slot, `true` while available.
    pub hearts: Vec<bool>,
}

impl SessionProgress {
    pub(crate) fn new(counters: SequencerProgress, lives: &LivesState, phase: SessionPhase) -> Self {
        Self {
            phase,
            total: counters.total,
            answered: counters.completed,
            remaining: counters.total.saturating_sub(counters.completed),
            correct: counters.correct,
            accuracy: counters.accuracy,
            percent: counters.percent,
            streak: counters.streak,
            best_streak: counters.best_streak,
            segments: progress_segments(counters.percent),
            hearts: lives.hearts(),
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase == SessionPhase::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combines_counters_and_lives() {
        let counters = SequencerProgress {
            total: 4,
            completed: 2,
            correct: 1,
            attempts: 2,
            streak: 1,
            best_streak: 1,
            accuracy: 50,
            percent: 50,
        };
        let lives = LivesState::new(1, 3, None).unwrap();
        let progress = SessionProgress::new(counters, &lives, SessionPhase::InProgress);

        assert_eq!(progress.remaining, 2);
        assert_eq!(progress.segments, [100, 67, 0]);
        assert_eq!(progress.hearts, [true, false, false]);
        assert!(!progress.is_complete());
    }
}
