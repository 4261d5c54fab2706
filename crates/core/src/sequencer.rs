//! Ordered stepping through a topic's exercises with accuracy and streak tracking.

use thiserror::Error;

use crate::model::Exercise;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SequencerError {
    #[error("every exercise in the sequence has already been answered")]
    Exhausted,
}

/// Snapshot of sequencer counters, useful for UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerProgress {
    pub total: usize,
    pub completed: usize,
    pub correct: usize,
    pub attempts: usize,
    pub streak: u32,
    pub best_streak: u32,
    pub accuracy: u32,
    pub percent: u32,
}

/// Steps through a fixed list of exercises, one attempt per exercise.
///
/// Counters only move through [`ExerciseSequencer::record_answer`] and
/// [`ExerciseSequencer::advance`], which keeps `cursor <= len`,
/// `completed <= len` and `correct <= attempts`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExerciseSequencer {
    items: Vec<Exercise>,
    cursor: usize,
    completed: usize,
    correct: usize,
    attempts: usize,
    streak: u32,
    best_streak: u32,
}

impl ExerciseSequencer {
    #[must_use]
    pub fn new(items: Vec<Exercise>) -> Self {
        let mut sequencer = Self::default();
        sequencer.load(items);
        sequencer
    }

    /// Replace the items and reset the per-run counters.
    ///
    /// `best_streak` survives reloads so a restarted session keeps its record.
    pub fn load(&mut self, items: Vec<Exercise>) {
        *self = Self {
            items,
            best_streak: self.best_streak,
            ..Self::default()
        };
    }

    #[must_use]
    pub fn current(&self) -> Option<&Exercise> {
        self.items.get(self.cursor)
    }

    #[must_use]
    pub fn items(&self) -> &[Exercise] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// No exercise left to present. An empty sequence is exhausted from the start.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.items.len()
    }

    /// Count an attempt on the current slot.
    ///
    /// # Errors
    ///
    /// Returns `SequencerError::Exhausted` when every slot is already used;
    /// counters are left untouched in that case.
    pub fn record_answer(&mut self, is_correct: bool) -> Result<(), SequencerError> {
        if self.completed >= self.items.len() {
            return Err(SequencerError::Exhausted);
        }

        self.attempts += 1;
        if is_correct {
            self.correct += 1;
            self.streak = self.streak.saturating_add(1);
            self.best_streak = self.best_streak.max(self.streak);
        } else {
            self.streak = 0;
        }
        self.completed += 1;
        Ok(())
    }

    /// Move to the next exercise. Saturates at the end of the sequence.
    pub fn advance(&mut self) {
        if self.cursor < self.items.len() {
            self.cursor += 1;
        }
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.completed
    }

    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.correct
    }

    #[must_use]
    pub fn attempt_count(&self) -> usize {
        self.attempts
    }

    #[must_use]
    pub fn streak(&self) -> u32 {
        self.streak
    }

    #[must_use]
    pub fn best_streak(&self) -> u32 {
        self.best_streak
    }

    /// Rounded share of correct attempts, `0` before any attempt.
    #[must_use]
    pub fn accuracy(&self) -> u32 {
        rounded_percent(self.correct, self.attempts)
    }

    /// Rounded share of answered slots, `0` for an empty sequence.
    #[must_use]
    pub fn progress_percent(&self) -> u32 {
        rounded_percent(self.completed, self.items.len())
    }

    #[must_use]
    pub fn progress(&self) -> SequencerProgress {
        SequencerProgress {
            total: self.items.len(),
            completed: self.completed,
            correct: self.correct,
            attempts: self.attempts,
            streak: self.streak,
            best_streak: self.best_streak,
            accuracy: self.accuracy(),
            percent: self.progress_percent(),
        }
    }
}

/// `round(part / whole * 100)` with halves rounded up; `0` when `whole == 0`.
#[must_use]
pub fn rounded_percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    let part = part.min(whole);
    let value = (part * 100 + whole / 2) / whole;
    u32::try_from(value).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExerciseId, TopicId};

    fn exercise(id: u64) -> Exercise {
        Exercise::new(
            ExerciseId::new(id),
            TopicId::new(1),
            format!("Q{id}"),
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
            None,
            1,
        )
    }

    fn sequencer(n: u64) -> ExerciseSequencer {
        ExerciseSequencer::new((1..=n).map(exercise).collect())
    }

    #[test]
    fn empty_sequence_is_exhausted_immediately() {
        let seq = ExerciseSequencer::new(Vec::new());
        assert!(seq.is_exhausted());
        assert!(seq.current().is_none());
        assert_eq!(seq.progress_percent(), 0);
        assert_eq!(seq.accuracy(), 0);
    }

    #[test]
    fn completed_tracks_submissions() {
        let mut seq = sequencer(3);
        for n in 1..=3 {
            seq.record_answer(n % 2 == 0).unwrap();
            seq.advance();
            assert_eq!(seq.completed_count(), n);
        }
        assert!(seq.is_exhausted());
        assert_eq!(seq.record_answer(true), Err(SequencerError::Exhausted));
        assert_eq!(seq.completed_count(), 3);
        assert_eq!(seq.attempt_count(), 3);
    }

    #[test]
    fn streak_resets_on_incorrect_and_best_is_kept() {
        let mut seq = sequencer(5);
        for correct in [true, true, false, true] {
            seq.record_answer(correct).unwrap();
            seq.advance();
            assert!(seq.streak() <= seq.best_streak());
        }
        assert_eq!(seq.streak(), 1);
        assert_eq!(seq.best_streak(), 2);
    }

    #[test]
    fn accuracy_and_progress_round_half_up() {
        let mut seq = sequencer(3);
        seq.record_answer(true).unwrap();
        seq.advance();
        seq.record_answer(false).unwrap();
        seq.advance();
        assert_eq!(seq.accuracy(), 50);
        assert_eq!(seq.progress_percent(), 67);

        let progress = seq.progress();
        assert_eq!(progress.total, 3);
        assert_eq!(progress.correct, 1);
        assert_eq!(progress.attempts, 2);
    }

    #[test]
    fn load_resets_counters() {
        let mut seq = sequencer(2);
        seq.record_answer(true).unwrap();
        seq.advance();
        seq.load(vec![exercise(9)]);
        assert_eq!(seq.cursor(), 0);
        assert_eq!(seq.completed_count(), 0);
        assert_eq!(seq.streak(), 0);
        assert_eq!(seq.best_streak(), 1);
        assert_eq!(seq.current().map(Exercise::id), Some(ExerciseId::new(9)));
    }

    #[test]
    fn advance_saturates() {
        let mut seq = sequencer(1);
        seq.advance();
        seq.advance();
        assert_eq!(seq.cursor(), 1);
    }

    #[test]
    fn rounded_percent_bounds() {
        assert_eq!(rounded_percent(0, 0), 0);
        assert_eq!(rounded_percent(1, 8), 13);
        assert_eq!(rounded_percent(5, 5), 100);
    }
}
