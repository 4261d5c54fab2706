use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

use practice_core::model::{
    DEFAULT_MAX_LIVES, Exercise, ExerciseId, LivesState, RegenSchedule, TopicId,
};
use practice_core::progress::completion_message;
use practice_core::{Clock, ExerciseSequencer};
use storage::records::{AnswerOutcome, LivesSnapshot};
use storage::repository::StorageError;

use super::progress::SessionProgress;
use crate::error::SessionError;
use crate::lives_clock::{LivesClock, RegenHook};

pub const CORRECT_FEEDBACK: &str = "¡Correcto!";
pub const INCORRECT_FEEDBACK: &str = "Respuesta incorrecta";
pub const COMPLETED_FEEDBACK: &str = "¡Práctica completada!";
pub const OUT_OF_LIVES_FEEDBACK: &str = "Sin vidas disponibles";
pub const SUBMIT_FAILED_FEEDBACK: &str = "Ocurrió un problema al enviar tu respuesta.";
pub const EXERCISES_FAILED_WARNING: &str = "No se pudieron cargar los ejercicios.";
pub const LIVES_FAILED_WARNING: &str = "No se pudieron cargar tus vidas.";
pub const RESET_FAILED_WARNING: &str = "No se pudieron restablecer tus vidas.";

//
// ─── PHASES AND SIGNALS ────────────────────────────────────────────────────────
//

/// Where a practice session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    /// Waiting for lives and exercises.
    Loading,
    InProgress,
    /// Every exercise answered with lives left.
    Completed,
    /// Lives ran out; only a restart leaves this phase.
    OutOfLives,
}

impl SessionPhase {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::OutOfLives)
    }
}

/// Side effect the caller has to carry out after a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum SessionEffect {
    None,
    /// Record practice completion for the topic.
    MarkProgress(TopicId),
}

/// Why a submission was not started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejection {
    NotInProgress,
    NoLives,
    NoExercise,
    /// An earlier submission is still waiting for its result.
    InFlight,
}

/// Why a restart was not started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartRejection {
    NotFinished,
    InFlight,
}

/// Message shown to the learner after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub message: String,
    /// `None` for messages that are not about an answer.
    pub is_correct: Option<bool>,
}

impl Feedback {
    fn answer(message: impl Into<String>, is_correct: bool) -> Self {
        Self {
            message: message.into(),
            is_correct: Some(is_correct),
        }
    }

    fn notice(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_correct: None,
        }
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One learner's run through a topic's exercises, gated by lives.
///
/// The session never talks to a store. Callers start an action with a
/// `begin_*` method, perform the I/O, and hand the raw result to the matching
/// `apply_*` method; store failures become warnings or feedback and never
/// corrupt counters. `PracticeLoopService` drives this against real stores.
pub struct PracticeSession {
    topic_id: TopicId,
    phase: SessionPhase,
    lives: LivesClock,
    sequencer: ExerciseSequencer,
    lives_resolved: bool,
    exercises_resolved: bool,
    exercises_failed: bool,
    submitting: bool,
    restarting: bool,
    progress_marked: bool,
    level: u32,
    feedback: Option<Feedback>,
    warnings: Vec<String>,
    regen_rx: mpsc::UnboundedReceiver<()>,
}

impl PracticeSession {
    #[must_use]
    pub fn new(topic_id: TopicId, clock: Clock) -> Self {
        let (regen_tx, regen_rx) = mpsc::unbounded_channel();
        let hook: RegenHook = Arc::new(move || {
            // The receiver only goes away with the session, which also cancels the timer.
            let _ = regen_tx.send(());
        });

        Self {
            topic_id,
            phase: SessionPhase::Loading,
            lives: LivesClock::new(clock, hook),
            sequencer: ExerciseSequencer::default(),
            lives_resolved: false,
            exercises_resolved: false,
            exercises_failed: false,
            submitting: false,
            restarting: false,
            progress_marked: false,
            level: 1,
            feedback: None,
            warnings: Vec::new(),
            regen_rx,
        }
    }

    #[must_use]
    pub fn topic_id(&self) -> TopicId {
        self.topic_id
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn lives(&self) -> &LivesState {
        self.lives.state()
    }

    /// The exercise awaiting an answer; cleared outside `InProgress`.
    #[must_use]
    pub fn current_exercise(&self) -> Option<&Exercise> {
        match self.phase {
            SessionPhase::InProgress => self.sequencer.current(),
            _ => None,
        }
    }

    #[must_use]
    pub fn sequencer(&self) -> &ExerciseSequencer {
        &self.sequencer
    }

    /// Level of the exercise being practiced, falling back to 1.
    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    #[must_use]
    pub fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref()
    }

    /// Non-fatal load problems, oldest first.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    #[must_use]
    pub fn is_restarting(&self) -> bool {
        self.restarting
    }

    #[must_use]
    pub fn progress_marked(&self) -> bool {
        self.progress_marked
    }

    #[must_use]
    pub fn has_pending_regeneration(&self) -> bool {
        self.lives.has_pending()
    }

    /// Closing message for a completed run.
    #[must_use]
    pub fn completion_message(&self) -> Option<&'static str> {
        (self.phase == SessionPhase::Completed)
            .then(|| completion_message(self.sequencer.accuracy()))
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress::new(self.sequencer.progress(), self.lives.state(), self.phase)
    }

    // ─── LOADING ───────────────────────────────────────────────────────────

    /// Apply the result of reading the learner's lives.
    ///
    /// A failed read keeps the previous count. Terminal sessions ignore
    /// refreshes until restarted.
    pub fn apply_lives(&mut self, result: Result<LivesSnapshot, StorageError>) {
        if self.phase.is_terminal() {
            tracing::debug!(phase = ?self.phase, "lives refresh ignored in a finished session");
            return;
        }

        if let Err(err) = result.map_err(SessionError::from).and_then(|s| self.load_lives(&s)) {
            tracing::warn!(topic_id = %self.topic_id, error = %err, "could not load lives");
            self.warnings.push(LIVES_FAILED_WARNING.to_owned());
        }
        self.lives_resolved = true;
        self.settle();
    }

    fn load_lives(&mut self, snapshot: &LivesSnapshot) -> Result<(), SessionError> {
        let max = snapshot.lives_max.unwrap_or(DEFAULT_MAX_LIVES);
        let schedule = RegenSchedule::parse(snapshot.next_life_at.as_deref());
        self.lives.load(snapshot.lives, max, schedule)?;
        Ok(())
    }

    /// Apply the result of fetching the topic's exercises.
    ///
    /// A failed fetch leaves the session usable but empty, with a warning.
    pub fn apply_exercises(&mut self, result: Result<Vec<Exercise>, StorageError>) {
        if self.phase != SessionPhase::Loading {
            tracing::debug!(phase = ?self.phase, "late exercise list ignored");
            return;
        }

        match result {
            Ok(items) => {
                tracing::info!(topic_id = %self.topic_id, count = items.len(), "exercises loaded");
                self.exercises_failed = false;
                self.sequencer.load(items);
                self.refresh_level();
            }
            Err(err) => {
                tracing::warn!(topic_id = %self.topic_id, error = %err, "could not load exercises");
                self.exercises_failed = true;
                self.sequencer.load(Vec::new());
                self.warnings.push(EXERCISES_FAILED_WARNING.to_owned());
            }
        }
        self.exercises_resolved = true;
        self.settle();
    }

    /// Leave `Loading` once both lives and exercises have resolved.
    fn settle(&mut self) {
        match self.phase {
            SessionPhase::Loading if self.lives_resolved && self.exercises_resolved => {}
            SessionPhase::InProgress if self.lives.state().is_depleted() => {
                self.enter_out_of_lives();
                return;
            }
            _ => return,
        }

        if self.lives.state().is_depleted() {
            self.enter_out_of_lives();
        } else if self.sequencer.is_empty() && !self.exercises_failed {
            // Nothing was practiced, so progress is not recorded.
            self.phase = SessionPhase::Completed;
            self.feedback = Some(Feedback::notice(COMPLETED_FEEDBACK));
        } else {
            self.phase = SessionPhase::InProgress;
        }
        tracing::debug!(topic_id = %self.topic_id, phase = ?self.phase, "session ready");
    }

    // ─── ANSWERING ─────────────────────────────────────────────────────────

    /// Claim the current exercise for a submission.
    ///
    /// # Errors
    ///
    /// Returns a `SubmitRejection` when the session cannot take an answer right
    /// now; nothing changes in that case.
    pub fn begin_submission(&mut self) -> Result<ExerciseId, SubmitRejection> {
        if self.phase != SessionPhase::InProgress {
            return Err(SubmitRejection::NotInProgress);
        }
        if self.lives.state().is_depleted() {
            return Err(SubmitRejection::NoLives);
        }
        if self.submitting {
            return Err(SubmitRejection::InFlight);
        }
        let exercise_id = self
            .sequencer
            .current()
            .map(Exercise::id)
            .ok_or(SubmitRejection::NoExercise)?;
        self.submitting = true;
        Ok(exercise_id)
    }

    /// Apply the answer store's verdict for the claimed exercise.
    ///
    /// A failed call, or a verdict with an impossible lives count, leaves
    /// every counter untouched and only sets error feedback.
    pub fn apply_submission(&mut self, result: Result<AnswerOutcome, StorageError>) -> SessionEffect {
        if !std::mem::take(&mut self.submitting) {
            tracing::debug!("submission result without a pending submission ignored");
            return SessionEffect::None;
        }

        match result.map_err(SessionError::from).and_then(|o| self.apply_outcome(o)) {
            Ok(effect) => effect,
            Err(err) => {
                tracing::warn!(topic_id = %self.topic_id, error = %err, "answer submission failed");
                self.feedback = Some(Feedback::notice(SUBMIT_FAILED_FEEDBACK));
                SessionEffect::None
            }
        }
    }

    fn apply_outcome(&mut self, outcome: AnswerOutcome) -> Result<SessionEffect, SessionError> {
        let remaining = outcome.lives.unwrap_or_else(|| self.lives.current());
        // Validate before touching counters so a bad verdict changes nothing.
        self.lives.check_consume(remaining)?;
        self.sequencer.record_answer(outcome.is_correct)?;
        self.lives
            .consume(remaining, RegenSchedule::parse(outcome.next_life_at.as_deref()))?;

        if outcome.life_gained {
            tracing::debug!(lives = remaining, "life regenerated during submission");
        }

        let default_message = if outcome.is_correct {
            CORRECT_FEEDBACK
        } else {
            INCORRECT_FEEDBACK
        };
        let message = outcome
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| default_message.to_owned());
        self.feedback = Some(Feedback::answer(message, outcome.is_correct));

        if self.lives.state().is_depleted() {
            self.enter_out_of_lives();
            return Ok(SessionEffect::None);
        }

        self.sequencer.advance();
        if !self.sequencer.is_exhausted() {
            self.refresh_level();
            return Ok(SessionEffect::None);
        }

        self.phase = SessionPhase::Completed;
        self.lives.cancel();
        self.feedback = Some(Feedback::notice(COMPLETED_FEEDBACK));
        tracing::info!(
            topic_id = %self.topic_id,
            accuracy = self.sequencer.accuracy(),
            "practice completed"
        );
        if self.progress_marked {
            return Ok(SessionEffect::None);
        }
        self.progress_marked = true;
        Ok(SessionEffect::MarkProgress(self.topic_id))
    }

    fn enter_out_of_lives(&mut self) {
        self.phase = SessionPhase::OutOfLives;
        self.lives.cancel();
        self.feedback = Some(Feedback::notice(OUT_OF_LIVES_FEEDBACK));
        tracing::info!(topic_id = %self.topic_id, "out of lives");
    }

    fn refresh_level(&mut self) {
        self.level = self.sequencer.current().map_or(1, Exercise::level);
    }

    // ─── RESTART ───────────────────────────────────────────────────────────

    /// Claim a restart from a finished session.
    ///
    /// # Errors
    ///
    /// Returns a `RestartRejection` unless the session is terminal and no
    /// other restart is running.
    pub fn begin_restart(&mut self) -> Result<(), RestartRejection> {
        if !self.phase.is_terminal() {
            return Err(RestartRejection::NotFinished);
        }
        if self.restarting {
            return Err(RestartRejection::InFlight);
        }
        self.restarting = true;
        Ok(())
    }

    /// Apply the result of resetting lives.
    ///
    /// Success moves back to `Loading` with the reset lives already applied;
    /// the caller then fetches exercises. Failure keeps the finished state.
    pub fn apply_reset(&mut self, result: Result<LivesSnapshot, StorageError>) {
        if !std::mem::take(&mut self.restarting) {
            return;
        }

        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(topic_id = %self.topic_id, error = %err, "lives reset failed");
                self.feedback = Some(Feedback::notice(RESET_FAILED_WARNING));
                return;
            }
        };

        tracing::info!(topic_id = %self.topic_id, "restarting practice");
        self.phase = SessionPhase::Loading;
        self.lives_resolved = false;
        self.exercises_resolved = false;
        self.exercises_failed = false;
        self.feedback = None;
        self.warnings.clear();
        self.sequencer.load(Vec::new());
        self.level = 1;
        self.apply_lives(Ok(snapshot));
    }

    // ─── REGENERATION ──────────────────────────────────────────────────────

    /// Wait until the lives timer fires.
    pub async fn regeneration_due(&mut self) {
        // The sender lives inside `self.lives`, so the channel never closes here.
        let _ = self.regen_rx.recv().await;
    }

    /// Consume one pending regeneration signal without waiting.
    pub fn take_regeneration_due(&mut self) -> bool {
        let mut due = false;
        while self.regen_rx.try_recv().is_ok() {
            due = true;
        }
        due
    }

    /// Stop the regeneration timer. Call when the session is closed.
    pub fn teardown(&mut self) {
        self.lives.cancel();
        tracing::debug!(topic_id = %self.topic_id, "session torn down");
    }
}

impl fmt::Debug for PracticeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PracticeSession")
            .field("topic_id", &self.topic_id)
            .field("phase", &self.phase)
            .field("lives", &self.lives)
            .field("cursor", &self.sequencer.cursor())
            .field("total", &self.sequencer.len())
            .finish_non_exhaustive()
    }
}
