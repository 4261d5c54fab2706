use std::sync::Arc;

use practice_core::model::TopicId;
use storage::records::ProgressKind;
use storage::repository::{ContentStore, ExerciseStore, LivesStore, Storage};

use super::service::{
    Feedback, PracticeSession, RestartRejection, SessionEffect, SessionPhase, SubmitRejection,
};
use crate::Clock;

/// Result of handing one answer to the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAnswerResult {
    /// The session could not take an answer; nothing was sent.
    Ignored(SubmitRejection),
    /// The store was asked. `feedback` tells whether it succeeded.
    Applied {
        phase: SessionPhase,
        feedback: Option<Feedback>,
    },
}

/// Runs `PracticeSession`s against the exercise, lives and content stores.
#[derive(Clone)]
pub struct PracticeLoopService {
    clock: Clock,
    exercises: Arc<dyn ExerciseStore>,
    lives: Arc<dyn LivesStore>,
    content: Arc<dyn ContentStore>,
}

impl PracticeLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        exercises: Arc<dyn ExerciseStore>,
        lives: Arc<dyn LivesStore>,
        content: Arc<dyn ContentStore>,
    ) -> Self {
        Self {
            clock,
            exercises,
            lives,
            content,
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage) -> Self {
        Self::new(
            clock,
            Arc::clone(&storage.exercises),
            Arc::clone(&storage.lives),
            Arc::clone(&storage.content),
        )
    }

    /// Open a session for the topic, loading lives and exercises concurrently.
    ///
    /// Load failures do not fail the call; they show up as session warnings.
    pub async fn open(&self, topic_id: TopicId) -> PracticeSession {
        let mut session = PracticeSession::new(topic_id, self.clock);
        tracing::info!(%topic_id, "opening practice session");

        let mut lives = self.lives.fetch();
        let mut exercises = self.exercises.fetch_by_topic(topic_id);
        let (mut lives_done, mut exercises_done) = (false, false);
        while !(lives_done && exercises_done) {
            tokio::select! {
                result = &mut lives, if !lives_done => {
                    lives_done = true;
                    session.apply_lives(result);
                }
                result = &mut exercises, if !exercises_done => {
                    exercises_done = true;
                    session.apply_exercises(result);
                }
            }
        }
        session
    }

    /// Submit `choice` (0-based option index) for the current exercise.
    pub async fn submit_answer(
        &self,
        session: &mut PracticeSession,
        choice: usize,
    ) -> SessionAnswerResult {
        let exercise_id = match session.begin_submission() {
            Ok(id) => id,
            Err(reason) => {
                tracing::debug!(?reason, "answer ignored");
                return SessionAnswerResult::Ignored(reason);
            }
        };

        let result = self.exercises.submit_answer(exercise_id, choice).await;
        let effect = session.apply_submission(result);
        self.run_effect(effect).await;

        SessionAnswerResult::Applied {
            phase: session.phase(),
            feedback: session.feedback().cloned(),
        }
    }

    /// Reset lives and reload the exercises of a finished session.
    ///
    /// # Errors
    ///
    /// Returns a `RestartRejection` if the session is not finished or a
    /// restart is already running. A failed reset is not an error; the
    /// session stays finished with feedback explaining why.
    pub async fn restart(&self, session: &mut PracticeSession) -> Result<(), RestartRejection> {
        session.begin_restart()?;
        session.apply_reset(self.lives.reset().await);

        if session.phase() == SessionPhase::Loading {
            session.apply_exercises(self.exercises.fetch_by_topic(session.topic_id()).await);
        }
        Ok(())
    }

    /// Re-read the authoritative lives count.
    pub async fn refresh_lives(&self, session: &mut PracticeSession) {
        session.apply_lives(self.lives.fetch().await);
    }

    /// Wait for the regeneration timer, then refresh lives.
    pub async fn await_regeneration(&self, session: &mut PracticeSession) {
        session.regeneration_due().await;
        self.refresh_lives(session).await;
    }

    /// Refresh lives if the timer already fired, without waiting.
    pub async fn poll_regeneration(&self, session: &mut PracticeSession) -> bool {
        if !session.take_regeneration_due() {
            return false;
        }
        self.refresh_lives(session).await;
        true
    }

    /// Stop timers for a session that is being closed.
    pub fn close(&self, session: &mut PracticeSession) {
        session.teardown();
    }

    async fn run_effect(&self, effect: SessionEffect) {
        match effect {
            SessionEffect::None => {}
            SessionEffect::MarkProgress(topic_id) => {
                // Completion stands even if the backend misses the mark.
                match self.content.mark_progress(topic_id, ProgressKind::Practice).await {
                    Ok(()) => tracing::info!(%topic_id, "practice progress recorded"),
                    Err(err) => {
                        tracing::warn!(%topic_id, error = %err, "could not record practice progress");
                    }
                }
            }
        }
    }
}
