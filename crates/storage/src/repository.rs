use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use practice_core::Clock;
use practice_core::model::{DEFAULT_MAX_LIVES, Exercise, ExerciseId, SubjectId, TopicId, TopicNode};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

use crate::http::{HttpBackend, HttpConfig};
use crate::records::{
    AnswerOutcome, BulkCreateReceipt, BulkExercisePayload, ExerciseRecord, LivesSnapshot,
    ProgressKind, TopicRecord,
};

/// Errors surfaced by store adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("backend responded with status {0}")]
    Http(reqwest::StatusCode),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Exercises of a topic and answer checking.
#[async_trait]
pub trait ExerciseStore: Send + Sync {
    /// Fetch a topic's exercises in presentation order. May be empty.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the exercises cannot be fetched.
    async fn fetch_by_topic(&self, topic_id: TopicId) -> Result<Vec<Exercise>, StorageError>;

    /// Submit the selected option index for an exercise.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown exercise, or other storage errors.
    async fn submit_answer(
        &self,
        exercise_id: ExerciseId,
        choice: usize,
    ) -> Result<AnswerOutcome, StorageError>;
}

/// Authoritative source of the learner's lives.
#[async_trait]
pub trait LivesStore: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the lives cannot be read.
    async fn fetch(&self) -> Result<LivesSnapshot, StorageError>;

    /// Refill lives to the maximum.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the reset is refused or fails.
    async fn reset(&self) -> Result<LivesSnapshot, StorageError>;
}

/// Progress marks and authored content.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the mark cannot be stored.
    async fn mark_progress(&self, topic_id: TopicId, kind: ProgressKind)
    -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the exercises cannot be created.
    async fn bulk_create(
        &self,
        topic_id: TopicId,
        exercises: &[BulkExercisePayload],
    ) -> Result<BulkCreateReceipt, StorageError>;
}

/// Topics of a subject with the learner's progress.
#[async_trait]
pub trait TopicStore: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the topics cannot be fetched.
    async fn topics_by_subject(&self, subject_id: SubjectId)
    -> Result<Vec<TopicNode>, StorageError>;
}

//
// ─── IN-MEMORY BACKEND ─────────────────────────────────────────────────────────
//

/// Default time for one life to come back.
pub const DEFAULT_REGEN_INTERVAL_MINUTES: i64 = 30;

#[derive(Debug)]
struct MemoryState {
    exercises: BTreeMap<TopicId, Vec<ExerciseRecord>>,
    topics: Vec<TopicRecord>,
    lives: u32,
    max_lives: u32,
    next_life_at: Option<DateTime<Utc>>,
    regen_interval: Duration,
    progress_marks: Vec<(TopicId, ProgressKind)>,
    bulk_created: Vec<(TopicId, BulkExercisePayload)>,
    offline: bool,
}

impl MemoryState {
    /// Grant every life whose regeneration instant has passed.
    fn regenerate(&mut self, now: DateTime<Utc>) {
        while let Some(at) = self.next_life_at {
            if at > now || self.lives >= self.max_lives {
                break;
            }
            self.lives += 1;
            self.next_life_at = (self.lives < self.max_lives).then(|| at + self.regen_interval);
        }
        if self.lives >= self.max_lives {
            self.next_life_at = None;
        }
    }

    fn snapshot(&self) -> LivesSnapshot {
        LivesSnapshot {
            lives: self.lives,
            lives_max: Some(self.max_lives),
            next_life_at: self.next_life_at.map(|at| at.to_rfc3339()),
        }
    }
}

/// In-memory backend for testing and prototyping.
///
/// Mirrors the remote backend's lives rules: a wrong answer costs one life and
/// lives come back one per regeneration interval, evaluated against `clock`.
#[derive(Clone, Debug)]
pub struct InMemoryRepository {
    clock: Arc<Mutex<Clock>>,
    state: Arc<Mutex<MemoryState>>,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new(Clock::default())
    }
}

impl InMemoryRepository {
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock: Arc::new(Mutex::new(clock)),
            state: Arc::new(Mutex::new(MemoryState {
                exercises: BTreeMap::new(),
                topics: Vec::new(),
                lives: DEFAULT_MAX_LIVES,
                max_lives: DEFAULT_MAX_LIVES,
                next_life_at: None,
                regen_interval: Duration::minutes(DEFAULT_REGEN_INTERVAL_MINUTES),
                progress_marks: Vec::new(),
                bulk_created: Vec::new(),
                offline: false,
            })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    /// Lock for an operation that should fail while offline.
    fn lock_online(&self) -> Result<MutexGuard<'_, MemoryState>, StorageError> {
        let guard = self.lock()?;
        if guard.offline {
            return Err(StorageError::Connection("backend offline".into()));
        }
        Ok(guard)
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.lock().map_or_else(|_| Utc::now(), |clock| clock.now())
    }

    /// Move a fixed clock forward; no effect on a system clock.
    pub fn advance_clock(&self, delta: Duration) {
        if let Ok(mut clock) = self.clock.lock() {
            clock.advance(delta);
        }
    }

    /// Set the learner's lives directly.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the state lock is poisoned.
    pub fn set_lives(&self, lives: u32, max_lives: u32) -> Result<(), StorageError> {
        let now = self.now();
        let mut guard = self.lock()?;
        let max_lives = max_lives.max(1);
        let lives = lives.min(max_lives);
        let next_life_at = now + guard.regen_interval;
        guard.max_lives = max_lives;
        guard.lives = lives;
        guard.next_life_at = (lives < max_lives).then_some(next_life_at);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the state lock is poisoned.
    pub fn set_regen_interval(&self, interval: Duration) -> Result<(), StorageError> {
        self.lock()?.regen_interval = interval;
        Ok(())
    }

    /// Make every store operation fail with a connection error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the state lock is poisoned.
    pub fn set_offline(&self, offline: bool) -> Result<(), StorageError> {
        self.lock()?.offline = offline;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the state lock is poisoned.
    pub fn insert_exercise(&self, record: ExerciseRecord) -> Result<(), StorageError> {
        self.lock()?
            .exercises
            .entry(record.topic_id)
            .or_default()
            .push(record);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the state lock is poisoned.
    pub fn insert_topic(&self, record: TopicRecord) -> Result<(), StorageError> {
        self.lock()?.topics.push(record);
        Ok(())
    }

    /// Progress marks received so far, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the state lock is poisoned.
    pub fn progress_marks(&self) -> Result<Vec<(TopicId, ProgressKind)>, StorageError> {
        Ok(self.lock()?.progress_marks.clone())
    }

    /// Exercises created through `bulk_create` for a topic.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the state lock is poisoned.
    pub fn bulk_created(&self, topic_id: TopicId) -> Result<Vec<BulkExercisePayload>, StorageError> {
        Ok(self
            .lock()?
            .bulk_created
            .iter()
            .filter(|(id, _)| *id == topic_id)
            .map(|(_, payload)| payload.clone())
            .collect())
    }
}

#[async_trait]
impl ExerciseStore for InMemoryRepository {
    async fn fetch_by_topic(&self, topic_id: TopicId) -> Result<Vec<Exercise>, StorageError> {
        let guard = self.lock_online()?;
        Ok(guard
            .exercises
            .get(&topic_id)
            .map(|records| records.iter().cloned().map(ExerciseRecord::into_exercise).collect())
            .unwrap_or_default())
    }

    async fn submit_answer(
        &self,
        exercise_id: ExerciseId,
        choice: usize,
    ) -> Result<AnswerOutcome, StorageError> {
        let now = self.now();
        let mut guard = self.lock_online()?;
        let exercise = guard
            .exercises
            .values()
            .flatten()
            .find(|record| record.id == exercise_id)
            .cloned()
            .ok_or(StorageError::NotFound)?
            .into_exercise();

        guard.regenerate(now);
        let lives_before = guard.lives;
        let is_correct = exercise.correct().is_some_and(|c| c.index() == choice);
        if !is_correct {
            guard.lives = guard.lives.saturating_sub(1);
            if guard.next_life_at.is_none() && guard.lives < guard.max_lives {
                guard.next_life_at = Some(now + guard.regen_interval);
            }
        }

        Ok(AnswerOutcome {
            is_correct,
            message: None,
            lives: Some(guard.lives),
            life_gained: guard.lives > lives_before,
            next_life_at: guard.next_life_at.map(|at| at.to_rfc3339()),
        })
    }
}

#[async_trait]
impl LivesStore for InMemoryRepository {
    async fn fetch(&self) -> Result<LivesSnapshot, StorageError> {
        let now = self.now();
        let mut guard = self.lock_online()?;
        guard.regenerate(now);
        Ok(guard.snapshot())
    }

    async fn reset(&self) -> Result<LivesSnapshot, StorageError> {
        let mut guard = self.lock_online()?;
        guard.lives = guard.max_lives;
        guard.next_life_at = None;
        Ok(guard.snapshot())
    }
}

#[async_trait]
impl ContentStore for InMemoryRepository {
    async fn mark_progress(
        &self,
        topic_id: TopicId,
        kind: ProgressKind,
    ) -> Result<(), StorageError> {
        self.lock_online()?.progress_marks.push((topic_id, kind));
        Ok(())
    }

    async fn bulk_create(
        &self,
        topic_id: TopicId,
        exercises: &[BulkExercisePayload],
    ) -> Result<BulkCreateReceipt, StorageError> {
        let mut guard = self.lock_online()?;
        guard
            .bulk_created
            .extend(exercises.iter().cloned().map(|payload| (topic_id, payload)));
        Ok(BulkCreateReceipt {
            count: Some(exercises.len()),
        })
    }
}

#[async_trait]
impl TopicStore for InMemoryRepository {
    async fn topics_by_subject(
        &self,
        subject_id: SubjectId,
    ) -> Result<Vec<TopicNode>, StorageError> {
        let guard = self.lock_online()?;
        Ok(guard
            .topics
            .iter()
            .filter(|topic| topic.subject_id == subject_id)
            .cloned()
            .map(TopicRecord::into_node)
            .collect())
    }
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Aggregates the store contracts behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub exercises: Arc<dyn ExerciseStore>,
    pub lives: Arc<dyn LivesStore>,
    pub content: Arc<dyn ContentStore>,
    pub topics: Arc<dyn TopicStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory(repo: InMemoryRepository) -> Self {
        Self {
            exercises: Arc::new(repo.clone()),
            lives: Arc::new(repo.clone()),
            content: Arc::new(repo.clone()),
            topics: Arc::new(repo),
        }
    }

    /// Stores backed by the remote REST backend.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Transport` if the HTTP client cannot be built.
    pub fn http(config: HttpConfig) -> Result<Self, StorageError> {
        let backend = Arc::new(HttpBackend::new(config)?);
        Ok(Self {
            exercises: backend.clone(),
            lives: backend.clone(),
            content: backend.clone(),
            topics: backend,
        })
    }
}
