use crate::model::ids::{SubjectId, TopicId};

/// Progress at or above which a topic counts as complete.
pub const COMPLETE_PERCENTAGE: f64 = 100.0;

/// A topic as seen by the level-unlock logic.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicNode {
    id: TopicId,
    subject_id: SubjectId,
    level: u32,
    order: u32,
    progress_percentage: f64,
}

impl TopicNode {
    /// Build a node. Level `0` becomes `1`; progress is clamped to `0..=100`
    /// and a non-finite value counts as `0`.
    #[must_use]
    pub fn new(
        id: TopicId,
        subject_id: SubjectId,
        level: u32,
        order: u32,
        progress_percentage: f64,
    ) -> Self {
        let progress_percentage = if progress_percentage.is_finite() {
            progress_percentage.clamp(0.0, COMPLETE_PERCENTAGE)
        } else {
            0.0
        };
        Self {
            id,
            subject_id,
            level: level.max(1),
            order,
            progress_percentage,
        }
    }

    #[must_use]
    pub fn id(&self) -> TopicId {
        self.id
    }

    #[must_use]
    pub fn subject_id(&self) -> SubjectId {
        self.subject_id
    }

    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    #[must_use]
    pub fn order(&self) -> u32 {
        self.order
    }

    #[must_use]
    pub fn progress_percentage(&self) -> f64 {
        self.progress_percentage
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.progress_percentage >= COMPLETE_PERCENTAGE
    }
}
