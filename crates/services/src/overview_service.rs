use std::sync::Arc;

use practice_core::UnlockGraph;
use practice_core::model::{SubjectId, TopicId, TopicNode};
use practice_core::unlock::level_label;
use storage::repository::TopicStore;

use crate::error::OverviewError;

/// One level of a subject, ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelSummary {
    pub level: u32,
    pub label: &'static str,
    pub unlocked: bool,
    /// Rounded mean progress of the level's topics.
    pub progress: u32,
    pub topics: Vec<TopicNode>,
}

/// Unlock state of a subject's topics.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectOverview {
    subject_id: SubjectId,
    graph: UnlockGraph,
}

impl SubjectOverview {
    #[must_use]
    pub fn new(subject_id: SubjectId, topics: Vec<TopicNode>) -> Self {
        Self {
            subject_id,
            graph: UnlockGraph::build(topics),
        }
    }

    #[must_use]
    pub fn subject_id(&self) -> SubjectId {
        self.subject_id
    }

    #[must_use]
    pub fn graph(&self) -> &UnlockGraph {
        &self.graph
    }

    #[must_use]
    pub fn levels(&self) -> Vec<LevelSummary> {
        self.graph
            .groups()
            .iter()
            .map(|group| LevelSummary {
                level: group.level,
                label: level_label(group.level),
                unlocked: self.graph.is_level_unlocked(group.level),
                progress: self.graph.level_progress(group.level),
                topics: group.topics.clone(),
            })
            .collect()
    }

    /// Overall completion as `(completed, total)` topics.
    #[must_use]
    pub fn completion(&self) -> (usize, usize) {
        (self.graph.completed_topics(), self.graph.total_topics())
    }

    /// Check that a topic's level is open before starting practice on it.
    ///
    /// Returns the topic's level, or `None` for a topic this overview does
    /// not know (e.g. the topic list could not be fetched); such topics are
    /// not gated.
    ///
    /// # Errors
    ///
    /// Returns `OverviewError::Locked` with the level to finish first.
    pub fn ensure_unlocked(&self, topic_id: TopicId) -> Result<Option<u32>, OverviewError> {
        let Some(level) = self.graph.level_of(topic_id) else {
            tracing::debug!(%topic_id, "topic not in overview, not gated");
            return Ok(None);
        };
        self.ensure_level_unlocked(level)?;
        Ok(Some(level))
    }

    /// # Errors
    ///
    /// Returns `OverviewError::Locked` if the previous level is unfinished.
    pub fn ensure_level_unlocked(&self, level: u32) -> Result<(), OverviewError> {
        if self.graph.is_level_unlocked(level) {
            return Ok(());
        }
        let required_level = self.graph.required_level_for(level).unwrap_or(level);
        tracing::debug!(level, required_level, "level is locked");
        Err(OverviewError::Locked {
            level,
            required_level,
        })
    }
}

/// Loads subject overviews from the topic store.
#[derive(Clone)]
pub struct SubjectOverviewService {
    topics: Arc<dyn TopicStore>,
}

impl SubjectOverviewService {
    #[must_use]
    pub fn new(topics: Arc<dyn TopicStore>) -> Self {
        Self { topics }
    }

    /// Build the overview for a subject.
    ///
    /// A failed topic fetch yields an empty overview, where every level is
    /// considered unlocked.
    pub async fn load(&self, subject_id: SubjectId) -> SubjectOverview {
        let topics = match self.topics.topics_by_subject(subject_id).await {
            Ok(topics) => topics,
            Err(err) => {
                tracing::warn!(%subject_id, error = %err, "could not load subject topics");
                Vec::new()
            }
        };
        SubjectOverview::new(subject_id, topics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic(id: u64, level: u32, progress: f64) -> TopicNode {
        TopicNode::new(TopicId::new(id), SubjectId::new(1), level, 0, progress)
    }

    #[test]
    fn locked_topic_names_required_level() {
        let overview = SubjectOverview::new(
            SubjectId::new(1),
            vec![topic(1, 1, 100.0), topic(2, 1, 40.0), topic(3, 2, 0.0)],
        );

        assert_eq!(overview.ensure_unlocked(TopicId::new(2)), Ok(Some(1)));
        let err = overview.ensure_unlocked(TopicId::new(3)).unwrap_err();
        assert_eq!(
            err,
            OverviewError::Locked {
                level: 2,
                required_level: 1
            }
        );
        assert_eq!(
            err.to_string(),
            practice_core::unlock::locked_message(1)
        );
        assert_eq!(overview.ensure_unlocked(TopicId::new(9)), Ok(None));
    }

    #[test]
    fn level_summaries_carry_labels_and_progress() {
        let overview = SubjectOverview::new(
            SubjectId::new(1),
            vec![topic(1, 1, 100.0), topic(2, 1, 50.0), topic(3, 3, 0.0)],
        );
        let levels = overview.levels();

        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].label, "Básico");
        assert_eq!(levels[0].progress, 75);
        assert!(levels[0].unlocked);
        assert_eq!(levels[1].label, "Avanzado");
        assert!(!levels[1].unlocked);
        assert_eq!(overview.completion(), (1, 3));
    }

    #[test]
    fn empty_subject_is_open() {
        let overview = SubjectOverview::new(SubjectId::new(1), Vec::new());
        assert!(overview.levels().is_empty());
        assert_eq!(overview.ensure_level_unlocked(2), Ok(()));
        assert_eq!(overview.ensure_unlocked(TopicId::new(7)), Ok(None));
    }
}
