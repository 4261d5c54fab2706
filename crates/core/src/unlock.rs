//! Level-ordered unlock graph for a subject's topics.
//!
//! Levels need not be contiguous: a level's predecessor is the previous entry
//! in the sorted list of levels that actually have topics.

use std::collections::BTreeMap;

use crate::model::{TopicId, TopicNode};

/// Topics of one level, sorted by their explicit order.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelGroup {
    pub level: u32,
    pub topics: Vec<TopicNode>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnlockGraph {
    groups: Vec<LevelGroup>,
}

impl UnlockGraph {
    /// Group topics by level, ascending, each group ordered by `order` then id.
    #[must_use]
    pub fn build(topics: impl IntoIterator<Item = TopicNode>) -> Self {
        let mut by_level: BTreeMap<u32, Vec<TopicNode>> = BTreeMap::new();
        for topic in topics {
            by_level.entry(topic.level()).or_default().push(topic);
        }

        let groups = by_level
            .into_iter()
            .map(|(level, mut topics)| {
                topics.sort_by_key(|t| (t.order(), t.id()));
                LevelGroup { level, topics }
            })
            .collect();

        Self { groups }
    }

    /// Distinct levels present, ascending.
    #[must_use]
    pub fn levels(&self) -> Vec<u32> {
        self.groups.iter().map(|g| g.level).collect()
    }

    #[must_use]
    pub fn groups(&self) -> &[LevelGroup] {
        &self.groups
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    #[must_use]
    pub fn lowest_level(&self) -> Option<u32> {
        self.groups.first().map(|g| g.level)
    }

    fn position(&self, level: u32) -> Option<usize> {
        self.groups.iter().position(|g| g.level == level)
    }

    fn group(&self, level: u32) -> Option<&LevelGroup> {
        self.groups.iter().find(|g| g.level == level)
    }

    /// Every topic at `level` is complete. Vacuously true for an unknown level.
    #[must_use]
    pub fn is_level_complete(&self, level: u32) -> bool {
        self.group(level)
            .is_none_or(|g| g.topics.iter().all(TopicNode::is_complete))
    }

    /// The lowest level is always open; any other level opens once its
    /// positional predecessor is complete. Unknown levels are not gated.
    #[must_use]
    pub fn is_level_unlocked(&self, level: u32) -> bool {
        match self.position(level) {
            None | Some(0) => true,
            Some(idx) => self.is_level_complete(self.groups[idx - 1].level),
        }
    }

    /// Level the learner has to finish before `level` opens.
    ///
    /// Falls back to the lowest level when `level` is first or unknown;
    /// `None` only for an empty graph.
    #[must_use]
    pub fn required_level_for(&self, level: u32) -> Option<u32> {
        match self.position(level) {
            Some(idx) if idx > 0 => Some(self.groups[idx - 1].level),
            _ => self.lowest_level(),
        }
    }

    /// Level a topic belongs to, if the topic is part of this graph.
    #[must_use]
    pub fn level_of(&self, topic_id: TopicId) -> Option<u32> {
        self.groups
            .iter()
            .find(|g| g.topics.iter().any(|t| t.id() == topic_id))
            .map(|g| g.level)
    }

    /// Rounded mean progress of a level's topics; `0` for an unknown level.
    #[must_use]
    pub fn level_progress(&self, level: u32) -> u32 {
        let Some(group) = self.group(level).filter(|g| !g.topics.is_empty()) else {
            return 0;
        };
        let total: f64 = group.topics.iter().map(TopicNode::progress_percentage).sum();
        #[allow(clippy::cast_precision_loss)]
        let mean = total / group.topics.len() as f64;
        // Progress is clamped to 0..=100, so the rounded mean fits in u32.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let rounded = mean.round() as u32;
        rounded
    }

    /// Number of topics whose progress reached completion.
    #[must_use]
    pub fn completed_topics(&self) -> usize {
        self.groups
            .iter()
            .flat_map(|g| g.topics.iter())
            .filter(|t| t.is_complete())
            .count()
    }

    #[must_use]
    pub fn total_topics(&self) -> usize {
        self.groups.iter().map(|g| g.topics.len()).sum()
    }
}

/// Display label for a curriculum tier.
#[must_use]
pub fn level_label(level: u32) -> &'static str {
    match level {
        1 => "Básico",
        2 => "Intermedio",
        3 => "Avanzado",
        _ => "Nivel",
    }
}

/// Message shown when a learner tries to open locked content.
#[must_use]
pub fn locked_message(required_level: u32) -> String {
    format!("Completa el Nivel {required_level} para desbloquear este contenido.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SubjectId;

    fn topic(id: u64, level: u32, order: u32, progress: f64) -> TopicNode {
        TopicNode::new(TopicId::new(id), SubjectId::new(1), level, order, progress)
    }

    #[test]
    fn lowest_level_open_second_locked_until_first_complete() {
        let graph = UnlockGraph::build(vec![
            topic(1, 1, 0, 0.0),
            topic(2, 1, 1, 0.0),
            topic(3, 2, 0, 0.0),
        ]);
        assert!(graph.is_level_unlocked(1));
        assert!(!graph.is_level_unlocked(2));

        let graph = UnlockGraph::build(vec![
            topic(1, 1, 0, 100.0),
            topic(2, 1, 1, 99.0),
            topic(3, 2, 0, 0.0),
        ]);
        assert!(!graph.is_level_unlocked(2));

        let graph = UnlockGraph::build(vec![
            topic(1, 1, 0, 100.0),
            topic(2, 1, 1, 100.0),
            topic(3, 2, 0, 0.0),
        ]);
        assert!(graph.is_level_unlocked(2));
    }

    #[test]
    fn predecessor_is_positional_not_arithmetic() {
        let graph = UnlockGraph::build(vec![
            topic(1, 1, 0, 100.0),
            topic(2, 5, 0, 0.0),
            topic(3, 9, 0, 0.0),
        ]);
        assert_eq!(graph.levels(), vec![1, 5, 9]);
        assert!(graph.is_level_unlocked(5));
        assert!(!graph.is_level_unlocked(9));
        assert_eq!(graph.required_level_for(9), Some(5));
        assert_eq!(graph.required_level_for(5), Some(1));
    }

    #[test]
    fn required_level_defaults_to_lowest() {
        let graph = UnlockGraph::build(vec![topic(1, 3, 0, 0.0), topic(2, 4, 0, 0.0)]);
        assert_eq!(graph.required_level_for(3), Some(3));
        assert_eq!(graph.required_level_for(42), Some(3));
        assert_eq!(UnlockGraph::default().required_level_for(1), None);
    }

    #[test]
    fn unknown_level_is_complete_and_unlocked() {
        let graph = UnlockGraph::build(vec![topic(1, 1, 0, 0.0)]);
        assert!(graph.is_level_complete(7));
        assert!(graph.is_level_unlocked(7));
        assert!(UnlockGraph::default().is_level_unlocked(1));
    }

    #[test]
    fn groups_sorted_by_order_then_id() {
        let graph = UnlockGraph::build(vec![
            topic(3, 2, 1, 0.0),
            topic(1, 2, 1, 0.0),
            topic(2, 2, 0, 0.0),
        ]);
        let ids: Vec<u64> = graph.groups()[0]
            .topics
            .iter()
            .map(|t| t.id().value())
            .collect();
        assert_eq!(ids, vec![2, 1, 3]);
        assert_eq!(graph.level_of(TopicId::new(3)), Some(2));
        assert_eq!(graph.level_of(TopicId::new(99)), None);
    }

    #[test]
    fn level_progress_is_rounded_mean() {
        let graph = UnlockGraph::build(vec![
            topic(1, 1, 0, 100.0),
            topic(2, 1, 1, 50.0),
            topic(3, 1, 2, 0.5),
        ]);
        assert_eq!(graph.level_progress(1), 50);
        assert_eq!(graph.level_progress(2), 0);
        assert_eq!(graph.completed_topics(), 1);
        assert_eq!(graph.total_topics(), 3);
    }

    #[test]
    fn labels_and_messages() {
        assert_eq!(level_label(2), "Intermedio");
        assert_eq!(level_label(8), "Nivel");
        assert_eq!(
            locked_message(1),
            "Completa el Nivel 1 para desbloquear este contenido."
        );
    }
}
