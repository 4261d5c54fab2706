//! Wire shapes exchanged with the learning backend.
//!
//! Records mirror what the backend sends so stores can deserialize without
//! leaking transport quirks into the domain; `into_*` methods normalize.

use serde::{Deserialize, Serialize};

use practice_core::bulk_import::BulkImportLine;
use practice_core::model::{
    AnswerLetter, CorrectAnswer, Exercise, ExerciseId, SubjectId, TopicId, TopicNode,
};

/// Either form the backend uses for the right answer: `2` or `"C"` / `"2"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCorrect {
    Index(u64),
    Text(String),
}

impl RawCorrect {
    fn normalize(&self) -> Option<CorrectAnswer> {
        match self {
            Self::Index(index) => usize::try_from(*index).ok().map(CorrectAnswer::Index),
            Self::Text(text) => text
                .trim()
                .parse::<usize>()
                .ok()
                .map(CorrectAnswer::Index)
                .or_else(|| AnswerLetter::parse(text).map(CorrectAnswer::Letter)),
        }
    }
}

/// Exercise as served by `GET /topics/{id}/exercises`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseRecord {
    pub id: ExerciseId,
    pub topic_id: TopicId,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub correct_answer: Option<RawCorrect>,
    #[serde(default, rename = "optionA")]
    pub option_a: Option<String>,
    #[serde(default, rename = "optionB")]
    pub option_b: Option<String>,
    #[serde(default, rename = "optionC")]
    pub option_c: Option<String>,
    #[serde(default, rename = "optionD")]
    pub option_d: Option<String>,
    #[serde(default)]
    pub correct_option: Option<String>,
    #[serde(default)]
    pub level: Option<u32>,
}

impl ExerciseRecord {
    /// Convert into a domain `Exercise`.
    ///
    /// When no `options` array is present, options are taken from the
    /// letter-keyed fields, skipping empty ones. Too few options is not an
    /// error; the exercise is still presented.
    #[must_use]
    pub fn into_exercise(self) -> Exercise {
        let correct = self
            .correct_answer
            .as_ref()
            .and_then(RawCorrect::normalize)
            .or_else(|| {
                self.correct_option
                    .as_deref()
                    .and_then(AnswerLetter::parse)
                    .map(CorrectAnswer::Letter)
            });

        let options = match self.options {
            Some(options) => options,
            None => [self.option_a, self.option_b, self.option_c, self.option_d]
                .into_iter()
                .flatten()
                .filter(|opt| !opt.trim().is_empty())
                .collect(),
        };

        if options.len() < practice_core::model::MIN_USABLE_OPTIONS {
            tracing::warn!(exercise_id = %self.id, options = options.len(), "exercise has too few options");
        }

        Exercise::new(
            self.id,
            self.topic_id,
            self.question,
            options,
            correct,
            self.level.unwrap_or(1),
        )
    }
}

/// Response of `POST /exercises/{id}/submit`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOutcome {
    pub is_correct: bool,
    #[serde(default)]
    pub message: Option<String>,
    /// Authoritative lives left; absent means "unchanged".
    #[serde(default)]
    pub lives: Option<u32>,
    #[serde(default)]
    pub life_gained: bool,
    #[serde(default)]
    pub next_life_at: Option<String>,
}

/// Response of `GET /lives` and `POST /lives/reset`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivesSnapshot {
    pub lives: u32,
    #[serde(default)]
    pub lives_max: Option<u32>,
    #[serde(default)]
    pub next_life_at: Option<String>,
}

/// Kind of content a learner finished inside a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressKind {
    Theory,
    Video,
    Practice,
}

/// Body item of `POST /topics/{id}/exercises/bulk`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkExercisePayload {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub level: u32,
}

impl BulkExercisePayload {
    #[must_use]
    pub fn from_line(line: &BulkImportLine, level: u32) -> Self {
        Self {
            question: line.question.clone(),
            options: line.options.to_vec(),
            correct_answer: line.correct.index(),
            level,
        }
    }
}

/// Acknowledgement of a bulk create; some backends omit the count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkCreateReceipt {
    #[serde(default)]
    pub count: Option<usize>,
}

/// Topic as served by `GET /subjects/{id}/topics`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicRecord {
    pub id: TopicId,
    pub subject_id: SubjectId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub level: Option<u32>,
    #[serde(default)]
    pub order: Option<u32>,
    #[serde(default)]
    pub progress_percentage: Option<f64>,
}

impl TopicRecord {
    #[must_use]
    pub fn into_node(self) -> TopicNode {
        TopicNode::new(
            self.id,
            self.subject_id,
            self.level.unwrap_or(1),
            self.order.unwrap_or(0),
            self.progress_percentage.unwrap_or(0.0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn letter_fields_become_options() {
        let record: ExerciseRecord = serde_json::from_value(json!({
            "id": 5,
            "topic_id": 2,
            "question": "2 + 2?",
            "optionA": "3",
            "optionB": "4",
            "optionC": "",
            "optionD": "5",
            "correct_option": "b"
        }))
        .unwrap();

        let exercise = record.into_exercise();
        assert_eq!(exercise.options(), ["3", "4", "5"]);
        assert_eq!(exercise.correct(), Some(CorrectAnswer::Letter(AnswerLetter::B)));
        assert_eq!(exercise.level(), 1);
    }

    #[test]
    fn options_array_wins_over_letter_fields() {
        let record: ExerciseRecord = serde_json::from_value(json!({
            "id": 1,
            "topic_id": 1,
            "question": "Q",
            "options": ["x", "y"],
            "optionA": "ignored",
            "correct_answer": 1,
            "level": 3
        }))
        .unwrap();

        let exercise = record.into_exercise();
        assert_eq!(exercise.options(), ["x", "y"]);
        assert_eq!(exercise.correct(), Some(CorrectAnswer::Index(1)));
        assert_eq!(exercise.level(), 3);
    }

    #[test]
    fn textual_correct_answer_accepts_digits_or_letters() {
        assert_eq!(
            RawCorrect::Text("2".into()).normalize(),
            Some(CorrectAnswer::Index(2))
        );
        assert_eq!(
            RawCorrect::Text("d".into()).normalize(),
            Some(CorrectAnswer::Letter(AnswerLetter::D))
        );
        assert_eq!(RawCorrect::Text("?".into()).normalize(), None);
    }

    #[test]
    fn exercise_without_options_is_still_presented() {
        let record = ExerciseRecord {
            id: ExerciseId::new(1),
            topic_id: TopicId::new(1),
            question: "Q".into(),
            ..ExerciseRecord::default()
        };
        let exercise = record.into_exercise();
        assert!(exercise.options().is_empty());
        assert!(!exercise.is_answerable());
    }

    #[test]
    fn outcome_defaults_missing_fields() {
        let outcome: AnswerOutcome =
            serde_json::from_value(json!({ "is_correct": true })).unwrap();
        assert_eq!(outcome.lives, None);
        assert!(!outcome.life_gained);
    }

    #[test]
    fn progress_kind_is_lowercase_on_the_wire() {
        assert_eq!(
            serde_json::to_value(ProgressKind::Practice).unwrap(),
            json!("practice")
        );
    }

    #[test]
    fn topic_record_defaults_level_and_progress() {
        let record: TopicRecord =
            serde_json::from_value(json!({ "id": 4, "subject_id": 1, "title": "Sumas" })).unwrap();
        let node = record.into_node();
        assert_eq!(node.level(), 1);
        assert!(!node.is_complete());
    }

    #[test]
    fn bulk_payload_uses_option_index() {
        let line = practice_core::bulk_import::parse("Q | a | b | c | d | c", None).remove(0);
        let payload = BulkExercisePayload::from_line(&line, 2);
        assert_eq!(payload.correct_answer, 2);
        assert_eq!(payload.options.len(), 4);
        assert_eq!(payload.level, 2);
    }
}
