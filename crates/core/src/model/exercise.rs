use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::ids::{ExerciseId, TopicId};

/// Minimum number of options a learner needs to make a meaningful choice.
pub const MIN_USABLE_OPTIONS: usize = 2;

//
// ─── ANSWER LETTER ─────────────────────────────────────────────────────────────
//

/// One of the four lettered choices of a multiple-choice question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnswerLetter {
    A,
    B,
    C,
    D,
}

impl AnswerLetter {
    pub const ALL: [AnswerLetter; 4] = [Self::A, Self::B, Self::C, Self::D];

    /// Parse a letter case-insensitively, ignoring surrounding whitespace.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "A" => Some(Self::A),
            "B" => Some(Self::B),
            "C" => Some(Self::C),
            "D" => Some(Self::D),
            _ => None,
        }
    }

    /// Zero-based option index for this letter.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
            Self::C => 2,
            Self::D => 3,
        }
    }

    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    #[must_use]
    pub fn as_char(self) -> char {
        match self {
            Self::A => 'A',
            Self::B => 'B',
            Self::C => 'C',
            Self::D => 'D',
        }
    }
}

impl fmt::Display for AnswerLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// How the content store identified the right option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectAnswer {
    Index(usize),
    Letter(AnswerLetter),
}

impl CorrectAnswer {
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Index(index) => index,
            Self::Letter(letter) => letter.index(),
        }
    }
}

//
// ─── EXERCISE ──────────────────────────────────────────────────────────────────
//

/// A multiple-choice exercise as presented to a learner.
///
/// Exercises are immutable once loaded into a session. An exercise with fewer
/// than [`MIN_USABLE_OPTIONS`] options is still kept; callers decide whether
/// to allow submission via [`Exercise::is_answerable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exercise {
    id: ExerciseId,
    topic_id: TopicId,
    question: String,
    options: Vec<String>,
    correct: Option<CorrectAnswer>,
    level: u32,
}

impl Exercise {
    /// Build an exercise. A level of `0` is normalized to `1`.
    #[must_use]
    pub fn new(
        id: ExerciseId,
        topic_id: TopicId,
        question: impl Into<String>,
        options: Vec<String>,
        correct: Option<CorrectAnswer>,
        level: u32,
    ) -> Self {
        Self {
            id,
            topic_id,
            question: question.into(),
            options,
            correct,
            level: level.max(1),
        }
    }

    #[must_use]
    pub fn id(&self) -> ExerciseId {
        self.id
    }

    #[must_use]
    pub fn topic_id(&self) -> TopicId {
        self.topic_id
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn option(&self, index: usize) -> Option<&str> {
        self.options.get(index).map(String::as_str)
    }

    #[must_use]
    pub fn correct(&self) -> Option<CorrectAnswer> {
        self.correct
    }

    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    /// True when the exercise has enough options to accept a submission.
    #[must_use]
    pub fn is_answerable(&self) -> bool {
        self.options.len() >= MIN_USABLE_OPTIONS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_parse_is_case_insensitive() {
        assert_eq!(AnswerLetter::parse(" c "), Some(AnswerLetter::C));
        assert_eq!(AnswerLetter::parse("E"), None);
        assert_eq!(AnswerLetter::parse(""), None);
    }

    #[test]
    fn letter_index_round_trips() {
        for letter in AnswerLetter::ALL {
            assert_eq!(AnswerLetter::from_index(letter.index()), Some(letter));
        }
        assert_eq!(AnswerLetter::from_index(4), None);
    }

    #[test]
    fn zero_level_is_normalized() {
        let exercise = Exercise::new(
            ExerciseId::new(1),
            TopicId::new(1),
            "Q",
            vec!["a".into(), "b".into()],
            Some(CorrectAnswer::Letter(AnswerLetter::B)),
            0,
        );
        assert_eq!(exercise.level(), 1);
        assert_eq!(exercise.correct().map(CorrectAnswer::index), Some(1));
    }

    #[test]
    fn single_option_exercise_is_kept_but_not_answerable() {
        let exercise = Exercise::new(
            ExerciseId::new(1),
            TopicId::new(1),
            "Q",
            vec!["only".into()],
            None,
            1,
        );
        assert!(!exercise.is_answerable());
        assert_eq!(exercise.option(0), Some("only"));
    }
}
