//! Turns pasted, pipe-delimited text or builder rows into validated
//! multiple-choice lines for bulk authoring.
//!
//! Two text dialects are accepted, one line per question:
//!
//! ```text
//! question | optA | optB | optC | optD | letter
//!            optA | optB | optC | optD | letter
//! ```
//!
//! The second form gets a synthesized question (`"<title> <n>"`), numbered
//! over accepted lines only. Invalid lines are dropped without error.

use crate::model::AnswerLetter;

const DELIMITER: char = '|';
const FALLBACK_TITLE: &str = "Pregunta";

/// A validated question ready to hand to the content store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkImportLine {
    pub question: String,
    pub options: [String; 4],
    pub correct: AnswerLetter,
}

impl BulkImportLine {
    /// Render back to the six-segment text dialect.
    #[must_use]
    pub fn to_raw_line(&self) -> String {
        let [a, b, c, d] = &self.options;
        format!(
            "{} | {a} | {b} | {c} | {d} | {}",
            self.question, self.correct
        )
    }
}

/// One structured row from the builder flow. Fields are raw user input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkRow {
    pub question: String,
    pub a: String,
    pub b: String,
    pub c: String,
    pub d: String,
    pub correct: String,
}

impl BulkRow {
    /// Validate the row with the same rules as pasted lines.
    #[must_use]
    pub fn validate(&self) -> Option<BulkImportLine> {
        validate_parts(
            &self.question,
            [&self.a, &self.b, &self.c, &self.d].map(String::as_str),
            &self.correct,
        )
    }
}

/// Shared acceptance predicate: non-empty question, four non-empty options,
/// a correct letter in `A..=D` (any case).
fn validate_parts(question: &str, options: [&str; 4], correct: &str) -> Option<BulkImportLine> {
    let question = question.trim();
    if question.is_empty() {
        return None;
    }
    let options = options.map(|opt| opt.trim().to_string());
    if options.iter().any(String::is_empty) {
        return None;
    }
    let correct = AnswerLetter::parse(correct)?;
    Some(BulkImportLine {
        question: question.to_string(),
        options,
        correct,
    })
}

/// Non-empty trimmed lines of the input.
fn candidate_lines(raw: &str) -> impl Iterator<Item = &str> {
    raw.lines().map(str::trim).filter(|line| !line.is_empty())
}

/// Number of non-empty lines a caller pasted, for rejected-line notices.
#[must_use]
pub fn count_candidate_lines(raw: &str) -> usize {
    candidate_lines(raw).count()
}

/// Parse pasted text into accepted lines, preserving input order.
#[must_use]
pub fn parse(raw: &str, title_hint: Option<&str>) -> Vec<BulkImportLine> {
    let base_title = title_hint
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .unwrap_or(FALLBACK_TITLE);
    let mut generated = 0_usize;
    let mut accepted = Vec::new();

    for (line_no, line) in candidate_lines(raw).enumerate() {
        let segments: Vec<&str> = line.split(DELIMITER).map(str::trim).collect();
        let parsed = match segments.as_slice() {
            [question, a, b, c, d, correct] => {
                validate_parts(question, [*a, *b, *c, *d], correct)
            }
            [a, b, c, d, correct] => {
                let question = format!("{base_title} {}", generated + 1);
                let line = validate_parts(&question, [*a, *b, *c, *d], correct);
                if line.is_some() {
                    generated += 1;
                }
                line
            }
            _ => None,
        };

        match parsed {
            Some(line) => accepted.push(line),
            None => tracing::debug!(line = line_no + 1, "bulk import line rejected"),
        }
    }

    accepted
}

/// Validate builder rows, keeping the valid ones in order.
#[must_use]
pub fn collect_rows(rows: &[BulkRow]) -> Vec<BulkImportLine> {
    rows.iter().filter_map(BulkRow::validate).collect()
}

/// One-indexed review lines: `"1. <question> | Correcta: <letter>"`.
#[must_use]
pub fn preview(lines: &[BulkImportLine]) -> Vec<String> {
    lines
        .iter()
        .enumerate()
        .map(|(idx, line)| format!("{}. {} | Correcta: {}", idx + 1, line.question, line.correct))
        .collect()
}
