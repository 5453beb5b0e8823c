//! Answer record collaborator. The core only reads counts from it at
//! finalize time.

use std::collections::HashMap;

/// Read-only view of the candidate's answers.
pub trait AnswerStore: Send + Sync {
    /// Number of answered questions.
    fn answer_count(&self) -> usize;
    /// Number of questions in the exam.
    fn total_questions(&self) -> usize;
}

/// Question id to selected option index.
#[derive(Clone, Debug, Default)]
pub struct AnswerSheet {
    total_questions: usize,
    selections: HashMap<String, usize>,
}

impl AnswerSheet {
    /// Creates an empty sheet.
    #[must_use]
    pub fn new(total_questions: usize) -> Self {
        Self {
            total_questions,
            selections: HashMap::with_capacity(total_questions),
        }
    }

    /// Records the candidate's selection, replacing any earlier one.
    pub fn select(&mut self, question_id: &str, option: usize) {
        self.selections.insert(question_id.to_owned(), option);
    }

    /// Removes a selection.
    pub fn clear(&mut self, question_id: &str) -> Option<usize> {
        self.selections.remove(question_id)
    }

    /// Selected option for a question.
    #[must_use]
    pub fn selection(&self, question_id: &str) -> Option<usize> {
        self.selections.get(question_id).copied()
    }
}

impl AnswerStore for AnswerSheet {
    fn answer_count(&self) -> usize {
        self.selections.len()
    }

    fn total_questions(&self) -> usize {
        self.total_questions
    }
}

impl<T: AnswerStore + ?Sized> AnswerStore for parking_lot::RwLock<T> {
    fn answer_count(&self) -> usize {
        self.read().answer_count()
    }

    fn total_questions(&self) -> usize {
        self.read().total_questions()
    }
}

/// `round(100 * answered / total)`, zero for an empty exam.
#[must_use]
pub fn score_percent(answered: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let answered = answered.min(total) as u64;
    let total = total as u64;
    // Integer round-half-up of 100 * answered / total.
    u32::try_from((200 * answered + total) / (2 * total)).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_rounding() {
        assert_eq!(score_percent(0, 10), 0);
        assert_eq!(score_percent(1, 3), 33);
        assert_eq!(score_percent(2, 3), 67);
        assert_eq!(score_percent(1, 8), 13);
        assert_eq!(score_percent(10, 10), 100);
        assert_eq!(score_percent(3, 0), 0);
    }

    #[test]
    fn test_selection_replaces() {
        let mut sheet = AnswerSheet::new(4);
        sheet.select("q1", 2);
        sheet.select("q1", 0);
        sheet.select("q2", 1);
        assert_eq!(sheet.answer_count(), 2);
        assert_eq!(sheet.selection("q1"), Some(0));
        assert_eq!(sheet.clear("q2"), Some(1));
        assert_eq!(sheet.answer_count(), 1);
        assert_eq!(sheet.total_questions(), 4);
    }
}
