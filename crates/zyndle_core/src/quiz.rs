//! crates/zyndle_core/src/quiz.rs
//!
//! Local quiz state: the fetched question set plus the user's answers.
//! Questions are fixed for the lifetime of the state; only answers, the
//! submitted flag and the score change.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::QuizQuestion;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuizError {
    #[error("Quiz questions have not been loaded")]
    NotLoaded,
    #[error("The quiz has no questions")]
    Empty,
    #[error("Answer every question before submitting ({answered} of {total} answered)")]
    Incomplete { answered: usize, total: usize },
    #[error("The quiz has already been submitted")]
    AlreadySubmitted,
    #[error("Question {index} does not exist (quiz has {total})")]
    QuestionOutOfRange { index: usize, total: usize },
    #[error("Question {question} has no option {option}")]
    OptionOutOfRange { question: usize, option: usize },
}

/// Result of grading a submitted quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizReport {
    pub correct: usize,
    pub total: usize,
    /// Percentage, rounded to the nearest integer.
    pub score: u32,
}

#[derive(Debug, Clone)]
pub struct QuizState {
    questions: Arc<[QuizQuestion]>,
    answers: BTreeMap<usize, usize>,
    report: Option<QuizReport>,
}

impl QuizState {
    pub fn new(questions: Vec<QuizQuestion>) -> Self {
        Self {
            questions: questions.into(),
            answers: BTreeMap::new(),
            report: None,
        }
    }

    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    /// Selected option per question index.
    pub fn answers(&self) -> &BTreeMap<usize, usize> {
        &self.answers
    }

    pub fn is_submitted(&self) -> bool {
        self.report.is_some()
    }

    pub fn report(&self) -> Option<QuizReport> {
        self.report
    }

    pub fn is_complete(&self) -> bool {
        (0..self.questions.len()).all(|i| self.answers.contains_key(&i))
    }

    pub fn select(&mut self, question: usize, option: usize) -> Result<(), QuizError> {
        if self.is_submitted() {
            return Err(QuizError::AlreadySubmitted);
        }
        let q = self
            .questions
            .get(question)
            .ok_or(QuizError::QuestionOutOfRange {
                index: question,
                total: self.questions.len(),
            })?;
        if option >= q.options.len() {
            return Err(QuizError::OptionOutOfRange { question, option });
        }
        self.answers.insert(question, option);
        Ok(())
    }

    /// Grades the quiz. Rejected unless every question has an answer.
    pub fn submit(&mut self) -> Result<QuizReport, QuizError> {
        if self.is_submitted() {
            return Err(QuizError::AlreadySubmitted);
        }
        if self.questions.is_empty() {
            return Err(QuizError::Empty);
        }
        if !self.is_complete() {
            return Err(QuizError::Incomplete {
                answered: self.answers.len(),
                total: self.questions.len(),
            });
        }
        let report = grade(&self.questions, &self.answers);
        self.report = Some(report);
        Ok(report)
    }

    /// Clears answers and the result. The question set is reused.
    pub fn retake(&mut self) {
        self.answers.clear();
        self.report = None;
    }
}

/// Counts positions where the selected option is the correct one.
/// Unanswered questions count as incorrect.
pub fn grade(questions: &[QuizQuestion], answers: &BTreeMap<usize, usize>) -> QuizReport {
    let total = questions.len();
    let correct = questions
        .iter()
        .enumerate()
        .filter(|(i, q)| answers.get(i) == Some(&q.correct_option))
        .count();
    let score = if total == 0 {
        0
    } else {
        (100.0 * correct as f64 / total as f64).round() as u32
    };
    QuizReport {
        correct,
        total,
        score,
    }
}
