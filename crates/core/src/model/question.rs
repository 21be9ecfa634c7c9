use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question bank cannot be empty")]
    EmptyBank,

    #[error("question {id} has empty text")]
    EmptyText { id: String },

    #[error("question {id} needs at least two options, got {count}")]
    TooFewOptions { id: String, count: usize },

    #[error("question {id} has an option {option_id} with empty text")]
    EmptyOptionText { id: String, option_id: String },

    #[error("question {id} has duplicate option id {option_id}")]
    DuplicateOption { id: String, option_id: String },

    #[error("question {id} marks unknown option {option_id} as correct")]
    UnknownCorrectOption { id: String, option_id: String },
}

/// One selectable answer for a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: String,
    pub text: String,
}

impl QuestionOption {
    #[must_use]
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// A multiple-choice question with exactly one correct option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    id: String,
    text: String,
    options: Vec<QuestionOption>,
    correct_option_id: String,
}

impl Question {
    /// Build a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the question or any option text is blank,
    /// fewer than two options are given, option ids repeat, or the correct
    /// option is not among them. Blank option text is reserved for timeouts.
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        options: Vec<QuestionOption>,
        correct_option_id: impl Into<String>,
    ) -> Result<Self, QuestionError> {
        let id = id.into();
        let text = text.into();
        let correct_option_id = correct_option_id.into();

        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText { id });
        }
        if options.len() < 2 {
            return Err(QuestionError::TooFewOptions {
                id,
                count: options.len(),
            });
        }
        for (i, option) in options.iter().enumerate() {
            if option.text.trim().is_empty() {
                return Err(QuestionError::EmptyOptionText {
                    id,
                    option_id: option.id.clone(),
                });
            }
            if options[..i].iter().any(|o| o.id == option.id) {
                return Err(QuestionError::DuplicateOption {
                    id,
                    option_id: option.id.clone(),
                });
            }
        }
        if !options.iter().any(|o| o.id == correct_option_id) {
            return Err(QuestionError::UnknownCorrectOption {
                id,
                option_id: correct_option_id,
            });
        }

        Ok(Self {
            id,
            text,
            options,
            correct_option_id,
        })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[QuestionOption] {
        &self.options
    }

    #[must_use]
    pub fn correct_option_id(&self) -> &str {
        &self.correct_option_id
    }

    #[must_use]
    pub fn option(&self, option_id: &str) -> Option<&QuestionOption> {
        self.options.iter().find(|o| o.id == option_id)
    }

    /// Text of the correct option. Always present for a validated question.
    #[must_use]
    pub fn correct_text(&self) -> &str {
        self.option(&self.correct_option_id)
            .map_or("", |o| o.text.as_str())
    }
}

/// Fixed, ordered question sequence an attempt walks through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyBank` when no questions are given.
    pub fn new(questions: Vec<Question>) -> Result<Self, QuestionError> {
        if questions.is_empty() {
            return Err(QuestionError::EmptyBank);
        }
        Ok(Self { questions })
    }

    /// Small general-knowledge bank used when no other content is configured.
    #[must_use]
    pub fn sample() -> Self {
        fn q(id: &str, text: &str, options: [&str; 4], correct: usize) -> Question {
            let opts = options
                .iter()
                .enumerate()
                .map(|(i, t)| QuestionOption::new((i + 1).to_string(), *t))
                .collect();
            Question {
                id: id.to_owned(),
                text: text.to_owned(),
                options: opts,
                correct_option_id: correct.to_string(),
            }
        }

        Self {
            questions: vec![
                q(
                    "1",
                    "What is the capital of France?",
                    ["London", "Paris", "Berlin", "Madrid"],
                    2,
                ),
                q(
                    "2",
                    "Which planet is known as the Red Planet?",
                    ["Venus", "Mars", "Jupiter", "Saturn"],
                    2,
                ),
                q(
                    "3",
                    "What is the largest mammal?",
                    ["African Elephant", "Blue Whale", "Giraffe", "Hippopotamus"],
                    2,
                ),
            ],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Always false for a constructed bank.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }
}
