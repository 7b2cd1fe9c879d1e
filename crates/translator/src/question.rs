use std::fmt;

/// A question accepted for translation. Surrounding whitespace is trimmed,
/// nothing else is rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question(String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionError {
    Missing,
    TooLong { max_chars: usize },
    InvalidCharacters,
}

impl Question {
    pub fn parse(raw: Option<&str>, max_chars: usize) -> Result<Self, QuestionError> {
        let Some(raw) = raw else {
            return Err(QuestionError::Missing);
        };
        if raw.chars().count() > max_chars {
            return Err(QuestionError::TooLong { max_chars });
        }
        let text = raw.trim();
        if text.is_empty() {
            return Err(QuestionError::Missing);
        }
        if text.chars().any(is_rejected_control) {
            return Err(QuestionError::InvalidCharacters);
        }
        Ok(Self(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }
}

fn is_rejected_control(ch: char) -> bool {
    ch.is_control() && !matches!(ch, '\t' | '\n' | '\r')
}

impl fmt::Display for QuestionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionError::Missing => write!(f, "question is empty"),
            QuestionError::TooLong { max_chars } => {
                write!(f, "question is longer than {max_chars} characters")
            }
            QuestionError::InvalidCharacters => {
                write!(f, "question contains control characters")
            }
        }
    }
}

impl std::error::Error for QuestionError {}
