//! Answer validation for a single step.
//!
//! The rule kind comes from `validation.type`; a step whose own type is
//! `select` is always checked against its options. Free-text answers are
//! trimmed, while select answers must equal an option value exactly. Phone
//! numbers accept digits, spaces, `+`, `-`, `.` and parentheses, with 7 to
//! 15 digits.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use super::model::{Step, StepType};

const MIN_PHONE_DIGITS: usize = 7;
const MAX_PHONE_DIGITS: usize = 15;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

static PHONE_CHARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9\s().\-]+$").unwrap());

/// Why an answer was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnswerError {
    #[error("This field is required")]
    Empty,

    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("Please enter a valid phone number")]
    InvalidPhone,

    #[error("Please enter a valid number")]
    InvalidNumber,

    #[error("Please choose one of the listed options")]
    NotAnOption,

    #[error("The answer does not have the expected format")]
    PatternMismatch,
}

impl Step {
    /// Validate a raw answer. On success returns the value to store.
    pub fn validate_answer(&self, raw: &str) -> Result<String, AnswerError> {
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return if self.validation.required {
                Err(AnswerError::Empty)
            } else {
                Ok(String::new())
            };
        }

        let is_select =
            self.step_type == StepType::Select || self.validation.kind == StepType::Select;
        let answer = if is_select { raw } else { trimmed };

        match self.validation.kind {
            StepType::Text => {}
            StepType::Email => {
                if !EMAIL_RE.is_match(answer) {
                    return Err(AnswerError::InvalidEmail);
                }
            }
            StepType::Phone => {
                if !is_plausible_phone(answer) {
                    return Err(AnswerError::InvalidPhone);
                }
            }
            StepType::Number => {
                if !answer.parse::<f64>().is_ok_and(f64::is_finite) {
                    return Err(AnswerError::InvalidNumber);
                }
            }
            StepType::Select => {}
        }

        if is_select && self.option_by_value(answer).is_none() {
            return Err(AnswerError::NotAnOption);
        }

        if let Some(pattern) = &self.validation.pattern {
            match pattern.regex() {
                Ok(re) if !re.is_match(answer) => return Err(AnswerError::PatternMismatch),
                Ok(_) => {}
                Err(e) => {
                    warn!(step_id = %self.step_id, error = %e, "Ignoring invalid validation pattern");
                }
            }
        }

        Ok(answer.to_string())
    }

    /// Message to show for a rejected answer: the step's override, else a generic one.
    pub fn rejection_message(&self, error: &AnswerError) -> String {
        self.error_message
            .clone()
            .unwrap_or_else(|| error.to_string())
    }
}

fn is_plausible_phone(answer: &str) -> bool {
    if !PHONE_CHARS_RE.is_match(answer) {
        return false;
    }
    let digits = answer.chars().filter(char::is_ascii_digit).count();
    (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits)
}
