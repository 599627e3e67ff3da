use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{AppError, Result};

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 10.0;

/// A dated, scored assessment embedded in its subject's `evaluations` column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub id: String,
    pub date: String,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub score: f64,
    #[serde(default)]
    pub completed: bool,
}

// A cleared score input is stored as `null`; it counts as zero.
fn null_as_zero<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_default())
}

impl Evaluation {
    pub fn apply(&mut self, patch: &EvaluationPatch) {
        if let Some(date) = &patch.date {
            self.date = date.clone();
        }
        if let Some(score) = patch.score {
            self.score = score;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
    }
}

/// Field-wise update merged into an existing evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationPatch {
    pub date: Option<String>,
    pub score: Option<f64>,
    pub completed: Option<bool>,
}

/// Validated input for a new evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvaluation {
    pub date: NaiveDate,
    pub score: f64,
}

impl NewEvaluation {
    pub fn parse(date: &str, score: &str) -> Result<Self> {
        Ok(Self {
            date: parse_date(date)?,
            score: parse_score(score)?,
        })
    }

    pub fn into_evaluation(self) -> Evaluation {
        Evaluation {
            id: uuid::Uuid::new_v4().to_string(),
            date: self.date.format("%Y-%m-%d").to_string(),
            score: self.score,
            completed: false,
        }
    }
}

pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation("Data inválida (use AAAA-MM-DD)".to_string()))
}

/// Parse a score typed by the user, accepting a decimal comma.
pub fn parse_score(input: &str) -> Result<f64> {
    let score: f64 = input
        .trim()
        .replace(',', ".")
        .parse()
        .map_err(|_| AppError::Validation("Nota inválida".to_string()))?;
    if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        return Err(AppError::Validation("A nota deve estar entre 0 e 10".to_string()));
    }
    Ok((score * 10.0).round() / 10.0)
}

/// Arithmetic mean of the scores, or `None` when there is nothing to average.
pub fn average_score(evaluations: &[Evaluation]) -> Option<f64> {
    if evaluations.is_empty() {
        return None;
    }
    let total: f64 = evaluations.iter().map(|e| e.score).sum();
    Some(total / evaluations.len() as f64)
}

pub fn format_score(score: f64) -> String {
    format!("{score:.1}")
}
