use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::{average_score, Evaluation, Topic};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub evaluations: Vec<Evaluation>,
    pub created_at: DateTime<Utc>,
}

impl Subject {
    pub fn average_score(&self) -> Option<f64> {
        average_score(&self.evaluations)
    }
}

/// Insert payload for the `subjects` table.
#[derive(Debug, Clone, Serialize)]
pub struct NewSubject {
    pub title: String,
    pub user_id: String,
}

/// Whole-collection write of a subject's embedded evaluations.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationsUpdate<'a> {
    pub evaluations: &'a [Evaluation],
}

/// A subject as returned by `select=*,topics(*)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectWithTopics {
    #[serde(flatten)]
    pub subject: Subject,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub topics: Vec<Topic>,
}

impl SubjectWithTopics {
    pub fn completed_topics(&self) -> usize {
        self.topics.iter().filter(|t| t.completed).count()
    }
}

// The evaluations column is nullable and older rows carry `null`.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
