use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub subject_id: String,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for the `topics` table.
#[derive(Debug, Clone, Serialize)]
pub struct NewTopic {
    pub subject_id: String,
    pub title: String,
}

/// Partial update body for a topic's completed flag.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TopicCompletion {
    pub completed: bool,
}
