use crate::error::AppError;
use crate::models::{NewTopic, Subject, Topic, TopicCompletion};
use crate::services::{Query, RestClient};

const SUBJECTS: &str = "subjects";
const TOPICS: &str = "topics";
const TOPICS_LIMIT: &str = "topics_limit";
const TOPICS_LIMIT_MESSAGE: &str = "Você pode criar até 20 assuntos por disciplina";

/// Checklist of topics under one subject, oldest first.
pub struct TopicsView {
    pub subject_id: String,
    pub subject: Option<Subject>,
    pub topics: Vec<Topic>,
    pub loading: bool,
    pub submitting: bool,
    pub error: Option<String>,
}

impl TopicsView {
    pub fn new(subject_id: &str) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            subject: None,
            topics: Vec::new(),
            loading: true,
            submitting: false,
            error: None,
        }
    }

    pub fn completed_count(&self) -> usize {
        self.topics.iter().filter(|t| t.completed).count()
    }

    pub async fn fetch_topics_for_subject(&mut self, rest: &RestClient, subject_id: &str) {
        self.subject_id = subject_id.to_string();

        let subject_query = Query::table(SUBJECTS).eq("id", subject_id);
        let topics_query = Query::table(TOPICS)
            .eq("subject_id", subject_id)
            .order("created_at", true);

        let result = async {
            let subject = rest.select_single::<Subject>(&subject_query).await?;
            self.subject = Some(subject);
            self.topics = rest.select::<Topic>(&topics_query).await?;
            Ok::<_, AppError>(())
        }
        .await;

        if let Err(e) = result {
            tracing::error!("Error fetching subject {}: {}", subject_id, e);
            let message = match e {
                AppError::NotFound(_) => {
                    self.subject = None;
                    "Disciplina não encontrada"
                }
                _ => "Falha ao carregar dados",
            };
            self.error = Some(message.to_string());
        }
        self.loading = false;
    }

    /// Returns whether a topic was created.
    pub async fn add_topic(&mut self, rest: &RestClient, title: &str) -> bool {
        let title = title.trim();
        if title.is_empty() {
            return false;
        }

        self.submitting = true;
        self.error = None;

        let new_topic = NewTopic {
            subject_id: self.subject_id.clone(),
            title: title.to_string(),
        };
        let created = match rest.insert::<_, Topic>(TOPICS, &new_topic).await {
            Ok(topic) => {
                tracing::info!("Created topic {} in subject {}", topic.id, topic.subject_id);
                self.topics.push(topic);
                true
            }
            Err(e) => {
                tracing::error!("Error adding topic: {}", e);
                let message = if e.constraint() == Some(TOPICS_LIMIT) {
                    TOPICS_LIMIT_MESSAGE.to_string()
                } else {
                    e.message_or("Falha ao adicionar assunto")
                };
                self.error = Some(message);
                false
            }
        };

        self.submitting = false;
        created
    }

    /// Flip the completed flag remotely, then mirror it locally.
    pub async fn toggle_topic_completion(&mut self, rest: &RestClient, topic_id: &str) {
        let Some(current) = self
            .topics
            .iter()
            .find(|t| t.id == topic_id)
            .map(|t| t.completed)
        else {
            return;
        };

        let update = TopicCompletion {
            completed: !current,
        };
        match rest.update(TOPICS, topic_id, &update).await {
            Ok(()) => {
                if let Some(topic) = self.topics.iter_mut().find(|t| t.id == topic_id) {
                    topic.completed = update.completed;
                }
            }
            Err(e) => {
                tracing::error!("Error updating topic {}: {}", topic_id, e);
                self.error = Some("Falha ao atualizar status do assunto".to_string());
            }
        }
    }
}
