use crate::models::{NewSubject, Subject};
use crate::services::{Query, RestClient};

const SUBJECTS: &str = "subjects";
const SUBJECTS_LIMIT: &str = "subjects_limit";

/// The signed-in user's subjects, newest first.
pub struct SubjectsView {
    pub subjects: Vec<Subject>,
    pub loading: bool,
    pub submitting: bool,
    pub error: Option<String>,
    limit: usize,
}

impl SubjectsView {
    pub fn new(limit: usize) -> Self {
        Self {
            subjects: Vec::new(),
            loading: true,
            submitting: false,
            error: None,
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn at_limit(&self) -> bool {
        self.subjects.len() >= self.limit
    }

    fn limit_message(&self) -> String {
        format!("Você pode criar até {} disciplinas", self.limit)
    }

    pub async fn fetch_subjects(&mut self, rest: &RestClient, user_id: &str) {
        let query = Query::table(SUBJECTS)
            .eq("user_id", user_id)
            .order("created_at", false);

        match rest.select::<Subject>(&query).await {
            Ok(subjects) => self.subjects = subjects,
            Err(e) => {
                tracing::error!("Error fetching subjects: {}", e);
                self.error = Some("Falha ao carregar disciplinas".to_string());
            }
        }
        self.loading = false;
    }

    /// Insert a subject and put it at the top of the list. Returns whether a row was created.
    pub async fn add_subject(&mut self, rest: &RestClient, user_id: &str, title: &str) -> bool {
        let title = title.trim();
        if title.is_empty() {
            return false;
        }
        if self.at_limit() {
            self.error = Some(self.limit_message());
            return false;
        }

        self.submitting = true;
        self.error = None;

        let new_subject = NewSubject {
            title: title.to_string(),
            user_id: user_id.to_string(),
        };
        let created = match rest.insert::<_, Subject>(SUBJECTS, &new_subject).await {
            Ok(subject) => {
                tracing::info!("Created subject {}", subject.id);
                self.subjects.insert(0, subject);
                true
            }
            Err(e) => {
                tracing::error!("Error adding subject: {}", e);
                let message = if e.constraint() == Some(SUBJECTS_LIMIT) {
                    self.limit_message()
                } else {
                    e.message_or("Falha ao adicionar disciplina")
                };
                self.error = Some(message);
                false
            }
        };

        self.submitting = false;
        created
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::test_support::{rest, subject_json};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_list(server: &MockServer, rows: Vec<serde_json::Value>) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/subjects"))
            .and(query_param("user_id", "eq.u1"))
            .and(query_param("order", "created_at.desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(rows))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn added_subject_is_prepended() {
        let server = MockServer::start().await;
        mount_list(&server, vec![subject_json("s1", "Química")]).await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/subjects"))
            .respond_with(ResponseTemplate::new(201).set_body_json(subject_json("s2", "Biologia")))
            .expect(1)
            .mount(&server)
            .await;

        let rest = rest(&server);
        let mut view = SubjectsView::new(6);
        view.fetch_subjects(&rest, "u1").await;
        assert!(!view.loading);
        assert_eq!(view.subjects.len(), 1);

        assert!(view.add_subject(&rest, "u1", "  Biologia  ").await);
        assert_eq!(view.subjects.len(), 2);
        assert_eq!(view.subjects[0].id, "s2");
        assert!(view.error.is_none());
        assert!(!view.submitting);
    }

    #[tokio::test]
    async fn cap_is_enforced_without_a_remote_call() {
        let server = MockServer::start().await;
        let rows = (0..6)
            .map(|i| subject_json(&format!("s{i}"), &format!("Disciplina {i}")))
            .collect();
        mount_list(&server, rows).await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/subjects"))
            .respond_with(ResponseTemplate::new(201).set_body_json(subject_json("s9", "Extra")))
            .expect(0)
            .mount(&server)
            .await;

        let rest = rest(&server);
        let mut view = SubjectsView::new(6);
        view.fetch_subjects(&rest, "u1").await;

        assert!(!view.add_subject(&rest, "u1", "Extra").await);
        assert_eq!(view.subjects.len(), 6);
        assert_eq!(view.error.as_deref(), Some("Você pode criar até 6 disciplinas"));
    }

    #[tokio::test]
    async fn remote_limit_uses_cap_message_and_other_errors_are_verbatim() {
        let server = MockServer::start().await;
        mount_list(&server, vec![]).await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/subjects"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "code": "P0001",
                "message": "subjects_limit exceeded"
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/subjects"))
            .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
                "code": "23505",
                "message": "duplicate key value violates unique constraint"
            })))
            .mount(&server)
            .await;

        let rest = rest(&server);
        let mut view = SubjectsView::new(6);
        view.fetch_subjects(&rest, "u1").await;

        assert!(!view.add_subject(&rest, "u1", "Artes").await);
        assert_eq!(view.error.as_deref(), Some("Você pode criar até 6 disciplinas"));

        assert!(!view.add_subject(&rest, "u1", "Artes").await);
        assert_eq!(
            view.error.as_deref(),
            Some("duplicate key value violates unique constraint")
        );
        assert!(view.subjects.is_empty());
    }

    #[tokio::test]
    async fn blank_title_is_ignored() {
        let server = MockServer::start().await;
        let rest = rest(&server);
        let mut view = SubjectsView::new(6);
        assert!(!view.add_subject(&rest, "u1", "   ").await);
        assert!(view.error.is_none());
    }

    #[tokio::test]
    async fn failed_fetch_still_clears_loading() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/subjects"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut view = SubjectsView::new(6);
        view.fetch_subjects(&rest(&server), "u1").await;
        assert!(!view.loading);
        assert_eq!(view.error.as_deref(), Some("Falha ao carregar disciplinas"));
    }
}
